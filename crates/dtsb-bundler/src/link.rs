//! Linking: what every reference and export of a unit denotes.
//!
//! A name resolves to a node of its own unit, or through an import binding to an
//! export of another unit. Exports are followed through `export { … } from` chains
//! and `export *`, with each `(unit, name)` pair visited once so cyclic re-exports
//! terminate. Names that are neither declared nor imported are globals.

use crate::error::{BundleError, Result};
use crate::loader::{Dependency, ModuleId, UnitGraph, specifier_span};
use dtsb_transform::{ExportEntry, ImportBinding, ImportedName, NodeId};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

/// The declaration a name denotes after linking.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
    Node { unit: ModuleId, node: NodeId },
    /// The namespace object of an internal unit.
    Namespace(ModuleId),
    /// A binding that stays an import of an external module.
    External { source: String, imported: ImportedName },
    Global(String),
}

/// Everything a unit exports.
#[derive(Clone, Debug, Default)]
pub struct ModuleExports {
    pub names: IndexMap<String, Symbol>,
    /// `export * from` external modules, directly or through internal `export *`.
    pub external_stars: Vec<String>,
}

/// Resolved symbol of every reference, keyed by unit and reference marker.
#[derive(Debug, Default)]
pub struct Links {
    by_unit: Vec<FxHashMap<u32, Symbol>>,
}

impl Links {
    pub fn get(&self, unit: ModuleId, marker: u32) -> Option<&Symbol> {
        self.by_unit.get(unit.index())?.get(&marker)
    }

    pub fn len(&self) -> usize {
        self.by_unit.iter().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Linker<'g> {
    graph: &'g UnitGraph,
}

impl<'g> Linker<'g> {
    pub fn new(graph: &'g UnitGraph) -> Self {
        Linker { graph }
    }

    /// Resolve every reference of every node.
    pub fn link(&self) -> Result<Links> {
        let mut by_unit = Vec::with_capacity(self.graph.len());
        for unit in self.graph.units() {
            let mut symbols = FxHashMap::default();
            for node in &unit.output.nodes {
                for reference in &node.references {
                    let symbol = self.resolve_name(unit.id, &reference.target)?;
                    trace!(file = %unit.file_name, target = %reference.target, ?symbol, "linked reference");
                    symbols.insert(reference.marker, symbol);
                }
            }
            by_unit.push(symbols);
        }
        let links = Links { by_unit };
        debug!(references = links.len(), "linked unit graph");
        Ok(links)
    }

    /// What `name` denotes at the top level of `unit`.
    pub fn resolve_name(&self, unit: ModuleId, name: &str) -> Result<Symbol> {
        let loaded = self.graph.unit(unit);
        if let Some(node) = loaded.output.node_by_name(name) {
            return Ok(Symbol::Node { unit, node: node.id });
        }
        match loaded.output.import_by_local(name) {
            Some(binding) => self.resolve_import(unit, binding),
            None => Ok(Symbol::Global(name.to_string())),
        }
    }

    fn resolve_import(&self, unit: ModuleId, binding: &ImportBinding) -> Result<Symbol> {
        let target = match self.graph.dependency(unit, &binding.source) {
            Some(Dependency::Internal(target)) => *target,
            Some(Dependency::External(specifier)) => {
                return Ok(Symbol::External {
                    source: specifier.clone(),
                    imported: binding.imported.clone(),
                });
            }
            None => return Ok(Symbol::Global(binding.local.clone())),
        };
        let name = match &binding.imported {
            ImportedName::Namespace | ImportedName::Require => return Ok(Symbol::Namespace(target)),
            ImportedName::Default => "default",
            ImportedName::Named(name) => name.as_str(),
        };
        match self.resolve_export(target, name, &mut FxHashSet::default())? {
            Some(symbol) => Ok(symbol),
            None => {
                let loaded = self.graph.unit(unit);
                Err(BundleError::MissingExport {
                    file_name: loaded.file_name.clone(),
                    module: binding.source.clone(),
                    name: name.to_string(),
                    span: binding.span,
                    source_text: loaded.source_text(),
                })
            }
        }
    }

    /// The symbol `unit` exports as `name`, if any.
    pub fn resolve_export(
        &self,
        unit: ModuleId,
        name: &str,
        visited: &mut FxHashSet<(ModuleId, String)>,
    ) -> Result<Option<Symbol>> {
        if !visited.insert((unit, name.to_string())) {
            return Ok(None);
        }
        let loaded = self.graph.unit(unit);
        for export in &loaded.output.exports {
            match export {
                ExportEntry::Local { exported, local } if exported == name => {
                    return self.resolve_name(unit, local).map(Some);
                }
                ExportEntry::Reexport {
                    exported,
                    imported,
                    source,
                } if exported == name => {
                    return self.resolve_reexport(unit, imported, source, visited);
                }
                _ => {}
            }
        }
        if name == "default" {
            return Ok(None);
        }

        let mut external = None;
        for export in &loaded.output.exports {
            let ExportEntry::ReexportAll { source } = export else {
                continue;
            };
            match self.graph.dependency(unit, source) {
                Some(Dependency::Internal(target)) => {
                    if let Some(symbol) = self.resolve_export(*target, name, visited)? {
                        return Ok(Some(symbol));
                    }
                }
                Some(Dependency::External(specifier)) => {
                    external.get_or_insert_with(|| specifier.clone());
                }
                None => {}
            }
        }
        // Only an external `export *` can still provide it.
        Ok(external.map(|source| Symbol::External {
            source,
            imported: ImportedName::Named(name.to_string()),
        }))
    }

    fn resolve_reexport(
        &self,
        unit: ModuleId,
        imported: &ImportedName,
        source: &str,
        visited: &mut FxHashSet<(ModuleId, String)>,
    ) -> Result<Option<Symbol>> {
        let target = match self.graph.dependency(unit, source) {
            Some(Dependency::Internal(target)) => *target,
            Some(Dependency::External(specifier)) => {
                return Ok(Some(Symbol::External {
                    source: specifier.clone(),
                    imported: imported.clone(),
                }));
            }
            None => return Ok(None),
        };
        match imported {
            ImportedName::Namespace | ImportedName::Require => Ok(Some(Symbol::Namespace(target))),
            ImportedName::Default => self.resolve_export(target, "default", visited),
            ImportedName::Named(name) => self.resolve_export(target, name, visited),
        }
    }

    /// All exports of `unit`, `export *` expanded.
    pub fn module_exports(&self, unit: ModuleId) -> Result<ModuleExports> {
        let mut exports = ModuleExports::default();
        self.collect_exports(unit, &mut exports, &mut FxHashSet::default(), true)?;
        Ok(exports)
    }

    fn collect_exports(
        &self,
        unit: ModuleId,
        exports: &mut ModuleExports,
        visited: &mut FxHashSet<ModuleId>,
        include_default: bool,
    ) -> Result<()> {
        if !visited.insert(unit) {
            return Ok(());
        }
        let loaded = self.graph.unit(unit);
        let mut stars = Vec::new();
        for export in &loaded.output.exports {
            let (exported, symbol) = match export {
                ExportEntry::Local { exported, local } => (exported, Some(self.resolve_name(unit, local)?)),
                ExportEntry::Reexport {
                    exported,
                    imported,
                    source,
                } => (
                    exported,
                    self.resolve_reexport(unit, imported, source, &mut FxHashSet::default())?,
                ),
                ExportEntry::ReexportAll { source } => {
                    stars.push(source);
                    continue;
                }
            };
            if exported == "default" && !include_default {
                continue;
            }
            let Some(symbol) = symbol else {
                let (module, name) = match export {
                    ExportEntry::Reexport { source, imported, .. } => (source.clone(), imported_name(imported)),
                    _ => (loaded.file_name.clone(), exported.clone()),
                };
                return Err(BundleError::MissingExport {
                    file_name: loaded.file_name.clone(),
                    span: specifier_span(&loaded.output.code, &module),
                    module,
                    name,
                    source_text: loaded.source_text(),
                });
            };
            exports.names.entry(exported.clone()).or_insert(symbol);
        }

        // Explicit exports shadow star exports.
        for source in stars {
            match self.graph.dependency(unit, source) {
                Some(Dependency::Internal(target)) => {
                    self.collect_exports(*target, exports, visited, false)?;
                }
                Some(Dependency::External(specifier)) => {
                    if !exports.external_stars.contains(specifier) {
                        exports.external_stars.push(specifier.clone());
                    }
                }
                None => {}
            }
        }
        Ok(())
    }
}

fn imported_name(imported: &ImportedName) -> String {
    match imported {
        ImportedName::Named(name) => name.clone(),
        ImportedName::Default => "default".to_string(),
        ImportedName::Namespace | ImportedName::Require => "*".to_string(),
    }
}
