//! Unit graph: every declaration unit reachable from an entry.
//!
//! Loading is breadth-first. Each frontier of newly discovered files is read and
//! transformed in parallel; the module specifiers of the finished units are then
//! resolved one by one, which yields the next frontier.

use crate::error::{BundleError, Result};
use crate::resolver::{ModuleResolver, Resolution};
use dtsb_common::Span;
use dtsb_transform::{ExportEntry, TransformOutput, transform_unit};
use indexmap::IndexMap;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, debug_span};

/// Unique identifier for a unit in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a module specifier of a unit points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    Internal(ModuleId),
    /// Kept as an import of this specifier.
    External(String),
}

#[derive(Debug)]
pub struct LoadedUnit {
    pub id: ModuleId,
    pub path: PathBuf,
    /// Display name used in diagnostics.
    pub file_name: String,
    pub output: TransformOutput,
    /// Specifier -> target, in order of first appearance.
    pub dependencies: IndexMap<String, Dependency>,
}

impl LoadedUnit {
    pub fn source_text(&self) -> Arc<str> {
        Arc::from(self.output.code.as_str())
    }
}

#[derive(Debug)]
pub struct UnitGraph {
    units: Vec<LoadedUnit>,
    path_to_id: FxHashMap<PathBuf, ModuleId>,
    entry: ModuleId,
}

impl UnitGraph {
    /// Load the entry and everything it reaches.
    pub fn load(entry: &Path, resolver: &mut ModuleResolver) -> Result<Self> {
        let entry = std::fs::canonicalize(entry).map_err(|e| BundleError::io(entry, e))?;
        let _span = debug_span!("load_units", entry = %entry.display()).entered();

        let mut units: Vec<LoadedUnit> = Vec::new();
        let mut path_to_id = FxHashMap::default();
        path_to_id.insert(entry.clone(), ModuleId(0));
        let mut frontier = vec![entry];
        let mut round = 0;

        while !frontier.is_empty() {
            round += 1;
            debug!(round, units = frontier.len(), "transforming frontier");
            let outputs: Vec<Result<(PathBuf, TransformOutput)>> =
                frontier.par_iter().map(|path| load_unit(path)).collect();

            let mut next = Vec::new();
            for result in outputs {
                let (path, output) = result?;
                let id = ModuleId(units.len() as u32);
                let mut unit = LoadedUnit {
                    id,
                    file_name: path.display().to_string(),
                    path,
                    output,
                    dependencies: IndexMap::new(),
                };
                for (specifier, span) in module_specifiers(&unit.output) {
                    let resolution = resolver
                        .resolve(&specifier, &unit.path, span)
                        .map_err(|failure| BundleError::Resolution {
                            failure,
                            source_text: unit.source_text(),
                        })?;
                    let dependency = match resolution {
                        Resolution::External { specifier } => Dependency::External(specifier),
                        Resolution::Internal(module) => {
                            let next_id = ModuleId(path_to_id.len() as u32);
                            let id = *path_to_id.entry(module.resolved_path.clone()).or_insert_with(|| {
                                next.push(module.resolved_path.clone());
                                next_id
                            });
                            Dependency::Internal(id)
                        }
                    };
                    unit.dependencies.insert(specifier, dependency);
                }
                units.push(unit);
            }
            frontier = next;
        }

        debug!(units = units.len(), rounds = round, "loaded unit graph");
        Ok(UnitGraph {
            units,
            path_to_id,
            entry: ModuleId(0),
        })
    }

    pub fn entry(&self) -> ModuleId {
        self.entry
    }

    pub fn unit(&self, id: ModuleId) -> &LoadedUnit {
        &self.units[id.index()]
    }

    pub fn units(&self) -> &[LoadedUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get_module_id(&self, path: &Path) -> Option<ModuleId> {
        self.path_to_id.get(path).copied()
    }

    pub fn dependency(&self, unit: ModuleId, specifier: &str) -> Option<&Dependency> {
        self.unit(unit).dependencies.get(specifier)
    }

    /// Units with their dependencies first, the entry last.
    pub fn post_order(&self) -> Vec<ModuleId> {
        let mut order = Vec::with_capacity(self.units.len());
        let mut visited = FxHashSet::default();
        self.visit_post_order(self.entry, &mut visited, &mut order);
        order
    }

    fn visit_post_order(&self, id: ModuleId, visited: &mut FxHashSet<ModuleId>, order: &mut Vec<ModuleId>) {
        if !visited.insert(id) {
            return;
        }
        for dependency in self.unit(id).dependencies.values() {
            if let Dependency::Internal(dep) = dependency {
                self.visit_post_order(*dep, visited, order);
            }
        }
        order.push(id);
    }
}

fn load_unit(path: &Path) -> Result<(PathBuf, TransformOutput)> {
    let text = std::fs::read_to_string(path).map_err(|e| BundleError::io(path, e))?;
    let output = transform_unit(&path.display().to_string(), &text)?;
    Ok((path.to_path_buf(), output))
}

/// Every module specifier a unit mentions, with the span of its first mention.
fn module_specifiers(output: &TransformOutput) -> IndexMap<String, Span> {
    let mut specifiers = IndexMap::new();
    for import in &output.imports {
        specifiers.entry(import.source.clone()).or_insert(import.span);
    }
    for export in &output.exports {
        let source = match export {
            ExportEntry::Reexport { source, .. } | ExportEntry::ReexportAll { source } => source,
            ExportEntry::Local { .. } => continue,
        };
        if !specifiers.contains_key(source) {
            specifiers.insert(source.clone(), specifier_span(&output.code, source));
        }
    }
    specifiers
}

/// Span of the quoted `specifier` in `code`, or an empty span at the start.
pub(crate) fn specifier_span(code: &str, specifier: &str) -> Span {
    ['"', '\'']
        .iter()
        .find_map(|quote| {
            let quoted = format!("{quote}{specifier}{quote}");
            code.find(&quoted).map(|at| Span::from_offsets(at, at + quoted.len()))
        })
        .unwrap_or_default()
}
