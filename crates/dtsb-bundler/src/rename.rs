//! Deconflicting: one top-level name per kept symbol across the whole chunk.
//!
//! Globals are reserved first so nothing shadows them. Then external bindings, kept
//! nodes in dependency post-order, and namespace objects claim names; a taken name
//! gets a `$1`, `$2`, … suffix.

use crate::link::Symbol;
use crate::loader::{Dependency, LoadedUnit, ModuleId, UnitGraph};
use crate::shake::Reachability;
use dtsb_transform::trivia::identifier_from_specifier;
use dtsb_transform::{ExportEntry, ImportedName, NodeId};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct NameTable {
    used: FxHashSet<String>,
}

impl NameTable {
    fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    fn claim(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut n = 1;
        while self.used.contains(&name) {
            name = format!("{base}${n}");
            n += 1;
        }
        self.used.insert(name.clone());
        name
    }
}

/// Final names of everything the chunk declares or imports.
#[derive(Debug, Default)]
pub struct Names {
    nodes: FxHashMap<(ModuleId, NodeId), String>,
    namespaces: FxHashMap<ModuleId, String>,
    externals: FxHashMap<(String, ImportedName), String>,
}

impl Names {
    pub fn node(&self, unit: ModuleId, node: NodeId) -> Option<&str> {
        self.nodes.get(&(unit, node)).map(String::as_str)
    }

    pub fn namespace(&self, unit: ModuleId) -> Option<&str> {
        self.namespaces.get(&unit).map(String::as_str)
    }

    pub fn external(&self, source: &str, imported: &ImportedName) -> Option<&str> {
        self.externals
            .get(&(source.to_string(), imported.clone()))
            .map(String::as_str)
    }

    /// The name a reference to `symbol` is written as.
    pub fn symbol<'a>(&'a self, symbol: &'a Symbol) -> Option<&'a str> {
        match symbol {
            Symbol::Node { unit, node } => self.node(*unit, *node),
            Symbol::Namespace(unit) => self.namespace(*unit),
            Symbol::External { source, imported } => self.external(source, imported),
            Symbol::Global(name) => Some(name),
        }
    }
}

pub fn deconflict(graph: &UnitGraph, reach: &Reachability) -> Names {
    let mut table = NameTable::default();
    let mut names = Names::default();
    let mut renamed = 0usize;

    for global in &reach.globals {
        table.reserve(global);
    }

    for (source, imported) in &reach.externals {
        let base = external_hint(graph, source, imported);
        let name = table.claim(&base);
        names.externals.insert((source.clone(), imported.clone()), name);
    }

    for id in graph.post_order() {
        let unit = graph.unit(id);
        let mut kept: Vec<_> = unit
            .output
            .nodes
            .iter()
            .filter(|node| reach.keeps(id, node.id))
            .collect();
        kept.sort_by_key(|node| node.range.start);
        for node in kept {
            let Some(base) = node.name() else {
                continue;
            };
            let name = table.claim(base);
            if name != base {
                renamed += 1;
                trace!(file = %unit.file_name, from = base, to = %name, "renamed declaration");
            }
            names.nodes.insert((id, node.id), name);
        }
    }

    for unit in reach.namespaces.keys() {
        let name = table.claim(&namespace_hint(graph, *unit));
        names.namespaces.insert(*unit, name);
    }

    debug!(
        renamed,
        reserved_globals = reach.globals.len(),
        "deconflicted top-level names"
    );
    names
}

/// The local name the first importer gave an external binding.
fn external_hint(graph: &UnitGraph, source: &str, imported: &ImportedName) -> String {
    for unit in graph.units() {
        for binding in &unit.output.imports {
            if &binding.imported == imported
                && matches!(unit.dependencies.get(&binding.source), Some(Dependency::External(s)) if s == source)
            {
                return binding.local.clone();
            }
        }
    }
    match imported {
        ImportedName::Named(name) => name.clone(),
        _ => identifier_from_specifier(source),
    }
}

/// The first `import * as x` or `export * as x` naming a unit, else its file stem.
fn namespace_hint(graph: &UnitGraph, target: ModuleId) -> String {
    let points_at = |unit: &LoadedUnit, source: &str| {
        unit.dependencies.get(source) == Some(&Dependency::Internal(target))
    };
    for unit in graph.units() {
        for binding in &unit.output.imports {
            if matches!(binding.imported, ImportedName::Namespace | ImportedName::Require)
                && points_at(unit, &binding.source)
            {
                return binding.local.clone();
            }
        }
        for export in &unit.output.exports {
            if let ExportEntry::Reexport {
                exported,
                imported: ImportedName::Namespace,
                source,
            } = export
                && exported != "default"
                && points_at(unit, source)
            {
                return exported.clone();
            }
        }
    }
    identifier_from_specifier(&graph.unit(target).path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_suffixes_taken_names() {
        let mut table = NameTable::default();
        table.reserve("Promise");
        assert_eq!(table.claim("A"), "A");
        assert_eq!(table.claim("A"), "A$1");
        assert_eq!(table.claim("A"), "A$2");
        assert_eq!(table.claim("Promise"), "Promise$1");
    }
}
