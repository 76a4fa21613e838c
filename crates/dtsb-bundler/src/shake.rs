//! Reachability over linked symbols.
//!
//! Roots are the entry's exports plus every anonymous node of every unit (global
//! augmentations, ambient module blocks and `export as namespace` have no name to be
//! referenced by). A kept node keeps every symbol it references; a namespace object
//! keeps every export of its unit.

use crate::error::Result;
use crate::link::{Linker, Links, ModuleExports, Symbol};
use crate::loader::{ModuleId, UnitGraph};
use dtsb_transform::{ImportedName, NodeId};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Reachability {
    pub nodes: FxHashSet<(ModuleId, NodeId)>,
    /// Namespace objects with the exports they must carry, in discovery order.
    pub namespaces: IndexMap<ModuleId, ModuleExports>,
    /// External bindings in discovery order.
    pub externals: IndexSet<(String, ImportedName)>,
    pub globals: IndexSet<String>,
}

impl Reachability {
    pub fn keeps(&self, unit: ModuleId, node: NodeId) -> bool {
        self.nodes.contains(&(unit, node))
    }
}

pub fn shake(graph: &UnitGraph, linker: &Linker<'_>, links: &Links, entry_exports: &ModuleExports) -> Result<Reachability> {
    let mut reach = Reachability::default();
    let mut pending: Vec<Symbol> = Vec::new();

    for unit in graph.units() {
        for node in unit.output.nodes.iter().filter(|node| node.is_anonymous()) {
            pending.push(Symbol::Node {
                unit: unit.id,
                node: node.id,
            });
        }
    }
    // Reversed so the entry's exports are visited in declaration order.
    pending.extend(entry_exports.names.values().rev().cloned());

    let mut seen: FxHashSet<Symbol> = FxHashSet::default();
    while let Some(symbol) = pending.pop() {
        if !seen.insert(symbol.clone()) {
            continue;
        }
        match symbol {
            Symbol::Node { unit, node } => {
                reach.nodes.insert((unit, node));
                let graph_node = &graph.unit(unit).output.nodes[node.index()];
                for reference in graph_node.references.iter().rev() {
                    if let Some(target) = links.get(unit, reference.marker) {
                        pending.push(target.clone());
                    }
                }
            }
            Symbol::Namespace(unit) => {
                let exports = linker.module_exports(unit)?;
                pending.extend(exports.names.values().rev().cloned());
                if !exports.external_stars.is_empty() {
                    debug!(
                        file = %graph.unit(unit).file_name,
                        stars = exports.external_stars.len(),
                        "external `export *` is not carried by namespace objects"
                    );
                }
                reach.namespaces.insert(unit, exports);
            }
            Symbol::External { source, imported } => {
                reach.externals.insert((source, imported));
            }
            Symbol::Global(name) => {
                reach.globals.insert(name);
            }
        }
    }

    debug!(
        kept = reach.nodes.len(),
        total = graph.units().iter().map(|u| u.output.nodes.len()).sum::<usize>(),
        namespaces = reach.namespaces.len(),
        externals = reach.externals.len(),
        "tree-shaken unit graph"
    );
    Ok(reach)
}
