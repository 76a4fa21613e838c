//! Chunk rendering.
//!
//! Layout of a chunk:
//! 1. reference directives of every folded unit (types, lib, path);
//! 2. external imports, grouped per module;
//! 3. kept nodes, units in dependency post-order, nodes in text order;
//! 4. namespace markers;
//! 5. the export statement and `export * from` lines.
//!
//! The namespace markers are then rewritten by the Namespace Reconstructor.

use crate::error::{BundleError, Result};
use crate::link::{Links, ModuleExports};
use crate::loader::{LoadedUnit, UnitGraph};
use crate::rename::Names;
use crate::shake::Reachability;
use dtsb_transform::{GraphNode, ImportedName, NamespaceRecord, ReferenceDirectives, reconstruct_namespaces};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::debug;

pub fn render_chunk(
    graph: &UnitGraph,
    links: &Links,
    reach: &Reachability,
    names: &Names,
    entry_exports: &ModuleExports,
) -> Result<String> {
    let mut out = String::new();

    let mut directives = ReferenceDirectives::default();
    for unit in graph.units() {
        directives.extend(&unit.output.references);
    }
    out.push_str(&directives.render());

    let imports = render_imports(reach, names);
    if !imports.is_empty() {
        out.push_str(&imports);
        out.push('\n');
    }

    let mut kept = 0;
    for id in graph.post_order() {
        let unit = graph.unit(id);
        let mut nodes: Vec<&GraphNode> = unit
            .output
            .nodes
            .iter()
            .filter(|node| reach.keeps(id, node.id))
            .collect();
        nodes.sort_by_key(|node| node.range.start);
        for node in nodes {
            out.push_str(&renamed_node_text(unit, node, links, names));
            out.push('\n');
            kept += 1;
        }
    }

    for (unit, exports) in &reach.namespaces {
        let Some(name) = names.namespace(*unit) else {
            continue;
        };
        let mut record = NamespaceRecord::new(name);
        for (exported, symbol) in &exports.names {
            if let Some(local) = names.symbol(symbol) {
                record.push(exported.as_str(), local);
            }
        }
        out.push_str(&record.encode());
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&render_exports(entry_exports, names));

    debug!(
        nodes = kept,
        namespaces = reach.namespaces.len(),
        bytes = out.len(),
        "rendered chunk"
    );
    let entry = graph.unit(graph.entry());
    reconstruct_namespaces(&entry.file_name, &out).map_err(BundleError::from)
}

/// Node text with its declared names and references rewritten to their final names.
fn renamed_node_text(unit: &LoadedUnit, node: &GraphNode, links: &Links, names: &Names) -> String {
    let code = &unit.output.code;
    // start -> (end, replacement); a merged node's self references share name spans.
    let mut edits: BTreeMap<u32, (u32, &str)> = BTreeMap::new();
    if let Some(name) = names.node(unit.id, node.id) {
        for span in &node.name_spans {
            edits.insert(span.start, (span.end, name));
        }
    }
    for reference in &node.references {
        if let Some(name) = links.get(unit.id, reference.marker).and_then(|symbol| names.symbol(symbol)) {
            edits.entry(reference.span.start).or_insert((reference.span.end, name));
        }
    }

    let mut text = String::with_capacity(node.range.len() as usize);
    let mut pos = node.range.start;
    for (start, (end, replacement)) in edits {
        if start < pos || end > node.range.end {
            continue;
        }
        text.push_str(&code[pos as usize..start as usize]);
        text.push_str(replacement);
        pos = end;
    }
    text.push_str(&code[pos as usize..node.range.end_usize()]);
    text
}

/// `import * as`, `import = require` and one named import per external module.
fn render_imports(reach: &Reachability, names: &Names) -> String {
    #[derive(Default)]
    struct ModuleImports<'a> {
        default: Option<&'a str>,
        named: Vec<String>,
        namespaces: Vec<&'a str>,
        requires: Vec<&'a str>,
    }

    let mut by_source: IndexMap<&str, ModuleImports<'_>> = IndexMap::new();
    for (source, imported) in &reach.externals {
        let Some(local) = names.external(source, imported) else {
            continue;
        };
        let entry = by_source.entry(source.as_str()).or_default();
        match imported {
            ImportedName::Default => entry.default = Some(local),
            ImportedName::Named(name) if name == local => entry.named.push(name.clone()),
            ImportedName::Named(name) => entry.named.push(format!("{name} as {local}")),
            ImportedName::Namespace => entry.namespaces.push(local),
            ImportedName::Require => entry.requires.push(local),
        }
    }

    let mut out = String::new();
    for (source, imports) in by_source {
        for local in imports.namespaces {
            out.push_str(&format!("import * as {local} from \"{source}\";\n"));
        }
        for local in imports.requires {
            out.push_str(&format!("import {local} = require(\"{source}\");\n"));
        }
        let named = (!imports.named.is_empty()).then(|| format!("{{ {} }}", imports.named.join(", ")));
        let clause = match (imports.default, named) {
            (Some(default), Some(named)) => format!("{default}, {named}"),
            (Some(default), None) => default.to_string(),
            (None, Some(named)) => named,
            (None, None) => continue,
        };
        out.push_str(&format!("import {clause} from \"{source}\";\n"));
    }
    out
}

fn render_exports(exports: &ModuleExports, names: &Names) -> String {
    let specifiers: Vec<String> = exports
        .names
        .iter()
        .filter_map(|(exported, symbol)| {
            let local = names.symbol(symbol)?;
            Some(if local == exported {
                local.to_string()
            } else {
                format!("{local} as {exported}")
            })
        })
        .collect();

    let mut out = String::new();
    if !specifiers.is_empty() {
        out.push_str(&format!("export {{ {} }};\n", specifiers.join(", ")));
    } else if exports.external_stars.is_empty() {
        // Keeps the chunk a module.
        out.push_str("export {};\n");
    }
    for source in &exports.external_stars {
        out.push_str(&format!("export * from \"{source}\";\n"));
    }
    out
}
