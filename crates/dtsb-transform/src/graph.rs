//! Module-graph representation handed to the host bundler.
//!
//! Each unit becomes a list of [`GraphNode`]s over its rewritten text. Nodes own text
//! ranges; [`Reference`]s are the only edges. Imports and exports are recorded
//! separately so the host can link units without looking at the text again.

use dtsb_common::Span;
use indexmap::IndexSet;
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;

/// Kind of a named top-level declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Class,
    Function,
    Interface,
    Type,
    Namespace,
    Enum,
    Var,
    /// An import binding (`import x from`, `import x = A.B`).
    Import,
}

impl DeclKind {
    /// Kinds that may merge with a later declaration of the same name.
    pub fn is_mergeable(self) -> bool {
        matches!(self, DeclKind::Interface | DeclKind::Namespace)
    }

    pub fn name(self) -> &'static str {
        match self {
            DeclKind::Class => "class",
            DeclKind::Function => "function",
            DeclKind::Interface => "interface",
            DeclKind::Type => "type",
            DeclKind::Namespace => "namespace",
            DeclKind::Enum => "enum",
            DeclKind::Var => "var",
            DeclKind::Import => "import",
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared top-level name collected while preprocessing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NamedEntry {
    pub name: String,
    pub kind: DeclKind,
    pub generic_arity: usize,
}

/// Targets of `/// <reference … />` directives, split by directive kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceDirectives {
    /// `types="…"`
    pub types: IndexSet<String>,
    /// `path="…"`
    pub paths: IndexSet<String>,
    /// `lib="…"`
    pub libs: IndexSet<String>,
}

impl ReferenceDirectives {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.paths.is_empty() && self.libs.is_empty()
    }

    pub fn extend(&mut self, other: &ReferenceDirectives) {
        self.types.extend(other.types.iter().cloned());
        self.paths.extend(other.paths.iter().cloned());
        self.libs.extend(other.libs.iter().cloned());
    }

    /// Render one directive line per target: types, then libs, then paths.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for target in &self.types {
            out.push_str(&format!("/// <reference types=\"{target}\" />\n"));
        }
        for target in &self.libs {
            out.push_str(&format!("/// <reference lib=\"{target}\" />\n"));
        }
        for target in &self.paths {
            out.push_str(&format!("/// <reference path=\"{target}\" />\n"));
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Named { name: String, decl_kind: DeclKind },
    /// Global augmentations and other statements that are always kept and never renamed.
    Anonymous,
}

/// A reference edge from a node to a free name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Unique within a unit; two references to the same target never share a marker.
    pub marker: u32,
    pub target: String,
    /// The root identifier occurrence in the rewritten text.
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Owned text, from the first character of the first declaration (leading comments
    /// included) to the end of the last merged declaration.
    pub range: Span,
    /// Occurrences of the declared name, one per merged declaration.
    pub name_spans: SmallVec<[Span; 1]>,
    pub references: Vec<Reference>,
}

impl GraphNode {
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Named { name, .. } => Some(name),
            NodeKind::Anonymous => None,
        }
    }

    pub fn decl_kind(&self) -> Option<DeclKind> {
        match &self.kind {
            NodeKind::Named { decl_kind, .. } => Some(*decl_kind),
            NodeKind::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.kind, NodeKind::Anonymous)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ImportedName {
    Named(String),
    Default,
    /// `import * as x`.
    Namespace,
    /// `import x = require("…")`.
    Require,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImportBinding {
    pub local: String,
    pub imported: ImportedName,
    pub source: String,
    /// The whole import statement.
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ExportEntry {
    /// `export { local as exported }` or `export default local`.
    Local { exported: String, local: String },
    /// `export { imported as exported } from "source"`.
    Reexport {
        exported: String,
        imported: ImportedName,
        source: String,
    },
    /// `export * from "source"`.
    ReexportAll { source: String },
}

/// The per-unit result handed to the host bundler.
#[derive(Clone, Debug, Serialize)]
pub struct TransformOutput {
    pub file_name: String,
    /// The preprocessed text all spans point into.
    pub code: String,
    pub nodes: Vec<GraphNode>,
    pub imports: Vec<ImportBinding>,
    pub exports: Vec<ExportEntry>,
    pub references: ReferenceDirectives,
}

impl TransformOutput {
    pub fn node_by_name(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.name() == Some(name))
    }

    pub fn import_by_local(&self, local: &str) -> Option<&ImportBinding> {
        self.imports.iter().find(|import| import.local == local)
    }

    /// Text of a node.
    pub fn node_text(&self, node: &GraphNode) -> &str {
        node.range.slice(&self.code)
    }
}
