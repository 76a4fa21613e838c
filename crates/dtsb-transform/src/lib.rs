//! Declaration transformer.
//!
//! Pipeline for one unit: parse, [`preprocess`](preprocess::preprocess) into canonical
//! ambient text, re-parse, and [`build`](builder::build) the module graph the host
//! bundler tree-shakes. After bundling, [`namespace::reconstruct`] restores namespace
//! objects in the finished chunk.

pub mod buffer;
pub mod builder;
pub mod error;
pub mod frontend;
pub mod graph;
pub mod namespace;
pub mod preprocess;
pub mod scope;
pub mod trivia;
pub mod walk;

pub use error::TransformError;
pub use graph::{
    DeclKind, ExportEntry, GraphNode, ImportBinding, ImportedName, NamedEntry, NodeId, NodeKind,
    Reference, ReferenceDirectives, TransformOutput,
};
pub use namespace::NamespaceRecord;

use dtsb_common::Diagnostic;
use std::fmt;
use std::sync::Arc;
use tracing::debug_span;

/// A transform failure together with the text its span points into.
#[derive(Debug, Clone)]
pub struct UnitError {
    pub file_name: String,
    /// The original text for parse and preprocessing failures, the rewritten text for
    /// graph construction failures.
    pub source_text: Arc<str>,
    pub error: TransformError,
}

impl UnitError {
    pub fn new(file_name: &str, source_text: &str, error: TransformError) -> Self {
        UnitError {
            file_name: file_name.to_string(),
            source_text: Arc::from(source_text),
            error,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        self.error.to_diagnostic(&self.file_name)
    }

    /// Header, offending line and caret underline.
    pub fn render(&self) -> String {
        self.to_diagnostic().format_with_excerpt(&self.source_text)
    }
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_name, self.error)
    }
}

impl std::error::Error for UnitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Transform one declaration unit into its module graph.
pub fn transform_unit(file_name: &str, text: &str) -> Result<TransformOutput, UnitError> {
    let _span = debug_span!("transform_unit", file = file_name).entered();
    let fail = |source: &str, error| UnitError::new(file_name, source, error);

    let unit = frontend::parse(file_name, text.to_string()).map_err(|e| fail(text, e))?;
    let pre = preprocess::preprocess(&unit).map_err(|e| fail(text, e))?;
    let canonical = frontend::parse(file_name, pre.code.clone()).map_err(|e| fail(&pre.code, e))?;
    builder::build(&canonical, pre.references).map_err(|e| fail(&canonical.text, e))
}

/// Restore namespace objects in a finished chunk.
pub fn reconstruct_namespaces(file_name: &str, text: &str) -> Result<String, UnitError> {
    namespace::reconstruct(file_name, text).map_err(|e| UnitError::new(file_name, text, e))
}
