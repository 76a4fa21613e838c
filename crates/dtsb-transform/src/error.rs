//! Errors raised by the declaration transformer.
//!
//! All of these are deterministic functions of the input: re-running the same unit
//! reproduces the same failure, so there is no retry path. Each variant carries the
//! span of the offending node in the text the failing phase was working on.

use dtsb_common::{Diagnostic, Span, codes};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A recognized-but-unhandleable syntactic shape.
    UnsupportedConstruct { span: Span, message: String },
    /// An inline `import("…")` type whose argument is not a usable module specifier.
    MalformedInlineImport { span: Span, message: String },
    /// A namespace record in a finished chunk points at a local name that is gone.
    ReconstructionIntegrity {
        span: Span,
        namespace: String,
        name: String,
    },
    /// Two edits against the same text contradict each other.
    EditConflict { span: Span, message: String },
    /// The front-end rejected the text.
    Parse { span: Span, message: String },
}

impl TransformError {
    pub fn unsupported(span: Span, message: impl Into<String>) -> Self {
        TransformError::UnsupportedConstruct {
            span,
            message: message.into(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TransformError::UnsupportedConstruct { span, .. }
            | TransformError::MalformedInlineImport { span, .. }
            | TransformError::ReconstructionIntegrity { span, .. }
            | TransformError::EditConflict { span, .. }
            | TransformError::Parse { span, .. } => *span,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            TransformError::UnsupportedConstruct { .. } => codes::UNSUPPORTED_CONSTRUCT,
            TransformError::MalformedInlineImport { .. } => codes::MALFORMED_INLINE_IMPORT,
            TransformError::ReconstructionIntegrity { .. } => codes::RECONSTRUCTION_INTEGRITY,
            TransformError::EditConflict { .. } => codes::EDIT_CONFLICT,
            TransformError::Parse { .. } => codes::PARSE_ERROR,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, TransformError::UnsupportedConstruct { .. })
    }

    pub fn to_diagnostic(&self, file_name: &str) -> Diagnostic {
        Diagnostic::error(file_name, self.span(), self.to_string(), self.code())
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::UnsupportedConstruct { message, .. } => {
                write!(f, "unsupported construct: {message}")
            }
            TransformError::MalformedInlineImport { message, .. } => {
                write!(f, "malformed inline import: {message}")
            }
            TransformError::ReconstructionIntegrity {
                namespace, name, ..
            } => write!(
                f,
                "namespace `{namespace}` exports `{name}`, but no declaration named `{name}` survived bundling"
            ),
            TransformError::EditConflict { message, .. } => write!(f, "conflicting edits: {message}"),
            TransformError::Parse { message, .. } => write!(f, "syntax error: {message}"),
        }
    }
}

impl std::error::Error for TransformError {}

pub type Result<T, E = TransformError> = std::result::Result<T, E>;
