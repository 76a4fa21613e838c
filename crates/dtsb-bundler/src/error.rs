use crate::resolver::ResolutionFailure;
use dtsb_common::{Diagnostic, Span, codes};
use dtsb_transform::UnitError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything that can stop a bundle.
#[derive(Debug)]
pub enum BundleError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    /// A unit failed to parse, preprocess, build or reconstruct.
    Transform(UnitError),
    Resolution {
        failure: ResolutionFailure,
        /// Text of the importing unit the failure's span points into.
        source_text: Arc<str>,
    },
    /// A named import or re-export of a name the target module does not export.
    MissingExport {
        file_name: String,
        module: String,
        name: String,
        span: Span,
        source_text: Arc<str>,
    },
}

impl BundleError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BundleError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BundleError::Io { path, source } => Diagnostic::error(
                path.display().to_string(),
                Span::default(),
                format!("cannot read file: {source}"),
                codes::IO_ERROR,
            ),
            BundleError::Transform(error) => error.to_diagnostic(),
            BundleError::Resolution { failure, .. } => failure.to_diagnostic(),
            BundleError::MissingExport {
                file_name,
                module,
                name,
                span,
                ..
            } => Diagnostic::error(
                file_name,
                *span,
                format!("module '{module}' has no exported member '{name}'"),
                codes::MISSING_EXPORT,
            ),
        }
    }

    pub fn code(&self) -> u32 {
        self.to_diagnostic().code
    }

    /// The text the diagnostic span points into, if any.
    pub fn source_text(&self) -> Option<&str> {
        match self {
            BundleError::Io { .. } => None,
            BundleError::Transform(error) => Some(&error.source_text),
            BundleError::Resolution { source_text, .. } | BundleError::MissingExport { source_text, .. } => {
                Some(source_text)
            }
        }
    }

    /// Header plus source excerpt where the failing text is known.
    pub fn render(&self) -> String {
        match self {
            BundleError::Io { .. } => {
                let diagnostic = self.to_diagnostic();
                format!("{}: {}", diagnostic.file_name, diagnostic.format_simple())
            }
            BundleError::Transform(error) => error.render(),
            BundleError::Resolution { source_text, .. } | BundleError::MissingExport { source_text, .. } => {
                self.to_diagnostic().format_with_excerpt(source_text)
            }
        }
    }
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            BundleError::Transform(error) => write!(f, "{error}"),
            BundleError::Resolution { failure, .. } => write!(f, "{failure}"),
            BundleError::MissingExport {
                file_name, module, name, ..
            } => write!(f, "{file_name}: module '{module}' has no exported member '{name}'"),
        }
    }
}

impl std::error::Error for BundleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BundleError::Io { source, .. } => Some(source),
            BundleError::Transform(error) => Some(error),
            BundleError::Resolution { failure, .. } => Some(failure),
            BundleError::MissingExport { .. } => None,
        }
    }
}

impl From<UnitError> for BundleError {
    fn from(error: UnitError) -> Self {
        BundleError::Transform(error)
    }
}

pub type Result<T, E = BundleError> = std::result::Result<T, E>;
