//! Diagnostic Infrastructure
//!
//! Every error the bundler surfaces is converted into a `Diagnostic`: a file name,
//! a byte span into the text the error refers to, a code and a message. Rendering
//! turns the span into a line/column and an excerpt with a caret underline:
//!
//! ```text
//! index.d.ts(3,16): error DTS9001: unsupported construct: destructuring in variable declarations
//!    3 | declare const { a }: X;
//!      |               ^^^^^
//! ```

use crate::position::LineMap;
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic codes.
///
/// Codes shared with the TypeScript compiler keep their `TS` numbers; bundler
/// specific failures live in the `DTS9xxx` range.
pub mod codes {
    /// The front-end rejected the unit's syntax.
    pub const PARSE_ERROR: u32 = 9000;
    /// A recognized shape the transformer cannot express as a reference graph.
    pub const UNSUPPORTED_CONSTRUCT: u32 = 9001;
    /// An inline `import("…")` type without a usable module specifier.
    pub const MALFORMED_INLINE_IMPORT: u32 = 9002;
    /// A namespace record points at a declaration missing from the chunk.
    pub const RECONSTRUCTION_INTEGRITY: u32 = 9003;
    /// Two text edits in the same unit contradict each other.
    pub const EDIT_CONFLICT: u32 = 9004;
    /// An import names an export the target unit does not provide.
    pub const MISSING_EXPORT: u32 = 9005;
    /// Reading an input file failed.
    pub const IO_ERROR: u32 = 9006;
    /// TS2307: Cannot find module.
    pub const CANNOT_FIND_MODULE: u32 = 2307;
}

/// The severity level of a diagnostic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error (highest severity)
    #[default]
    Error = 1,
    /// A warning
    Warning = 2,
}

impl DiagnosticSeverity {
    /// Get the severity name for display.
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DiagnosticSeverity::Error)
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A diagnostic message with location, severity, and code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The file containing the diagnostic
    pub file_name: String,
    /// The source span (byte offsets into the text the diagnostic was raised on)
    pub span: Span,
    /// The diagnostic message
    pub message: String,
    /// The severity level
    pub severity: DiagnosticSeverity,
    /// The diagnostic code
    pub code: u32,
}

impl Diagnostic {
    pub fn new(
        file_name: impl Into<String>,
        span: Span,
        message: impl Into<String>,
        severity: DiagnosticSeverity,
        code: u32,
    ) -> Self {
        Diagnostic {
            file_name: file_name.into(),
            span,
            message: message.into(),
            severity,
            code,
        }
    }

    /// Create an error diagnostic.
    pub fn error(
        file_name: impl Into<String>,
        span: Span,
        message: impl Into<String>,
        code: u32,
    ) -> Self {
        Self::new(file_name, span, message, DiagnosticSeverity::Error, code)
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    /// The printed code, e.g. `TS2307` or `DTS9001`.
    pub fn code_label(&self) -> String {
        if self.code >= 9000 {
            format!("DTS{}", self.code)
        } else {
            format!("TS{}", self.code)
        }
    }

    /// Format the diagnostic header.
    ///
    /// Returns a string like: `index.d.ts(1,5): error DTS9001: unsupported construct: …`
    pub fn format(&self, source: &str) -> String {
        let map = LineMap::build(source);
        let pos = map.offset_to_position(self.span.start);
        format!(
            "{}({},{}): {} {}: {}",
            self.file_name,
            pos.line + 1,
            pos.character + 1,
            self.severity,
            self.code_label(),
            self.message
        )
    }

    /// Format the header followed by the offending source line and a caret underline.
    ///
    /// Spans that cross a line break are underlined up to the end of their first line.
    pub fn format_with_excerpt(&self, source: &str) -> String {
        let map = LineMap::build(source);
        let pos = map.offset_to_position(self.span.start);
        let line = map.line_span(source, pos.line);
        let line_text = line.slice(source);
        let underline_end = self.span.end.clamp(self.span.start, line.end.max(self.span.start));
        let width = (underline_end - self.span.start).max(1) as usize;
        let gutter = (pos.line + 1).to_string();
        let pad = " ".repeat(gutter.len());

        let mut out = self.format(source);
        out.push('\n');
        out.push_str(&format!(" {gutter} | {line_text}\n"));
        out.push_str(&format!(
            " {pad} | {}{}",
            " ".repeat(pos.character as usize),
            "^".repeat(width)
        ));
        out
    }

    /// Format the diagnostic without location, e.g. `error[DTS9001]: …`.
    pub fn format_simple(&self) -> String {
        format!("{}[{}]: {}", self.severity, self.code_label(), self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_header_uses_one_based_positions() {
        let source = "interface A {}\ndeclare const { a }: A;\n";
        let diag = Diagnostic::error(
            "index.d.ts",
            Span::new(29, 34),
            "unsupported construct: destructuring",
            codes::UNSUPPORTED_CONSTRUCT,
        );
        assert_eq!(
            diag.format(source),
            "index.d.ts(2,15): error DTS9001: unsupported construct: destructuring"
        );
    }

    #[test]
    fn test_format_with_excerpt_underlines_span() {
        let source = "interface A {}\ndeclare const { a }: A;\n";
        let diag = Diagnostic::error("index.d.ts", Span::new(29, 34), "bad", 9001);
        let rendered = diag.format_with_excerpt(source);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], " 2 | declare const { a }: A;");
        assert_eq!(lines[2], "   |               ^^^^^");
    }

    #[test]
    fn test_code_label() {
        let ts = Diagnostic::error("a.d.ts", Span::at(0), "x", codes::CANNOT_FIND_MODULE);
        let dts = Diagnostic::error("a.d.ts", Span::at(0), "x", codes::PARSE_ERROR);
        assert_eq!(ts.code_label(), "TS2307");
        assert_eq!(dts.code_label(), "DTS9000");
        assert_eq!(dts.format_simple(), "error[DTS9000]: x");
    }

    #[test]
    fn test_diagnostic_serializes_severity_lowercase() {
        let diag = Diagnostic::error("a.d.ts", Span::new(1, 2), "x", 9001);
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"severity\":\"error\""));
    }
}
