use colored::Colorize;
use dtsb_bundler::BundleError;
use dtsb_common::{Diagnostic, LineMap};

/// Prints bundle failures, in color when attached to a terminal.
pub struct Reporter {
    color: bool,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Reporter { color }
    }

    pub fn render(&self, errors: &[BundleError]) -> String {
        let mut out = String::new();
        for error in errors {
            out.push_str(&self.format_error(error));
            out.push('\n');
        }
        if !errors.is_empty() {
            out.push('\n');
            out.push_str(&self.format_summary(errors.len()));
            out.push('\n');
        }
        out
    }

    pub fn format_error(&self, error: &BundleError) -> String {
        let diagnostic = error.to_diagnostic();
        match error.source_text() {
            Some(source) => self.format_diagnostic(&diagnostic, source),
            None => {
                let file = if self.color {
                    diagnostic.file_name.bold().to_string()
                } else {
                    diagnostic.file_name.clone()
                };
                format!(
                    "{file}: {}[{}]: {}",
                    self.format_severity(),
                    self.format_code(&diagnostic),
                    diagnostic.message
                )
            }
        }
    }

    /// `file(line,col): error CODE: message`, the offending line and a caret underline.
    ///
    /// Without color this is exactly [`Diagnostic::format_with_excerpt`].
    pub fn format_diagnostic(&self, diagnostic: &Diagnostic, source: &str) -> String {
        if !self.color {
            return diagnostic.format_with_excerpt(source);
        }

        let map = LineMap::build(source);
        let pos = map.offset_to_position(diagnostic.span.start);
        let line = map.line_span(source, pos.line);
        let underline_end = diagnostic
            .span
            .end
            .clamp(diagnostic.span.start, line.end.max(diagnostic.span.start));
        let width = (underline_end - diagnostic.span.start).max(1) as usize;
        let gutter = (pos.line + 1).to_string();
        let pad = " ".repeat(gutter.len());

        let location = format!("{}({},{})", diagnostic.file_name, pos.line + 1, pos.character + 1);
        format!(
            "{}: {} {}: {}\n {} {} {}\n {pad} {} {}{}",
            location.bold(),
            self.format_severity(),
            self.format_code(diagnostic),
            diagnostic.message,
            gutter.dimmed(),
            "|".dimmed(),
            line.slice(source),
            "|".dimmed(),
            " ".repeat(pos.character as usize),
            "^".repeat(width).red().bold(),
        )
    }

    pub fn format_summary(&self, count: usize) -> String {
        let summary = if count == 1 {
            "Found 1 error.".to_string()
        } else {
            format!("Found {count} errors.")
        };
        if self.color {
            summary.red().bold().to_string()
        } else {
            summary
        }
    }

    fn format_severity(&self) -> String {
        if self.color {
            "error".red().bold().to_string()
        } else {
            "error".to_string()
        }
    }

    fn format_code(&self, diagnostic: &Diagnostic) -> String {
        let label = diagnostic.code_label();
        if self.color {
            label.bright_blue().to_string()
        } else {
            label
        }
    }
}
