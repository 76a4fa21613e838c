use std::sync::Arc;

use super::reporter::Reporter;
use dtsb_bundler::BundleError;
use dtsb_common::Span;

fn missing_export() -> BundleError {
    BundleError::MissingExport {
        file_name: "index.d.ts".to_string(),
        module: "./a".to_string(),
        name: "Nope".to_string(),
        span: Span::new(9, 13),
        source_text: Arc::from("import { Nope } from \"./a\";\n"),
    }
}

#[test]
fn plain_output_matches_rendered_error() {
    let reporter = Reporter::new(false);
    let error = missing_export();
    assert_eq!(reporter.format_error(&error), error.render());
    assert_eq!(
        reporter.format_error(&error),
        "index.d.ts(1,10): error DTS9005: module './a' has no exported member 'Nope'\n \
         1 | import { Nope } from \"./a\";\n   |          ^^^^"
    );
}

#[test]
fn io_errors_have_no_excerpt() {
    let reporter = Reporter::new(false);
    let error = BundleError::io(
        "missing.d.ts",
        std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
    );
    let rendered = reporter.format_error(&error);
    assert_eq!(rendered, error.render());
    assert!(rendered.starts_with("missing.d.ts: error[DTS9006]"));
}

#[test]
fn render_ends_with_summary() {
    let reporter = Reporter::new(false);
    let out = reporter.render(&[missing_export(), missing_export()]);
    assert!(out.ends_with("\nFound 2 errors.\n"));
    assert_eq!(reporter.format_summary(1), "Found 1 error.");
}

#[test]
fn colored_output_keeps_the_message() {
    colored::control::set_override(true);
    let reporter = Reporter::new(true);
    let rendered = reporter.format_error(&missing_export());
    colored::control::unset_override();
    assert!(rendered.contains("module './a' has no exported member 'Nope'"));
    assert!(rendered.contains("\u{1b}["));
    assert!(rendered.contains("import { Nope } from \"./a\";"));
}
