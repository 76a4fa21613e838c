use clap::Parser;
use std::path::{Path, PathBuf};

use super::args::CliArgs;
use super::config::{Output, parse_config, resolve_config};

fn args(argv: &[&str]) -> CliArgs {
    let mut full = vec!["dtsb"];
    full.extend_from_slice(argv);
    CliArgs::try_parse_from(full).expect("args should parse")
}

#[test]
fn parses_config_with_comments_and_trailing_commas() {
    let config = parse_config(
        r#"{
            // entry points
            "entries": ["src/index.d.ts",],
            /* inline these */
            "includeExternal": ["dep"],
            "outDir": "dist",
        }"#,
    )
    .expect("jsonc config should parse");

    assert_eq!(config.entries, vec![PathBuf::from("src/index.d.ts")]);
    assert_eq!(config.options.include_external, vec!["dep".to_string()]);
    assert_eq!(config.out_dir.as_deref(), Some(Path::new("dist")));
    assert!(config.out_file.is_none());
}

#[test]
fn comment_markers_inside_strings_are_kept() {
    let config = parse_config(r#"{ "entries": ["a//b.d.ts", "c/*d*/.d.ts"] }"#).unwrap();
    assert_eq!(
        config.entries,
        vec![PathBuf::from("a//b.d.ts"), PathBuf::from("c/*d*/.d.ts")]
    );
}

#[test]
fn rejects_malformed_config() {
    assert!(parse_config("{ \"entries\": [").is_err());
}

#[test]
fn single_entry_without_output_goes_to_stdout() {
    let cwd = tempfile::tempdir().unwrap();
    let resolved = resolve_config(&args(&["index.d.ts"]), cwd.path()).unwrap();
    assert_eq!(resolved.entries, vec![cwd.path().join("index.d.ts")]);
    assert_eq!(resolved.output, Output::Stdout);
    assert!(resolved.config_path.is_none());
}

#[test]
fn config_file_paths_are_relative_to_the_file() {
    let cwd = tempfile::tempdir().unwrap();
    let project = cwd.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(
        project.join("dtsb.json"),
        r#"{ "entries": ["src/index.d.ts"], "outFile": "dist/index.d.ts", "typeRoots": ["types"] }"#,
    )
    .unwrap();

    let resolved = resolve_config(&args(&["--config", "project"]), cwd.path()).unwrap();
    assert_eq!(resolved.config_path, Some(project.join("dtsb.json")));
    assert_eq!(resolved.entries, vec![project.join("src/index.d.ts")]);
    assert_eq!(resolved.output, Output::File(project.join("dist/index.d.ts")));
    assert_eq!(resolved.options.type_roots, vec![project.join("types")]);
}

#[test]
fn flags_override_config_file() {
    let cwd = tempfile::tempdir().unwrap();
    std::fs::write(
        cwd.path().join("dtsb.json"),
        r#"{ "entries": ["a.d.ts", "b.d.ts"], "outDir": "dist", "includeExternal": ["x"] }"#,
    )
    .unwrap();

    let resolved = resolve_config(
        &args(&["--include-external", "y", "--respect-external", "--out-dir", "out", "c.d.ts"]),
        cwd.path(),
    )
    .unwrap();
    assert_eq!(resolved.entries, vec![cwd.path().join("c.d.ts")]);
    assert_eq!(resolved.output, Output::Dir(cwd.path().join("out")));
    assert_eq!(resolved.options.include_external, vec!["y".to_string()]);
    assert!(resolved.options.respect_external);
}

#[test]
fn missing_entries_is_an_error() {
    let cwd = tempfile::tempdir().unwrap();
    let err = resolve_config(&args(&[]), cwd.path()).unwrap_err();
    assert!(err.to_string().contains("no entry files"), "{err}");
}

#[test]
fn out_file_needs_a_single_entry() {
    let cwd = tempfile::tempdir().unwrap();
    let err = resolve_config(&args(&["-o", "out.d.ts", "a.d.ts", "b.d.ts"]), cwd.path()).unwrap_err();
    assert!(err.to_string().contains("exactly one entry"), "{err}");
}

#[test]
fn several_entries_need_out_dir() {
    let cwd = tempfile::tempdir().unwrap();
    let err = resolve_config(&args(&["a.d.ts", "b.d.ts"]), cwd.path()).unwrap_err();
    assert!(err.to_string().contains("needs outDir"), "{err}");
}

#[test]
fn missing_explicit_config_is_an_error() {
    let cwd = tempfile::tempdir().unwrap();
    let err = resolve_config(&args(&["--config", "nope.json", "a.d.ts"]), cwd.path()).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read config"), "{err:#}");
}

#[test]
fn show_config_json_uses_camel_case() {
    let cwd = tempfile::tempdir().unwrap();
    let resolved = resolve_config(&args(&["--out-dir", "dist", "--include-external", "dep", "a.d.ts"]), cwd.path()).unwrap();
    let json = resolved.to_json();
    assert_eq!(json["includeExternal"], serde_json::json!(["dep"]));
    assert_eq!(json["respectExternal"], serde_json::json!(false));
    assert!(json.get("outDir").is_some());
    assert!(json.get("outFile").is_none());
}
