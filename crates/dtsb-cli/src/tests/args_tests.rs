use clap::Parser;
use std::path::{Path, PathBuf};

use super::args::CliArgs;

#[test]
fn parses_defaults() {
    let args = CliArgs::try_parse_from(["dtsb"]).expect("default args should parse");

    assert!(args.entries.is_empty());
    assert!(args.config.is_none());
    assert!(!args.respect_external);
    assert!(args.include_external.is_none());
    assert!(args.type_roots.is_none());
    assert!(args.out_file.is_none());
    assert!(args.out_dir.is_none());
    assert!(args.pretty.is_none());
    assert!(!args.show_config);
}

#[test]
fn parses_common_flags() {
    let args = CliArgs::try_parse_from([
        "dtsb",
        "--config",
        "configs/dtsb.json",
        "--respect-external",
        "--include-external",
        "lodash,@scope/pkg",
        "--type-roots",
        "types,vendor/types",
        "-o",
        "dist/index.d.ts",
        "src/index.d.ts",
    ])
    .expect("flagged args should parse");

    assert_eq!(args.config.as_deref(), Some(Path::new("configs/dtsb.json")));
    assert!(args.respect_external);
    assert_eq!(
        args.include_external,
        Some(vec!["lodash".to_string(), "@scope/pkg".to_string()])
    );
    assert_eq!(
        args.type_roots,
        Some(vec![PathBuf::from("types"), PathBuf::from("vendor/types")])
    );
    assert_eq!(args.out_file.as_deref(), Some(Path::new("dist/index.d.ts")));
    assert_eq!(args.entries, vec![PathBuf::from("src/index.d.ts")]);
}

#[test]
fn accepts_camel_case_aliases() {
    let args = CliArgs::try_parse_from([
        "dtsb",
        "--outDir",
        "dist",
        "--includeExternal",
        "a",
        "a.d.ts",
        "b.d.ts",
    ])
    .expect("camelCase aliases should parse");

    assert_eq!(args.out_dir.as_deref(), Some(Path::new("dist")));
    assert_eq!(args.include_external, Some(vec!["a".to_string()]));
    assert_eq!(args.entries.len(), 2);
}
