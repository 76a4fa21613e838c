//! Module resolution against real directory layouts.

use dtsb_bundler::resolver::ModuleExtension;
use dtsb_bundler::{BundleOptions, ModuleResolver, Resolution, ResolutionFailure};
use dtsb_common::Span;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn layout(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
    dir
}

fn resolve(options: &BundleOptions, from: &Path, specifier: &str) -> Result<Resolution, ResolutionFailure> {
    ModuleResolver::new(options).resolve(specifier, from, Span::new(0, 0))
}

fn internal_path(resolution: Resolution) -> PathBuf {
    match resolution {
        Resolution::Internal(module) => module.resolved_path,
        Resolution::External { specifier } => panic!("expected internal module, got external '{specifier}'"),
    }
}

fn inline(packages: &[&str]) -> BundleOptions {
    BundleOptions {
        include_external: packages.iter().map(|p| p.to_string()).collect(),
        ..BundleOptions::default()
    }
}

#[test]
fn test_relative_declaration_file() {
    let dir = layout(&[("index.d.ts", ""), ("util.d.ts", "")]);
    let from = dir.path().join("index.d.ts");
    let resolved = internal_path(resolve(&BundleOptions::default(), &from, "./util").unwrap());
    assert_eq!(resolved, dir.path().join("util.d.ts"));
}

#[test]
fn test_parent_directory_is_normalized() {
    let dir = layout(&[("src/index.d.ts", ""), ("types.d.ts", "")]);
    let from = dir.path().join("src/index.d.ts");
    let resolved = internal_path(resolve(&BundleOptions::default(), &from, "../types").unwrap());
    assert_eq!(resolved, dir.path().join("types.d.ts"));
}

#[test]
fn test_js_specifier_finds_declaration() {
    let dir = layout(&[("index.d.ts", ""), ("util.d.ts", ""), ("esm.d.mts", "")]);
    let from = dir.path().join("index.d.ts");
    let options = BundleOptions::default();
    assert_eq!(
        internal_path(resolve(&options, &from, "./util.js").unwrap()),
        dir.path().join("util.d.ts")
    );
    let esm = resolve(&options, &from, "./esm.mjs").unwrap();
    let Resolution::Internal(module) = esm else {
        panic!("expected internal module");
    };
    assert_eq!(module.resolved_path, dir.path().join("esm.d.mts"));
    assert_eq!(module.extension, ModuleExtension::DMts);
}

#[test]
fn test_directory_index() {
    let dir = layout(&[("index.d.ts", ""), ("lib/index.d.ts", "")]);
    let from = dir.path().join("index.d.ts");
    let resolved = internal_path(resolve(&BundleOptions::default(), &from, "./lib").unwrap());
    assert_eq!(resolved, dir.path().join("lib/index.d.ts"));
}

#[test]
fn test_directory_package_json_types() {
    let dir = layout(&[
        ("index.d.ts", ""),
        ("lib/package.json", "{ \"types\": \"./dist/main.d.ts\" }"),
        ("lib/dist/main.d.ts", ""),
    ]);
    let from = dir.path().join("index.d.ts");
    let resolved = internal_path(resolve(&BundleOptions::default(), &from, "./lib").unwrap());
    assert_eq!(resolved, dir.path().join("lib/dist/main.d.ts"));
}

#[test]
fn test_bare_specifier_is_external_by_default() {
    let dir = layout(&[
        ("index.d.ts", ""),
        ("node_modules/dep/index.d.ts", ""),
    ]);
    let from = dir.path().join("index.d.ts");
    let resolution = resolve(&BundleOptions::default(), &from, "dep").unwrap();
    assert_eq!(
        resolution,
        Resolution::External {
            specifier: "dep".to_string()
        }
    );
}

#[test]
fn test_respect_external_inlines_every_package() {
    let dir = layout(&[("index.d.ts", ""), ("node_modules/dep/index.d.ts", "")]);
    let from = dir.path().join("index.d.ts");
    let options = BundleOptions {
        respect_external: true,
        ..BundleOptions::default()
    };
    let resolved = internal_path(resolve(&options, &from, "dep").unwrap());
    assert_eq!(resolved, dir.path().join("node_modules/dep/index.d.ts"));
}

#[test]
fn test_included_package_types_field() {
    let dir = layout(&[
        ("src/index.d.ts", ""),
        ("node_modules/dep/package.json", "{ \"typings\": \"types/dep.d.ts\" }"),
        ("node_modules/dep/types/dep.d.ts", ""),
    ]);
    let from = dir.path().join("src/index.d.ts");
    let resolution = resolve(&inline(&["dep"]), &from, "dep").unwrap();
    let Resolution::Internal(module) = resolution else {
        panic!("expected internal module");
    };
    assert_eq!(module.resolved_path, dir.path().join("node_modules/dep/types/dep.d.ts"));
    assert_eq!(module.package_name.as_deref(), Some("dep"));
    assert_eq!(module.original_specifier, "dep");
}

#[test]
fn test_included_scoped_package_from_at_types() {
    let dir = layout(&[
        ("index.d.ts", ""),
        ("node_modules/@types/scope__pkg/index.d.ts", ""),
    ]);
    let from = dir.path().join("index.d.ts");
    let resolved = internal_path(resolve(&inline(&["@scope/pkg"]), &from, "@scope/pkg").unwrap());
    assert_eq!(resolved, dir.path().join("node_modules/@types/scope__pkg/index.d.ts"));
}

#[test]
fn test_exports_types_condition() {
    let dir = layout(&[
        ("index.d.ts", ""),
        (
            "node_modules/dep/package.json",
            r#"{
                "types": "./wrong.d.ts",
                "exports": {
                    ".": { "types": "./dist/index.d.ts", "default": "./dist/index.js" },
                    "./sub": { "types": "./dist/sub.d.ts" }
                }
            }"#,
        ),
        ("node_modules/dep/wrong.d.ts", ""),
        ("node_modules/dep/dist/index.d.ts", ""),
        ("node_modules/dep/dist/sub.d.ts", ""),
    ]);
    let from = dir.path().join("index.d.ts");
    let options = inline(&["dep"]);
    assert_eq!(
        internal_path(resolve(&options, &from, "dep").unwrap()),
        dir.path().join("node_modules/dep/dist/index.d.ts")
    );
    assert_eq!(
        internal_path(resolve(&options, &from, "dep/sub").unwrap()),
        dir.path().join("node_modules/dep/dist/sub.d.ts")
    );
}

#[test]
fn test_type_roots_are_searched() {
    let dir = layout(&[("src/index.d.ts", ""), ("typings/dep/index.d.ts", "")]);
    let from = dir.path().join("src/index.d.ts");
    let options = BundleOptions {
        include_external: vec!["dep".to_string()],
        type_roots: vec![PathBuf::from("../typings")],
        ..BundleOptions::default()
    };
    let resolved = internal_path(resolve(&options, &from, "dep").unwrap());
    assert_eq!(resolved, dir.path().join("typings/dep/index.d.ts"));
}

#[test]
fn test_included_package_without_declarations_stays_external() {
    let dir = layout(&[("index.d.ts", "")]);
    let from = dir.path().join("index.d.ts");
    assert!(matches!(
        resolve(&inline(&["dep"]), &from, "dep").unwrap(),
        Resolution::External { .. }
    ));
}

#[test]
fn test_malformed_package_json_is_reported() {
    let dir = layout(&[("index.d.ts", ""), ("node_modules/dep/package.json", "{ not json")]);
    let from = dir.path().join("index.d.ts");
    let failure = resolve(&inline(&["dep"]), &from, "dep").unwrap_err();
    assert!(matches!(failure, ResolutionFailure::PackageJsonError { .. }));
    assert!(!failure.is_not_found());
}

#[test]
fn test_missing_relative_module() {
    let dir = layout(&[("index.d.ts", "")]);
    let from = dir.path().join("index.d.ts");
    let failure = resolve(&BundleOptions::default(), &from, "./nope").unwrap_err();
    assert!(failure.is_not_found());
    assert_eq!(failure.containing_file(), from.display().to_string());
    let diagnostic = failure.to_diagnostic();
    assert_eq!(diagnostic.code, 2307);
    assert_eq!(
        diagnostic.message,
        "Cannot find module './nope' or its corresponding type declarations."
    );
}

#[test]
fn test_cached_failure_reports_the_asking_file() {
    let dir = layout(&[("a.d.ts", ""), ("b.d.ts", "")]);
    let mut resolver = ModuleResolver::new(&BundleOptions::default());
    let a = dir.path().join("a.d.ts");
    let b = dir.path().join("b.d.ts");
    resolver.resolve("./nope", &a, Span::new(1, 2)).unwrap_err();
    let failure = resolver.resolve("./nope", &b, Span::new(5, 9)).unwrap_err();
    assert_eq!(failure.containing_file(), b.display().to_string());
    assert_eq!(failure.span(), Span::new(5, 9));
}
