//! End-to-end bundling of small declaration trees written to a temp directory.

use dtsb_bundler::{BundleOptions, bundle, bundle_entries};
use dtsb_common::codes;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }
    dir
}

fn bundle_tree(files: &[(&str, &str)]) -> String {
    bundle_tree_with(files, &BundleOptions::default())
}

fn bundle_tree_with(files: &[(&str, &str)], options: &BundleOptions) -> String {
    let dir = write_tree(files);
    match bundle(&dir.path().join("index.d.ts"), options) {
        Ok(bundle) => bundle.code,
        Err(err) => panic!("bundle failed:\n{}", err.render()),
    }
}

fn entry(dir: &Path) -> PathBuf {
    dir.join("index.d.ts")
}

#[test]
fn test_unused_declarations_are_shaken() {
    let code = bundle_tree(&[
        (
            "index.d.ts",
            "import { A } from \"./a\";\nexport declare function make(): A;\n",
        ),
        (
            "a.d.ts",
            "export interface A { b: B }\ninterface B {}\nexport interface Unused {}\n",
        ),
    ]);
    assert!(code.contains("interface A { b: B }"), "{code}");
    assert!(code.contains("interface B {}"), "{code}");
    assert!(code.contains("declare function make(): A;"), "{code}");
    assert!(!code.contains("Unused"), "{code}");
    assert!(code.trim_end().ends_with("export { make };"), "{code}");
}

#[test]
fn test_inferred_names_do_not_keep_private_declarations() {
    let code = bundle_tree(&[
        ("index.d.ts", "export { R } from \"./b\";\nexport { RT } from \"./a\";\n"),
        (
            "a.d.ts",
            "export type RT<T> = T extends () => infer R ? R : never;\ninterface R { a: 1 }\n",
        ),
        ("b.d.ts", "export interface R { b: 2 }\n"),
    ]);
    assert!(code.contains("infer R ? R : never"), "{code}");
    assert!(code.contains("interface R { b: 2 }"), "{code}");
    assert!(!code.contains("a: 1"), "{code}");
    assert!(!code.contains("R$1"), "{code}");
}

#[test]
fn test_typeof_parameter_is_not_linked_to_top_level_value() {
    let code = bundle_tree(&[
        ("index.d.ts", "export { f } from \"./a\";\nexport { x } from \"./b\";\n"),
        (
            "a.d.ts",
            "export declare function f(x: string): typeof x;\ndeclare const x: number;\n",
        ),
        ("b.d.ts", "export declare const x: boolean;\n"),
    ]);
    assert!(code.contains("declare function f(x: string): typeof x;"), "{code}");
    assert!(code.contains("declare const x: boolean;"), "{code}");
    assert!(!code.contains("x: number"), "{code}");
    assert!(!code.contains("x$1"), "{code}");
}

#[test]
fn test_dependencies_render_before_dependents() {
    let code = bundle_tree(&[
        ("index.d.ts", "import { A } from \"./a\";\nexport type Root = A;\n"),
        ("a.d.ts", "export interface A {}\n"),
    ]);
    let a = code.find("interface A").unwrap();
    let root = code.find("type Root").unwrap();
    assert!(a < root, "{code}");
}

#[test]
fn test_colliding_names_are_renamed() {
    let code = bundle_tree(&[
        (
            "index.d.ts",
            "import { Options as AOptions } from \"./a\";\n\
             import { Options as BOptions } from \"./b\";\n\
             export interface Config { a: AOptions; b: BOptions }\n",
        ),
        ("a.d.ts", "export interface Options { a: string }\n"),
        ("b.d.ts", "export interface Options { b: number }\n"),
    ]);
    assert!(code.contains("interface Options { a: string }"), "{code}");
    assert!(code.contains("interface Options$1 { b: number }"), "{code}");
    assert!(code.contains("interface Config { a: Options; b: Options$1 }"), "{code}");
    assert!(!code.contains("AOptions"), "{code}");
}

#[test]
fn test_globals_are_never_shadowed() {
    let code = bundle_tree(&[
        (
            "index.d.ts",
            "import { Promise as Local } from \"./a\";\n\
             export declare function run(): Promise<Local>;\n",
        ),
        ("a.d.ts", "export interface Promise { local: true }\n"),
    ]);
    assert!(code.contains("interface Promise$1 { local: true }"), "{code}");
    assert!(code.contains("run(): Promise<Promise$1>;"), "{code}");
}

#[test]
fn test_export_star_is_expanded() {
    let code = bundle_tree(&[
        ("index.d.ts", "export * from \"./a\";\nexport interface Own {}\n"),
        ("a.d.ts", "export interface A {}\nexport interface B {}\n"),
    ]);
    assert!(code.contains("interface A {}"), "{code}");
    assert!(code.contains("interface B {}"), "{code}");
    assert!(code.contains("export { Own, A, B };"), "{code}");
}

#[test]
fn test_reexport_with_rename() {
    let code = bundle_tree(&[
        ("index.d.ts", "export { Inner as Outer } from \"./a\";\n"),
        ("a.d.ts", "export interface Inner {}\n"),
    ]);
    assert!(code.contains("interface Inner {}"), "{code}");
    assert!(code.contains("export { Inner as Outer };"), "{code}");
}

#[test]
fn test_namespace_import_is_reconstructed() {
    let code = bundle_tree(&[
        (
            "index.d.ts",
            "import * as ns from \"./a\";\nexport declare const x: ns.A;\n",
        ),
        ("a.d.ts", "export interface A {}\n"),
    ]);
    assert!(code.contains("type ns_A = A;"), "{code}");
    assert!(code.contains("declare namespace ns {\n  export { ns_A as A };\n}"), "{code}");
    assert!(code.contains("declare const x: ns.A;"), "{code}");
    assert!(!code.contains("Object.freeze"), "{code}");
}

#[test]
fn test_external_imports_are_grouped() {
    let code = bundle_tree(&[(
        "index.d.ts",
        "import { Readable } from \"stream\";\n\
         import { Writable } from \"stream\";\n\
         export declare function pipe(r: Readable): Writable;\n",
    )]);
    assert!(code.contains("import { Readable, Writable } from \"stream\";"), "{code}");
    assert_eq!(code.matches("from \"stream\"").count(), 1, "{code}");
}

#[test]
fn test_unused_external_import_is_dropped() {
    let code = bundle_tree(&[(
        "index.d.ts",
        "import { Readable } from \"stream\";\nexport interface A {}\n",
    )]);
    assert!(!code.contains("stream"), "{code}");
}

#[test]
fn test_external_star_reexport_is_kept() {
    let code = bundle_tree(&[("index.d.ts", "export * from \"events\";\n")]);
    assert!(code.contains("export * from \"events\";"), "{code}");
}

#[test]
fn test_empty_entry_stays_a_module() {
    let code = bundle_tree(&[("index.d.ts", "interface Hidden {}\n")]);
    assert!(!code.contains("Hidden"), "{code}");
    assert!(code.trim_end().ends_with("export {};"), "{code}");
}

#[test]
fn test_global_augmentation_is_always_kept() {
    let code = bundle_tree(&[
        ("index.d.ts", "export { A } from \"./a\";\n"),
        (
            "a.d.ts",
            "export interface A {}\ninterface Hook {}\ndeclare global {\n  interface Window { hook: Hook }\n}\n",
        ),
    ]);
    assert!(code.contains("interface Window { hook: Hook }"), "{code}");
    assert!(code.contains("interface Hook {}"), "{code}");
}

#[test]
fn test_reference_directives_are_hoisted() {
    let code = bundle_tree(&[
        (
            "index.d.ts",
            "/// <reference types=\"node\" />\nimport { A } from \"./a\";\nexport type B = A;\n",
        ),
        (
            "a.d.ts",
            "/// <reference types=\"node\" />\n/// <reference lib=\"dom\" />\nexport interface A {}\n",
        ),
    ]);
    assert!(
        code.starts_with("/// <reference types=\"node\" />\n/// <reference lib=\"dom\" />\n"),
        "{code}"
    );
    assert_eq!(code.matches("reference types").count(), 1, "{code}");
}

#[test]
fn test_inlined_package_is_bundled() {
    let options = BundleOptions {
        include_external: vec!["dep".to_string()],
        ..BundleOptions::default()
    };
    let code = bundle_tree_with(
        &[
            ("index.d.ts", "import { Dep } from \"dep\";\nexport type Wrapped = Dep;\n"),
            (
                "node_modules/dep/package.json",
                "{ \"name\": \"dep\", \"types\": \"lib/index.d.ts\" }",
            ),
            ("node_modules/dep/lib/index.d.ts", "export interface Dep { inlined: true }\n"),
        ],
        &options,
    );
    assert!(code.contains("interface Dep { inlined: true }"), "{code}");
    assert!(!code.contains("from \"dep\""), "{code}");
}

#[test]
fn test_missing_export_is_reported() {
    let dir = write_tree(&[
        ("index.d.ts", "import { Nope } from \"./a\";\nexport declare const x: Nope;\n"),
        ("a.d.ts", "export interface A {}\n"),
    ]);
    let err = bundle(&entry(dir.path()), &BundleOptions::default()).unwrap_err();
    assert_eq!(err.code(), codes::MISSING_EXPORT);
    let rendered = err.render();
    assert!(rendered.contains("has no exported member 'Nope'"), "{rendered}");
}

#[test]
fn test_missing_relative_module_is_reported() {
    let dir = write_tree(&[(
        "index.d.ts",
        "import { A } from \"./missing\";\nexport type B = A;\n",
    )]);
    let err = bundle(&entry(dir.path()), &BundleOptions::default()).unwrap_err();
    assert_eq!(err.code(), codes::CANNOT_FIND_MODULE);
    let rendered = err.render();
    assert!(rendered.contains("error TS2307"), "{rendered}");
    assert!(rendered.contains("Cannot find module './missing'"), "{rendered}");
}

#[test]
fn test_unsupported_construct_is_reported() {
    let dir = write_tree(&[("index.d.ts", "declare const a: number;\nexport = a;\n")]);
    let err = bundle(&entry(dir.path()), &BundleOptions::default()).unwrap_err();
    assert_eq!(err.code(), codes::UNSUPPORTED_CONSTRUCT);
}

#[test]
fn test_missing_entry_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = bundle(&entry(dir.path()), &BundleOptions::default()).unwrap_err();
    assert_eq!(err.code(), codes::IO_ERROR);
}

#[test]
fn test_cyclic_imports_terminate() {
    let code = bundle_tree(&[
        ("index.d.ts", "import { B } from \"./b\";\nexport interface A { b: B }\n"),
        ("b.d.ts", "import { A } from \"./index\";\nexport interface B { a: A }\n"),
    ]);
    assert!(code.contains("interface A { b: B }"), "{code}");
    assert!(code.contains("interface B { a: A }"), "{code}");
}

#[test]
fn test_bundle_entries_bundles_each_entry() {
    let dir = write_tree(&[
        ("one.d.ts", "export interface One {}\n"),
        ("two.d.ts", "export interface Two {}\n"),
    ]);
    let entries = [dir.path().join("one.d.ts"), dir.path().join("two.d.ts")];
    let bundles = bundle_entries(&entries, &BundleOptions::default());
    assert_eq!(bundles.len(), 2);
    let one = bundles[0].as_ref().unwrap();
    let two = bundles[1].as_ref().unwrap();
    assert!(one.code.contains("interface One {}"));
    assert!(!one.code.contains("Two"));
    assert!(two.code.contains("interface Two {}"));
    assert_eq!(one.files, [entries[0].canonicalize().unwrap()]);
}
