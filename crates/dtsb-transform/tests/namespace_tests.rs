//! Tests for namespace marker reconstruction in finished chunks.

use dtsb_transform::{NamespaceRecord, TransformError, reconstruct_namespaces};

fn marker() -> String {
    let mut record = NamespaceRecord::new("ns");
    record.push("x", "x");
    record.push("y", "localY");
    record.encode()
}

const EXPECTED_BLOCK: &str =
    "type ns_x = x;\ndeclare namespace ns {\n  export { ns_x as x, localY as y };\n}";

#[test]
fn test_rendering_is_independent_of_surroundings() {
    let small = format!("interface x {{}}\ndeclare const localY: number;\n{}\n", marker());
    let large = format!(
        "declare const localY: number;\ntype Other = 1;\ninterface x {{}}\n{}\ndeclare function g(): void;\nexport {{ ns }};\n",
        marker()
    );
    let small = reconstruct_namespaces("chunk.d.ts", &small).unwrap();
    let large = reconstruct_namespaces("chunk.d.ts", &large).unwrap();
    assert_eq!(
        small,
        format!("interface x {{}}\ndeclare const localY: number;\n{EXPECTED_BLOCK}\n")
    );
    assert!(large.contains(EXPECTED_BLOCK));
    assert!(large.ends_with("declare function g(): void;\nexport { ns };\n"));
}

#[test]
fn test_text_without_markers_is_unchanged() {
    let text = "declare const a: number;\ninterface B {}\nexport { a, B };\n";
    assert_eq!(reconstruct_namespaces("chunk.d.ts", text).unwrap(), text);
}

#[test]
fn test_empty_statements_are_dropped() {
    assert_eq!(
        reconstruct_namespaces("chunk.d.ts", "interface a {};\n").unwrap(),
        "interface a {}\n"
    );
}

#[test]
fn test_nested_namespace_records() {
    let mut inner = NamespaceRecord::new("inner");
    inner.push("v", "v");
    let mut outer = NamespaceRecord::new("outer");
    outer.push("inner", "inner");
    let text = format!("declare const v: string;\n{}\n{}\n", inner.encode(), outer.encode());
    let out = reconstruct_namespaces("chunk.d.ts", &text).unwrap();
    assert!(out.contains("declare const inner_v: typeof v;\ndeclare namespace inner {\n  export { inner_v as v };\n}"));
    assert!(out.contains("import outer_inner = inner;\ndeclare namespace outer {\n  export { outer_inner as inner };\n}"));
}

#[test]
fn test_missing_local_is_an_integrity_error() {
    let mut record = NamespaceRecord::new("ns");
    record.push("y", "dropped");
    let text = format!("interface x {{}}\n{}\n", record.encode());
    let err = reconstruct_namespaces("chunk.d.ts", &text).unwrap_err();
    assert!(matches!(err.error, TransformError::ReconstructionIntegrity { .. }));
    assert_eq!(err.error.code(), dtsb_common::codes::RECONSTRUCTION_INTEGRITY);
    assert!(err.render().contains("DTS9003"));
}
