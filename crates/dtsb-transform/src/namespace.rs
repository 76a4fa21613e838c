//! Namespace records and the Namespace Reconstructor.
//!
//! A namespace object (`import * as ns` of an internal unit) cannot survive bundling
//! as a real namespace because the host renames and drops its members freely. The host
//! therefore emits a marker statement per namespace:
//!
//! ```text
//! var ns = /*#__PURE__*/Object.freeze({ __proto__: null, x: x, y: localY });
//! ```
//!
//! After the chunk is final, [`reconstruct`] replaces each marker with forwarding
//! aliases and a `declare namespace` block that re-exports them.

use crate::error::{Result, TransformError};
use crate::frontend::{self, DeclarationUnit};
use crate::graph::DeclKind;
use crate::trivia;
use dtsb_common::Span;
use rustc_hash::{FxHashMap, FxHashSet};
use swc_common::Spanned;
use swc_ecma_ast::{
    Callee, Decl, Expr, ImportSpecifier, MemberProp, ModuleDecl, ModuleItem, Pat, Prop, PropName,
    PropOrSpread, Stmt, TsModuleName, TsTypeParamDecl, VarDecl,
};
use tracing::debug;

/// `(exported, local)` pairs of one namespace object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceRecord {
    pub name: String,
    pub exports: Vec<(String, String)>,
}

impl NamespaceRecord {
    pub fn new(name: impl Into<String>) -> Self {
        NamespaceRecord {
            name: name.into(),
            exports: Vec::new(),
        }
    }

    pub fn push(&mut self, exported: impl Into<String>, local: impl Into<String>) {
        self.exports.push((exported.into(), local.into()));
    }

    /// Encode as a marker statement.
    pub fn encode(&self) -> String {
        let mut props = String::from("__proto__: null");
        for (exported, local) in &self.exports {
            props.push_str(&format!(", {exported}: {local}"));
        }
        format!("var {} = /*#__PURE__*/Object.freeze({{ {props} }});", self.name)
    }
}

#[derive(Clone, Copy, Debug)]
struct ItemInfo {
    kind: DeclKind,
    generic_arity: usize,
}

/// Rewrite every namespace marker in a finished chunk.
pub fn reconstruct(file_name: &str, text: &str) -> Result<String> {
    let unit = frontend::parse(file_name, text.to_string())?;
    let items = collect_items(&unit);
    let mut taken: FxHashSet<String> = items.keys().cloned().collect();

    let mut replacements: Vec<(Span, String)> = Vec::new();
    for item in unit.module.body.iter().rev() {
        let stmt = unit.span(item.span());
        match item {
            ModuleItem::Stmt(Stmt::Empty(_)) => replacements.push((stmt, String::new())),
            ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => {
                if let Some(record) = decode_marker(var) {
                    let end = trivia::extend_over_semicolon(&unit.text, stmt.end_usize());
                    let span = Span::from_offsets(stmt.start_usize(), end);
                    let rendered = render_record(&record, &items, &mut taken, span)?;
                    replacements.push((span, rendered));
                }
            }
            _ => {}
        }
    }

    let count = replacements.len();
    let mut out = unit.text;
    // Later statements first, so earlier offsets stay valid.
    for (span, replacement) in replacements {
        out.replace_range(span.start_usize()..span.end_usize(), &replacement);
    }
    debug!(file = file_name, markers = count, "reconstructed namespaces");
    Ok(out)
}

/// Decode `var ns = Object.freeze({ __proto__: null, a: b })`.
pub fn decode_marker(var: &VarDecl) -> Option<NamespaceRecord> {
    let [declarator] = var.decls.as_slice() else {
        return None;
    };
    let Pat::Ident(binding) = &declarator.name else {
        return None;
    };
    let Expr::Call(call) = &**declarator.init.as_ref()? else {
        return None;
    };
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Member(member) = &**callee else {
        return None;
    };
    let is_freeze = matches!(&*member.obj, Expr::Ident(obj) if &*obj.sym == "Object")
        && matches!(&member.prop, MemberProp::Ident(prop) if &*prop.sym == "freeze");
    if !is_freeze {
        return None;
    }
    let Expr::Object(object) = &*call.args.first()?.expr else {
        return None;
    };

    let mut record = NamespaceRecord::new(binding.id.sym.to_string());
    for prop in &object.props {
        let PropOrSpread::Prop(prop) = prop else {
            return None;
        };
        let Prop::KeyValue(kv) = &**prop else {
            return None;
        };
        let key = match &kv.key {
            PropName::Ident(ident) => ident.sym.to_string(),
            PropName::Str(s) => s.value.to_string(),
            _ => return None,
        };
        if key == "__proto__" {
            continue;
        }
        let Expr::Ident(local) = &*kv.value else {
            return None;
        };
        record.push(key, local.sym.to_string());
    }
    Some(record)
}

fn render_record(
    record: &NamespaceRecord,
    items: &FxHashMap<String, ItemInfo>,
    taken: &mut FxHashSet<String>,
    span: Span,
) -> Result<String> {
    let ns = &record.name;
    let mut out = String::new();
    let mut entries = Vec::with_capacity(record.exports.len());
    for (exported, local) in &record.exports {
        let info = items.get(local).ok_or_else(|| TransformError::ReconstructionIntegrity {
            span,
            namespace: ns.clone(),
            name: local.clone(),
        })?;
        if exported != local {
            entries.push(format!("{local} as {exported}"));
            continue;
        }

        let alias = unique_alias(&format!("{ns}_{exported}"), taken);
        match info.kind {
            DeclKind::Interface | DeclKind::Type => {
                out.push_str(&type_alias(&alias, local, info.generic_arity));
            }
            DeclKind::Class | DeclKind::Enum => {
                out.push_str(&type_alias(&alias, local, info.generic_arity));
                out.push_str(&format!("declare const {alias}: typeof {local};\n"));
            }
            DeclKind::Function | DeclKind::Var => {
                out.push_str(&format!("declare const {alias}: typeof {local};\n"));
            }
            DeclKind::Namespace | DeclKind::Import => {
                out.push_str(&format!("import {alias} = {local};\n"));
            }
        }
        entries.push(format!("{alias} as {exported}"));
    }

    if entries.is_empty() {
        out.push_str(&format!("declare namespace {ns} {{\n  export {{}};\n}}"));
    } else {
        out.push_str(&format!(
            "declare namespace {ns} {{\n  export {{ {} }};\n}}",
            entries.join(", ")
        ));
    }
    Ok(out)
}

fn type_alias(alias: &str, local: &str, arity: usize) -> String {
    if arity == 0 {
        return format!("type {alias} = {local};\n");
    }
    let params: Vec<String> = (0..arity).map(|i| format!("T{i}")).collect();
    let params = params.join(", ");
    format!("type {alias}<{params}> = {local}<{params}>;\n")
}

fn unique_alias(base: &str, taken: &mut FxHashSet<String>) -> String {
    let mut alias = base.to_string();
    let mut n = 1;
    while taken.contains(&alias) {
        alias = format!("{base}${n}");
        n += 1;
    }
    taken.insert(alias.clone());
    alias
}

/// Kinds of every top-level binding in a chunk.
fn collect_items(unit: &DeclarationUnit) -> FxHashMap<String, ItemInfo> {
    let mut items: FxHashMap<String, ItemInfo> = FxHashMap::default();
    let mut add = |name: String, kind: DeclKind, generic_arity: usize| {
        items
            .entry(name)
            .and_modify(|info| {
                if info.kind.is_mergeable() && !kind.is_mergeable() {
                    info.kind = kind;
                }
                info.generic_arity = info.generic_arity.max(generic_arity);
            })
            .or_insert(ItemInfo { kind, generic_arity });
    };

    for item in &unit.module.body {
        let decl = match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => decl,
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => &export.decl,
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                for specifier in &import.specifiers {
                    let local = match specifier {
                        ImportSpecifier::Named(named) => &named.local,
                        ImportSpecifier::Default(default) => &default.local,
                        ImportSpecifier::Namespace(ns) => &ns.local,
                    };
                    add(local.sym.to_string(), DeclKind::Import, 0);
                }
                continue;
            }
            ModuleItem::ModuleDecl(ModuleDecl::TsImportEquals(import)) => {
                add(import.id.sym.to_string(), DeclKind::Import, 0);
                continue;
            }
            _ => continue,
        };
        match decl {
            Decl::Class(class) => add(
                class.ident.sym.to_string(),
                DeclKind::Class,
                arity(class.class.type_params.as_deref()),
            ),
            Decl::Fn(func) => add(
                func.ident.sym.to_string(),
                DeclKind::Function,
                arity(func.function.type_params.as_deref()),
            ),
            Decl::TsInterface(iface) => add(
                iface.id.sym.to_string(),
                DeclKind::Interface,
                arity(iface.type_params.as_deref()),
            ),
            Decl::TsTypeAlias(alias) => add(
                alias.id.sym.to_string(),
                DeclKind::Type,
                arity(alias.type_params.as_deref()),
            ),
            Decl::TsEnum(decl) => add(decl.id.sym.to_string(), DeclKind::Enum, 0),
            Decl::TsModule(module) => {
                if let TsModuleName::Ident(ident) = &module.id {
                    if !module.global {
                        add(ident.sym.to_string(), DeclKind::Namespace, 0);
                    }
                }
            }
            Decl::Var(var) => {
                let kind = if decode_marker(var).is_some() {
                    DeclKind::Namespace
                } else {
                    DeclKind::Var
                };
                for declarator in &var.decls {
                    if let Pat::Ident(binding) = &declarator.name {
                        add(binding.id.sym.to_string(), kind, 0);
                    }
                }
            }
            Decl::Using(_) => {}
        }
    }
    items
}

fn arity(params: Option<&TsTypeParamDecl>) -> usize {
    params.map_or(0, |params| params.params.len())
}
