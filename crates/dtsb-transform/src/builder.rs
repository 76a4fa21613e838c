//! Graph Builder: turns a canonical declaration unit into graph nodes.
//!
//! One node per declared name. A later declaration of a name that already has a node
//! extends that node's range (declaration merging) and adds a self reference, so the
//! whole group is kept or dropped together. Every free name root inside a declaration
//! becomes a [`Reference`]; names bound by type parameters, mapped keys, `infer` or
//! namespace members are skipped using the [`ScopeStack`], as are `typeof` roots
//! naming a parameter.

use crate::error::{Result, TransformError};
use crate::frontend::DeclarationUnit;
use crate::graph::{
    DeclKind, ExportEntry, GraphNode, ImportBinding, ImportedName, NodeId, NodeKind, Reference,
    ReferenceDirectives, TransformOutput,
};
use crate::scope::ScopeStack;
use crate::trivia;
use crate::walk::{DeclVisitor, Walker};
use dtsb_common::Span;
use rustc_hash::FxHashMap;
use smallvec::smallvec;
use swc_common::Spanned;
use swc_ecma_ast::{
    Decl, DefaultDecl, ExportSpecifier, Expr, Ident, ImportSpecifier, ModuleDecl, ModuleExportName,
    ModuleItem, Pat, Stmt, TsImportEqualsDecl, TsModuleName, TsModuleRef,
};
use tracing::{debug, trace};

/// Build the module graph of a preprocessed unit.
pub fn build(unit: &DeclarationUnit, references: ReferenceDirectives) -> Result<TransformOutput> {
    let mut builder = GraphBuilder::new(unit);
    builder.run()?;
    debug!(
        file = %unit.file_name,
        nodes = builder.nodes.len(),
        references = builder.nodes.iter().map(|n| n.references.len()).sum::<usize>(),
        imports = builder.imports.len(),
        exports = builder.exports.len(),
        "built declaration graph"
    );
    Ok(TransformOutput {
        file_name: unit.file_name.clone(),
        code: unit.text.clone(),
        nodes: builder.nodes,
        imports: builder.imports,
        exports: builder.exports,
        references,
    })
}

struct GraphBuilder<'a> {
    unit: &'a DeclarationUnit,
    nodes: Vec<GraphNode>,
    by_name: FxHashMap<String, NodeId>,
    imports: Vec<ImportBinding>,
    exports: Vec<ExportEntry>,
    scopes: ScopeStack,
    next_marker: u32,
}

/// Forwards walker events into the scope stack and collects free references.
struct ReferenceCollector<'b> {
    unit: &'b DeclarationUnit,
    scopes: &'b mut ScopeStack,
    next_marker: &'b mut u32,
    references: Vec<Reference>,
}

impl DeclVisitor for ReferenceCollector<'_> {
    fn push_scope(&mut self) {
        self.scopes.push_scope();
    }

    fn pop_scope(&mut self) {
        self.scopes.pop_scope(1);
    }

    fn bind(&mut self, name: &str) {
        self.scopes.bind(name);
    }

    fn bind_outer(&mut self, levels: usize, name: &str) {
        self.scopes.bind_at(levels, name);
    }

    fn bind_value(&mut self, name: &str) {
        self.scopes.bind_value(name);
    }

    fn reference(&mut self, root: &Ident) {
        if !self.scopes.is_bound(&root.sym) {
            self.push_reference(root);
        }
    }

    fn value_reference(&mut self, root: &Ident) {
        if !self.scopes.is_value_bound(&root.sym) {
            self.push_reference(root);
        }
    }
}

impl ReferenceCollector<'_> {
    fn push_reference(&mut self, root: &Ident) {
        let marker = *self.next_marker;
        *self.next_marker += 1;
        self.references.push(Reference {
            marker,
            target: root.sym.to_string(),
            span: self.unit.span(root.span),
        });
    }
}

impl<'a> GraphBuilder<'a> {
    fn new(unit: &'a DeclarationUnit) -> Self {
        GraphBuilder {
            unit,
            nodes: Vec::new(),
            by_name: FxHashMap::default(),
            imports: Vec::new(),
            exports: Vec::new(),
            scopes: ScopeStack::new(),
            next_marker: 0,
        }
    }

    fn unsupported(&self, span: swc_common::Span, message: &str) -> TransformError {
        TransformError::unsupported(self.unit.span(span), message)
    }

    fn run(&mut self) -> Result<()> {
        let text = self.unit.text.as_str();
        let mut prev_end = 0;
        for item in &self.unit.module.body {
            let stmt = self.unit.span(item.span());
            let keyword_start = trivia::extend_over_modifiers(text, stmt.start_usize(), prev_end);
            let start = trivia::node_start(text, prev_end, keyword_start.max(prev_end));
            let end = trivia::extend_over_semicolon(text, stmt.end_usize()).max(start);
            let range = Span::from_offsets(start, end);

            let depth = self.scopes.depth();
            self.visit_item(item, range)?;
            debug_assert_eq!(self.scopes.depth(), depth, "unbalanced scopes after statement at {range}");
            prev_end = end.max(prev_end);
        }
        Ok(())
    }

    fn visit_item(&mut self, item: &ModuleItem, range: Span) -> Result<()> {
        match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => self.visit_decl(decl, item, range),
            ModuleItem::Stmt(Stmt::Empty(_)) => Ok(()),
            ModuleItem::Stmt(stmt) => Err(self.unsupported(stmt.span(), "top-level statement in a declaration file")),
            ModuleItem::ModuleDecl(decl) => match decl {
                ModuleDecl::ExportDecl(export) => {
                    let names = crate::walk::decl_names(&export.decl);
                    self.visit_decl(&export.decl, item, range)?;
                    for name in names {
                        self.exports.push(ExportEntry::Local {
                            exported: name.clone(),
                            local: name,
                        });
                    }
                    Ok(())
                }
                ModuleDecl::ExportDefaultDecl(export) => {
                    let (ident, kind) = match &export.decl {
                        DefaultDecl::Class(expr) => (expr.ident.as_ref(), DeclKind::Class),
                        DefaultDecl::Fn(expr) => (expr.ident.as_ref(), DeclKind::Function),
                        DefaultDecl::TsInterfaceDecl(iface) => (Some(&iface.id), DeclKind::Interface),
                    };
                    let Some(ident) = ident else {
                        return Err(self.unsupported(export.span, "anonymous default export"));
                    };
                    self.named_node(ident, kind, item, range)?;
                    self.exports.push(ExportEntry::Local {
                        exported: "default".to_string(),
                        local: ident.sym.to_string(),
                    });
                    Ok(())
                }
                ModuleDecl::ExportDefaultExpr(export) => match &*export.expr {
                    Expr::Ident(ident) => {
                        self.exports.push(ExportEntry::Local {
                            exported: "default".to_string(),
                            local: ident.sym.to_string(),
                        });
                        Ok(())
                    }
                    other => Err(self.unsupported(other.span(), "default export of a non-identifier expression")),
                },
                ModuleDecl::ExportNamed(export) => {
                    let source = export.src.as_ref().map(|src| src.value.to_string());
                    for specifier in &export.specifiers {
                        self.visit_export_specifier(specifier, source.as_deref())?;
                    }
                    Ok(())
                }
                ModuleDecl::ExportAll(export) => {
                    self.exports.push(ExportEntry::ReexportAll {
                        source: export.src.value.to_string(),
                    });
                    Ok(())
                }
                ModuleDecl::Import(import) => {
                    let source = import.src.value.to_string();
                    let span = self.unit.span(import.span);
                    for specifier in &import.specifiers {
                        let (local, imported) = match specifier {
                            ImportSpecifier::Named(named) => {
                                let imported = match &named.imported {
                                    Some(name) => export_name(name),
                                    None => named.local.sym.to_string(),
                                };
                                let imported = if imported == "default" {
                                    ImportedName::Default
                                } else {
                                    ImportedName::Named(imported)
                                };
                                (&named.local, imported)
                            }
                            ImportSpecifier::Default(default) => (&default.local, ImportedName::Default),
                            ImportSpecifier::Namespace(ns) => (&ns.local, ImportedName::Namespace),
                        };
                        self.imports.push(ImportBinding {
                            local: local.sym.to_string(),
                            imported,
                            source: source.clone(),
                            span,
                        });
                    }
                    if import.specifiers.is_empty() {
                        trace!(source = %source, "dropping side-effect import");
                    }
                    Ok(())
                }
                ModuleDecl::TsImportEquals(import) => self.visit_import_equals(import, item, range),
                ModuleDecl::TsNamespaceExport(_) => {
                    self.anonymous_node(item, range)?;
                    Ok(())
                }
                ModuleDecl::TsExportAssignment(assign) => {
                    Err(self.unsupported(assign.span, "`export =` in an ES module declaration file"))
                }
            },
        }
    }

    fn visit_decl(&mut self, decl: &Decl, item: &ModuleItem, range: Span) -> Result<()> {
        let (ident, kind) = match decl {
            Decl::Class(class) => (&class.ident, DeclKind::Class),
            Decl::Fn(func) => (&func.ident, DeclKind::Function),
            Decl::TsInterface(iface) => (&iface.id, DeclKind::Interface),
            Decl::TsTypeAlias(alias) => (&alias.id, DeclKind::Type),
            Decl::TsEnum(decl) => (&decl.id, DeclKind::Enum),
            Decl::TsModule(module) => match &module.id {
                TsModuleName::Ident(ident) if !module.global => (ident, DeclKind::Namespace),
                _ => {
                    self.anonymous_node(item, range)?;
                    return Ok(());
                }
            },
            Decl::Var(var) => match var.decls.as_slice() {
                [declarator] => match &declarator.name {
                    Pat::Ident(binding) => (&binding.id, DeclKind::Var),
                    other => return Err(self.unsupported(other.span(), "destructuring in variable declarations")),
                },
                _ => return Err(self.unsupported(var.span, "multi-name variable statement in canonical text")),
            },
            Decl::Using(using) => return Err(self.unsupported(using.span, "`using` declaration")),
        };
        self.named_node(ident, kind, item, range)
    }

    fn visit_import_equals(&mut self, import: &TsImportEqualsDecl, item: &ModuleItem, range: Span) -> Result<()> {
        match &import.module_ref {
            TsModuleRef::TsEntityName(_) => {
                self.named_node(&import.id, DeclKind::Namespace, item, range)?;
            }
            TsModuleRef::TsExternalModuleRef(module) => {
                self.imports.push(ImportBinding {
                    local: import.id.sym.to_string(),
                    imported: ImportedName::Require,
                    source: module.expr.value.to_string(),
                    span: self.unit.span(import.span),
                });
            }
        }
        if import.is_export {
            let name = import.id.sym.to_string();
            self.exports.push(ExportEntry::Local {
                exported: name.clone(),
                local: name,
            });
        }
        Ok(())
    }

    fn visit_export_specifier(&mut self, specifier: &ExportSpecifier, source: Option<&str>) -> Result<()> {
        match (specifier, source) {
            (ExportSpecifier::Named(named), None) => {
                let local = match &named.orig {
                    ModuleExportName::Ident(ident) => ident.sym.to_string(),
                    ModuleExportName::Str(s) => {
                        return Err(self.unsupported(s.span, "string export name without a module source"));
                    }
                };
                let exported = named.exported.as_ref().map_or_else(|| local.clone(), export_name);
                self.exports.push(ExportEntry::Local { exported, local });
            }
            (ExportSpecifier::Named(named), Some(source)) => {
                let orig = export_name(&named.orig);
                let exported = named.exported.as_ref().map_or_else(|| orig.clone(), export_name);
                let imported = if orig == "default" {
                    ImportedName::Default
                } else {
                    ImportedName::Named(orig)
                };
                self.exports.push(ExportEntry::Reexport {
                    exported,
                    imported,
                    source: source.to_string(),
                });
            }
            (ExportSpecifier::Namespace(ns), Some(source)) => {
                self.exports.push(ExportEntry::Reexport {
                    exported: export_name(&ns.name),
                    imported: ImportedName::Namespace,
                    source: source.to_string(),
                });
            }
            (ExportSpecifier::Default(default), Some(source)) => {
                self.exports.push(ExportEntry::Reexport {
                    exported: default.exported.sym.to_string(),
                    imported: ImportedName::Default,
                    source: source.to_string(),
                });
            }
            (other, None) => return Err(self.unsupported(other.span(), "re-export without a module source")),
        }
        Ok(())
    }

    /// Walk one statement and return its free references.
    fn collect_references(&mut self, item: &ModuleItem) -> Result<Vec<Reference>> {
        let mut collector = ReferenceCollector {
            unit: self.unit,
            scopes: &mut self.scopes,
            next_marker: &mut self.next_marker,
            references: Vec::new(),
        };
        Walker::new(self.unit, &mut collector).walk_module_item(item)?;
        Ok(collector.references)
    }

    fn named_node(&mut self, ident: &Ident, kind: DeclKind, item: &ModuleItem, range: Span) -> Result<()> {
        let name = ident.sym.to_string();
        let name_span = self.unit.span(ident.span);
        let mut references = self.collect_references(item)?;

        if let Some(&id) = self.by_name.get(&name) {
            let marker = self.next_marker;
            self.next_marker += 1;
            references.push(Reference {
                marker,
                target: name.clone(),
                span: name_span,
            });
            self.extend_node(id, kind, name_span, range, references);
            trace!(name = %name, "merged declaration into existing node");
            return Ok(());
        }

        let id = NodeId(self.nodes.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.nodes.push(GraphNode {
            id,
            kind: NodeKind::Named { name, decl_kind: kind },
            range,
            name_spans: smallvec![name_span],
            references,
        });
        Ok(())
    }

    fn extend_node(&mut self, id: NodeId, kind: DeclKind, name_span: Span, range: Span, references: Vec<Reference>) {
        let node = &mut self.nodes[id.index()];
        let old_end = node.range.end;
        let new_end = old_end.max(range.end);
        node.range.end = new_end;
        node.name_spans.push(name_span);
        node.references.extend(references);
        if let NodeKind::Named { decl_kind, .. } = &mut node.kind {
            if decl_kind.is_mergeable() && !kind.is_mergeable() {
                *decl_kind = kind;
            }
        }

        // Nodes that sat between the old and the new end now live inside this node.
        for other in &mut self.nodes {
            if other.id != id && other.range.start >= old_end && other.range.start < new_end {
                other.range = Span::new(new_end, other.range.end.max(new_end));
            }
        }
    }

    fn anonymous_node(&mut self, item: &ModuleItem, range: Span) -> Result<NodeId> {
        let references = self.collect_references(item)?;
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(GraphNode {
            id,
            kind: NodeKind::Anonymous,
            range,
            name_spans: smallvec![],
            references,
        });
        Ok(id)
    }
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(s) => s.value.to_string(),
    }
}
