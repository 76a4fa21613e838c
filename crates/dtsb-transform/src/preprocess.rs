//! Preprocessor: rewrites one declaration unit into canonical ambient form.
//!
//! Pass 1 walks the top-level statements once: it deletes empty statements, records
//! every declared name, strips `export`/`default`, ensures `declare`, and splits
//! multi-name variable statements. Pass 2 needs the complete name set: it rewrites
//! inline `import("…")` types into synthesized namespace imports, names anonymous
//! default exports, and moves earlier declarations of a repeated name next to the
//! last one. Finalization appends the export statements, prepends the synthesized
//! imports and strips `/// <reference … />` directives.
//!
//! All edits go through an [`EditBuffer`] addressed by offsets in the original text.

use crate::buffer::EditBuffer;
use crate::error::{Result, TransformError};
use crate::frontend::DeclarationUnit;
use crate::graph::{DeclKind, NamedEntry, ReferenceDirectives};
use crate::trivia::{self, Modifiers, ModifierScan};
use crate::walk::{DeclVisitor, Walker, entity_root};
use dtsb_common::Span;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use swc_common::Spanned;
use swc_ecma_ast::{
    Decl, DefaultDecl, ExportDefaultDecl, Expr, ImportSpecifier, ModuleDecl, ModuleItem, Pat, Stmt,
    TsEntityName, TsImportEqualsDecl, TsImportType, TsModuleName, TsModuleRef, TsTypeParamDecl,
    VarDecl, VarDeclKind,
};
use tracing::{debug, trace};

/// The canonical text of a unit plus what was learned while producing it.
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    pub code: String,
    /// Declared top-level names in declaration order.
    pub names: IndexMap<String, NamedEntry>,
    pub references: ReferenceDirectives,
}

/// Run both passes and finalization over a parsed unit.
pub fn preprocess(unit: &DeclarationUnit) -> Result<PreprocessOutput> {
    let mut pre = Preprocessor::new(unit);
    pre.first_pass()?;
    pre.second_pass()?;
    pre.finish()
}

enum DefaultExport {
    /// Re-emitted as a trailing `export default name;`.
    Declaration(String),
    /// An `export default name;` statement that stays where it is.
    Statement,
}

struct AnonymousDefault {
    keyword_end: usize,
    kind: DeclKind,
    generic_arity: usize,
    range: Span,
}

struct Preprocessor<'a> {
    unit: &'a DeclarationUnit,
    text: &'a str,
    buf: EditBuffer<'a>,
    names: IndexMap<String, NamedEntry>,
    ranges: IndexMap<String, SmallVec<[Span; 2]>>,
    exported: IndexSet<String>,
    default_export: Option<DefaultExport>,
    anonymous_default: Option<AnonymousDefault>,
    /// Every top-level binding name, declared or synthesized.
    taken: FxHashSet<String>,
    /// Module specifier -> synthesized namespace import name.
    inline_imports: IndexMap<String, String>,
}

impl<'a> Preprocessor<'a> {
    fn new(unit: &'a DeclarationUnit) -> Self {
        Preprocessor {
            unit,
            text: &unit.text,
            buf: EditBuffer::new(&unit.text),
            names: IndexMap::new(),
            ranges: IndexMap::new(),
            exported: IndexSet::new(),
            default_export: None,
            anonymous_default: None,
            taken: FxHashSet::default(),
            inline_imports: IndexMap::new(),
        }
    }

    fn unsupported(&self, span: swc_common::Span, message: &str) -> TransformError {
        TransformError::unsupported(self.unit.span(span), message)
    }

    // =========================================================================
    // Pass 1
    // =========================================================================

    fn first_pass(&mut self) -> Result<()> {
        let mut prev_end = 0;
        for item in &self.unit.module.body {
            let stmt = self.unit.span(item.span());
            if let ModuleItem::Stmt(Stmt::Empty(_)) = item {
                self.buf.remove(stmt.start_usize(), stmt.end_usize())?;
                prev_end = prev_end.max(stmt.end_usize());
                continue;
            }
            let start = trivia::extend_over_modifiers(self.text, stmt.start_usize(), prev_end).max(prev_end);
            let end = trivia::extend_over_semicolon(self.text, stmt.end_usize()).max(start);
            self.visit_item(item, start, Span::from_offsets(prev_end, end))?;
            prev_end = end;
        }
        trace!(
            file = %self.unit.file_name,
            names = self.names.len(),
            exported = self.exported.len(),
            "preprocess pass 1 done"
        );
        Ok(())
    }

    /// `start` is the first modifier of the statement; `full` runs from the end of the
    /// previous statement to the end of this one.
    fn visit_item(&mut self, item: &ModuleItem, start: usize, full: Span) -> Result<()> {
        match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => self.visit_decl(decl, start, full, false),
            ModuleItem::Stmt(stmt) => Err(self.unsupported(stmt.span(), "top-level statement in a declaration file")),
            ModuleItem::ModuleDecl(decl) => match decl {
                ModuleDecl::ExportDecl(export) => self.visit_decl(&export.decl, start, full, true),
                ModuleDecl::ExportDefaultDecl(export) => self.visit_default_decl(export, start, full),
                ModuleDecl::ExportDefaultExpr(export) => match &*export.expr {
                    Expr::Ident(_) => self.set_default(DefaultExport::Statement, export.span),
                    other => Err(self.unsupported(other.span(), "default export of a non-identifier expression")),
                },
                ModuleDecl::TsExportAssignment(assign) => {
                    Err(self.unsupported(assign.span, "`export =` in an ES module declaration file"))
                }
                ModuleDecl::Import(import) => {
                    for specifier in &import.specifiers {
                        let local = match specifier {
                            ImportSpecifier::Named(named) => &named.local,
                            ImportSpecifier::Default(default) => &default.local,
                            ImportSpecifier::Namespace(ns) => &ns.local,
                        };
                        self.taken.insert(local.sym.to_string());
                    }
                    Ok(())
                }
                ModuleDecl::TsImportEquals(import) => self.visit_import_equals(import, start, full),
                ModuleDecl::ExportNamed(_) | ModuleDecl::ExportAll(_) | ModuleDecl::TsNamespaceExport(_) => Ok(()),
            },
        }
    }

    fn visit_decl(&mut self, decl: &Decl, start: usize, full: Span, exported: bool) -> Result<()> {
        let (ident, kind, arity) = match decl {
            Decl::Class(class) => (&class.ident, DeclKind::Class, type_arity(class.class.type_params.as_deref())),
            Decl::Fn(func) => (
                &func.ident,
                DeclKind::Function,
                type_arity(func.function.type_params.as_deref()),
            ),
            Decl::TsInterface(iface) => (&iface.id, DeclKind::Interface, type_arity(iface.type_params.as_deref())),
            Decl::TsTypeAlias(alias) => (&alias.id, DeclKind::Type, type_arity(alias.type_params.as_deref())),
            Decl::TsEnum(decl) => (&decl.id, DeclKind::Enum, 0),
            Decl::TsModule(module) => match &module.id {
                TsModuleName::Ident(id) if !module.global => (id, DeclKind::Namespace, 0),
                // `declare global` and `declare module "x"` contribute no name.
                _ => {
                    self.fix_modifiers(start, true)?;
                    return Ok(());
                }
            },
            Decl::Var(var) => return self.visit_var(var, start, full, exported),
            Decl::Using(using) => return Err(self.unsupported(using.span, "`using` declaration")),
        };
        let needs_declare = !matches!(kind, DeclKind::Interface | DeclKind::Type);
        self.fix_modifiers(start, needs_declare)?;
        self.record(ident.sym.to_string(), kind, arity, full, exported);
        Ok(())
    }

    fn visit_default_decl(&mut self, export: &ExportDefaultDecl, start: usize, full: Span) -> Result<()> {
        let (ident, kind, arity) = match &export.decl {
            DefaultDecl::Class(expr) => (
                expr.ident.as_ref(),
                DeclKind::Class,
                type_arity(expr.class.type_params.as_deref()),
            ),
            DefaultDecl::Fn(expr) => (
                expr.ident.as_ref(),
                DeclKind::Function,
                type_arity(expr.function.type_params.as_deref()),
            ),
            DefaultDecl::TsInterfaceDecl(iface) => (
                Some(&iface.id),
                DeclKind::Interface,
                type_arity(iface.type_params.as_deref()),
            ),
        };
        if self.default_export.is_some() || self.anonymous_default.is_some() {
            return Err(self.unsupported(export.span, "second default export in one file"));
        }
        let scan = self.fix_modifiers(start, kind != DeclKind::Interface)?;
        match ident {
            Some(ident) => {
                let name = ident.sym.to_string();
                self.record(name.clone(), kind, arity, full, false);
                self.default_export = Some(DefaultExport::Declaration(name));
            }
            None => {
                let keyword_end = self.keyword_end(scan.rest, export.span)?;
                self.anonymous_default = Some(AnonymousDefault {
                    keyword_end,
                    kind,
                    generic_arity: arity,
                    range: full,
                });
            }
        }
        Ok(())
    }

    fn visit_import_equals(&mut self, import: &TsImportEqualsDecl, start: usize, full: Span) -> Result<()> {
        let name = import.id.sym.to_string();
        match &import.module_ref {
            TsModuleRef::TsEntityName(_) => {
                if import.is_export {
                    self.fix_modifiers(start, false)?;
                }
                self.record(name, DeclKind::Namespace, 0, full, import.is_export);
            }
            TsModuleRef::TsExternalModuleRef(_) => {
                self.taken.insert(name);
            }
        }
        Ok(())
    }

    /// Split `declare const a: A, b: B;` into one statement per name.
    fn visit_var(&mut self, var: &VarDecl, start: usize, full: Span, exported: bool) -> Result<()> {
        let mut declarators = Vec::with_capacity(var.decls.len());
        for declarator in &var.decls {
            match &declarator.name {
                Pat::Ident(binding) => {
                    declarators.push((binding.id.sym.to_string(), self.unit.span(declarator.span)));
                }
                other => {
                    return Err(self.unsupported(other.span(), "destructuring in variable declarations"));
                }
            }
        }

        let Some(((first_name, first), rest)) = declarators.split_first() else {
            return Err(self.unsupported(var.span, "variable statement without declarators"));
        };
        if rest.is_empty() {
            self.fix_modifiers(start, true)?;
            self.record(first_name.clone(), DeclKind::Var, 0, full, exported);
            return Ok(());
        }

        let keyword = match var.kind {
            VarDeclKind::Var => "var",
            VarDeclKind::Let => "let",
            VarDeclKind::Const => "const",
        };
        self.buf.overwrite(start, first.start_usize(), &format!("declare {keyword} "))?;
        for pair in declarators.windows(2) {
            let (prev, next) = (pair[0].1, pair[1].1);
            self.buf.append_left(prev.end_usize(), ";")?;
            self.buf
                .overwrite(prev.end_usize(), next.start_usize(), &format!("\ndeclare {keyword} "))?;
        }
        let last = declarators[declarators.len() - 1].1;
        if !self.text[last.end_usize()..full.end_usize()].contains(';') {
            self.buf.append_left(last.end_usize(), ";")?;
        }

        // Each name owns the separator before it; the last one also owns the tail.
        let mut range_start = full.start;
        let count = declarators.len();
        for (i, (name, span)) in declarators.iter().enumerate() {
            let range_end = if i + 1 == count { full.end } else { span.end };
            self.record(name.clone(), DeclKind::Var, 0, Span::new(range_start, range_end), exported);
            range_start = span.end;
        }
        trace!(names = count, "split multi-name variable statement");
        Ok(())
    }

    /// Remove `export`/`default` and add `declare` where the declaration needs it.
    fn fix_modifiers(&mut self, start: usize, needs_declare: bool) -> Result<ModifierScan> {
        let scan = trivia::scan_modifiers(self.text, start);
        if let Some(span) = scan.export {
            self.buf.remove(span.start_usize(), span.end_usize())?;
        }
        if let Some(span) = scan.default {
            self.buf.remove(span.start_usize(), span.end_usize())?;
        }
        if needs_declare && !scan.flags.contains(Modifiers::DECLARE) {
            self.buf.append_right(scan.rest, "declare ")?;
        }
        Ok(scan)
    }

    /// End of the `class`/`function` keyword of an anonymous default export.
    fn keyword_end(&self, mut pos: usize, stmt: swc_common::Span) -> Result<usize> {
        loop {
            let word = trivia::word_at(self.text, pos);
            match word {
                "abstract" | "async" => pos = trivia::skip_whitespace(self.text, pos + word.len()),
                "class" | "function" => return Ok(pos + word.len()),
                _ => return Err(self.unsupported(stmt, "anonymous default export")),
            }
        }
    }

    fn set_default(&mut self, default: DefaultExport, span: swc_common::Span) -> Result<()> {
        if self.default_export.is_some() || self.anonymous_default.is_some() {
            return Err(self.unsupported(span, "second default export in one file"));
        }
        self.default_export = Some(default);
        Ok(())
    }

    fn record(&mut self, name: String, kind: DeclKind, generic_arity: usize, range: Span, exported: bool) {
        self.taken.insert(name.clone());
        match self.names.get_mut(&name) {
            Some(entry) => {
                if kind != DeclKind::Namespace {
                    entry.kind = kind;
                }
                entry.generic_arity = entry.generic_arity.max(generic_arity);
            }
            None => {
                self.names.insert(
                    name.clone(),
                    NamedEntry {
                        name: name.clone(),
                        kind,
                        generic_arity,
                    },
                );
            }
        }

        let ranges = self.ranges.entry(name.clone()).or_default();
        match ranges.last_mut() {
            Some(last) if last.end == range.start => last.end = range.end,
            _ => ranges.push(range),
        }
        if exported {
            self.exported.insert(name);
        }
    }

    // =========================================================================
    // Pass 2
    // =========================================================================

    fn second_pass(&mut self) -> Result<()> {
        let mut collector = InlineImportCollector {
            unit: self.unit,
            found: Vec::new(),
        };
        for item in &self.unit.module.body {
            let is_declaration = matches!(
                item,
                ModuleItem::Stmt(Stmt::Decl(_))
                    | ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(_) | ModuleDecl::ExportDefaultDecl(_))
            );
            if is_declaration {
                Walker::new(self.unit, &mut collector).walk_module_item(item)?;
            }
        }
        for import in collector.found {
            let name = self.import_name(&import.specifier);
            let replacement = match &import.qualifier {
                Some(qualifier) => format!("{name}.{qualifier}"),
                None => name,
            };
            self.buf.overwrite(import.start, import.end, &replacement)?;
        }

        if let Some(anonymous) = self.anonymous_default.take() {
            let name = self.unique_name("_default");
            self.buf.append_left(anonymous.keyword_end, &format!(" {name}"))?;
            self.record(name.clone(), anonymous.kind, anonymous.generic_arity, anonymous.range, false);
            self.default_export = Some(DefaultExport::Declaration(name));
        }

        for (name, ranges) in &self.ranges {
            let Some((last, earlier)) = ranges.split_last() else {
                continue;
            };
            for range in earlier {
                // A range that starts the file has no line break of its own.
                if !self.text[range.start_usize()..].starts_with(['\n', '\r']) {
                    self.buf.prepend_right(range.start_usize(), "\n")?;
                }
                self.buf
                    .move_range(range.start_usize(), range.end_usize(), last.start_usize())?;
            }
            if !earlier.is_empty() {
                trace!(name = %name, parts = ranges.len(), "grouped repeated declarations");
            }
        }
        Ok(())
    }

    fn import_name(&mut self, specifier: &str) -> String {
        if let Some(name) = self.inline_imports.get(specifier) {
            return name.clone();
        }
        let name = self.unique_name(&trivia::identifier_from_specifier(specifier));
        self.inline_imports.insert(specifier.to_string(), name.clone());
        name
    }

    fn unique_name(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        while self.taken.contains(&name) {
            name.insert(0, '_');
        }
        self.taken.insert(name.clone());
        name
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    fn finish(mut self) -> Result<PreprocessOutput> {
        if let Some(DefaultExport::Declaration(name)) = &self.default_export {
            self.buf.append(&format!("\nexport default {name};\n"));
        }
        if !self.exported.is_empty() {
            let list: Vec<&str> = self.exported.iter().map(String::as_str).collect();
            self.buf.append(&format!("\nexport {{ {} }};\n", list.join(", ")));
        }
        let imports: String = self
            .inline_imports
            .iter()
            .map(|(specifier, name)| format!("import * as {name} from \"{specifier}\";\n"))
            .collect();
        self.buf.prepend(&imports);
        let references = self.strip_reference_directives()?;

        let code = self.buf.finish();
        debug!(
            file = %self.unit.file_name,
            names = self.names.len(),
            inline_imports = self.inline_imports.len(),
            "preprocessed declaration unit"
        );
        Ok(PreprocessOutput {
            code,
            names: self.names,
            references,
        })
    }

    /// Remove `/// <reference … />` lines before the first statement, with their newline.
    fn strip_reference_directives(&mut self) -> Result<ReferenceDirectives> {
        let limit = self
            .unit
            .module
            .body
            .first()
            .map(|item| self.unit.span(item.span()).start_usize())
            .unwrap_or(self.text.len());
        let mut references = ReferenceDirectives::default();
        let mut line_start = 0;
        while line_start < limit {
            let line_end = trivia::line_end(self.text, line_start);
            if let Some((kind, target)) = parse_reference_directive(&self.text[line_start..line_end]) {
                self.buf.remove(line_start, (line_end + 1).min(self.text.len()))?;
                let set = match kind {
                    DirectiveKind::Types => &mut references.types,
                    DirectiveKind::Path => &mut references.paths,
                    DirectiveKind::Lib => &mut references.libs,
                };
                set.insert(target);
            }
            line_start = line_end + 1;
        }
        Ok(references)
    }
}

fn type_arity(params: Option<&TsTypeParamDecl>) -> usize {
    params.map_or(0, |params| params.params.len())
}

struct InlineImport {
    start: usize,
    /// End of the qualifier, or of the closing `)` when there is none.
    end: usize,
    specifier: String,
    qualifier: Option<String>,
}

struct InlineImportCollector<'a> {
    unit: &'a DeclarationUnit,
    found: Vec<InlineImport>,
}

impl DeclVisitor for InlineImportCollector<'_> {
    fn import_type(&mut self, import: &TsImportType) -> Result<()> {
        let span = self.unit.span(import.span);
        let specifier = import.arg.value.to_string();
        if specifier.trim().is_empty() {
            return Err(TransformError::MalformedInlineImport {
                span,
                message: "empty module specifier".to_string(),
            });
        }
        let (end, qualifier) = match &import.qualifier {
            Some(qualifier) => {
                let root = self.unit.span(entity_root(qualifier).span);
                let last = self.unit.span(entity_last_span(qualifier));
                let text = Span::new(root.start, last.end);
                (last.end_usize(), Some(self.unit.slice(text).to_string()))
            }
            None => {
                let arg_end = self.unit.span(import.arg.span).end_usize();
                let close = self.unit.text[arg_end..]
                    .find(')')
                    .map(|i| arg_end + i + 1)
                    .ok_or_else(|| TransformError::MalformedInlineImport {
                        span,
                        message: "missing `)` after module specifier".to_string(),
                    })?;
                (close, None)
            }
        };
        self.found.push(InlineImport {
            start: span.start_usize(),
            end,
            specifier,
            qualifier,
        });
        Ok(())
    }
}

fn entity_last_span(entity: &TsEntityName) -> swc_common::Span {
    match entity {
        TsEntityName::Ident(ident) => ident.span,
        TsEntityName::TsQualifiedName(qualified) => qualified.right.span,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DirectiveKind {
    Types,
    Path,
    Lib,
}

fn parse_reference_directive(line: &str) -> Option<(DirectiveKind, String)> {
    let rest = line.trim().strip_prefix("///")?.trim_start();
    let rest = rest.strip_prefix("<reference")?;
    [
        ("types", DirectiveKind::Types),
        ("path", DirectiveKind::Path),
        ("lib", DirectiveKind::Lib),
    ]
    .into_iter()
    .find_map(|(attr, kind)| attribute_value(rest, attr).map(|value| (kind, value)))
}

fn attribute_value(tag: &str, attr: &str) -> Option<String> {
    let needle = format!("{attr}=");
    let mut search = 0;
    while let Some(found) = tag[search..].find(&needle) {
        let at = search + found;
        let preceded_by_space = tag[..at].ends_with(|c: char| c.is_whitespace());
        let value_start = at + needle.len();
        if preceded_by_space {
            let quote = tag[value_start..].chars().next()?;
            if quote == '"' || quote == '\'' {
                let body = &tag[value_start + 1..];
                let close = body.find(quote)?;
                return Some(body[..close].to_string());
            }
        }
        search = value_start;
    }
    None
}
