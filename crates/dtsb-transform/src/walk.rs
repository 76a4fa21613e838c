//! Declaration walker.
//!
//! A recursive descent over the declaration shapes a `.d.ts` file can contain. The
//! walker itself keeps no state: it reports scopes, bindings, free-name roots and
//! inline imports to a [`DeclVisitor`]. Every `push_scope` is paired with exactly one
//! `pop_scope`, including on error paths.
//!
//! Anything outside the recognized shapes is reported as
//! [`TransformError::UnsupportedConstruct`].

use crate::error::{Result, TransformError};
use crate::frontend::DeclarationUnit;
use swc_common::Spanned;
use swc_ecma_ast::{
    Class, ClassMember, Decl, DefaultDecl, ExportSpecifier, Expr, Function, Ident, Key,
    MemberProp, ModuleDecl, ModuleExportName, ModuleItem, ObjectPatProp, ParamOrTsParamProp, Pat, PropName,
    Stmt, TsEntityName, TsEnumDecl, TsEnumMemberId, TsFnOrConstructorType, TsFnParam,
    TsImportType, TsInterfaceDecl, TsLit, TsModuleDecl, TsModuleRef, TsNamespaceBody,
    TsParamPropParam, TsType, TsTypeAnn, TsTypeElement, TsTypeParamDecl,
    TsTypeParamInstantiation, TsTypeQueryExpr, TsUnionOrIntersectionType, VarDecl,
};

/// Receives scope and reference events from a [`Walker`].
pub trait DeclVisitor {
    fn push_scope(&mut self) {}

    fn pop_scope(&mut self) {}

    /// A name introduced into the innermost scope.
    fn bind(&mut self, _name: &str) {}

    /// A name introduced `levels` scopes below the innermost one. `infer` uses this to
    /// bind into the scope of its conditional type.
    fn bind_outer(&mut self, _levels: usize, _name: &str) {}

    /// A parameter name. It shadows `typeof` roots only, never type references.
    fn bind_value(&mut self, _name: &str) {}

    /// The leftmost identifier of a type reference, heritage clause, computed key or
    /// export clause.
    fn reference(&mut self, _root: &Ident) {}

    /// The leftmost identifier of a `typeof` query.
    fn value_reference(&mut self, root: &Ident) {
        self.reference(root);
    }

    /// An inline `import("…")` type.
    fn import_type(&mut self, _import: &TsImportType) -> Result<()> {
        Ok(())
    }
}

pub struct Walker<'a, V> {
    unit: &'a DeclarationUnit,
    visitor: &'a mut V,
    depth: usize,
    /// Depths of the scopes opened by conditional types whose extends clause is
    /// being walked.
    infer_scopes: Vec<usize>,
}

impl<'a, V: DeclVisitor> Walker<'a, V> {
    pub fn new(unit: &'a DeclarationUnit, visitor: &'a mut V) -> Self {
        Walker {
            unit,
            visitor,
            depth: 0,
            infer_scopes: Vec::new(),
        }
    }

    fn unsupported(&self, span: swc_common::Span, message: &str) -> TransformError {
        TransformError::unsupported(self.unit.span(span), message)
    }

    fn in_scope<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.visitor.push_scope();
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        self.visitor.pop_scope();
        result
    }

    fn bind(&mut self, ident: &Ident) {
        self.visitor.bind(&ident.sym);
    }

    fn bind_param(&mut self, pat: &Pat) {
        match pat {
            Pat::Ident(binding) => self.visitor.bind_value(&binding.id.sym),
            Pat::Rest(rest) => self.bind_param(&rest.arg),
            Pat::Assign(assign) => self.bind_param(&assign.left),
            Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.bind_param(elem);
                }
            }
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => self.bind_param(&kv.value),
                        ObjectPatProp::Assign(assign) => self.visitor.bind_value(&assign.key.sym),
                        ObjectPatProp::Rest(rest) => self.bind_param(&rest.arg),
                    }
                }
            }
            Pat::Invalid(_) | Pat::Expr(_) => {}
        }
    }

    fn bind_fn_param(&mut self, param: &TsFnParam) {
        match param {
            TsFnParam::Ident(binding) => self.visitor.bind_value(&binding.id.sym),
            TsFnParam::Rest(rest) => self.bind_param(&rest.arg),
            TsFnParam::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.bind_param(elem);
                }
            }
            TsFnParam::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => self.bind_param(&kv.value),
                        ObjectPatProp::Assign(assign) => self.visitor.bind_value(&assign.key.sym),
                        ObjectPatProp::Rest(rest) => self.bind_param(&rest.arg),
                    }
                }
            }
        }
    }

    /// Parameters are bound before any of them is walked so `typeof` can name a
    /// sibling. The caller owns the scope.
    fn walk_fn_params(&mut self, params: &[TsFnParam]) -> Result<()> {
        for param in params {
            self.bind_fn_param(param);
        }
        for param in params {
            self.walk_fn_param(param)?;
        }
        Ok(())
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Walk a statement at the top level or inside a namespace body.
    pub fn walk_module_item(&mut self, item: &ModuleItem) -> Result<()> {
        match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => self.walk_decl(decl),
            ModuleItem::Stmt(Stmt::Empty(_)) => Ok(()),
            ModuleItem::Stmt(stmt) => {
                Err(self.unsupported(stmt.span(), "statement in a declaration context"))
            }
            ModuleItem::ModuleDecl(decl) => self.walk_module_decl(decl),
        }
    }

    fn walk_module_decl(&mut self, decl: &ModuleDecl) -> Result<()> {
        match decl {
            ModuleDecl::ExportDecl(export) => self.walk_decl(&export.decl),
            ModuleDecl::ExportDefaultDecl(export) => self.walk_default_decl(&export.decl),
            ModuleDecl::ExportDefaultExpr(export) => match expr_root(&export.expr) {
                Some(root) => {
                    self.visitor.reference(root);
                    Ok(())
                }
                None => Err(self.unsupported(export.span, "default export of a non-identifier expression")),
            },
            ModuleDecl::ExportNamed(export) => {
                for specifier in &export.specifiers {
                    match specifier {
                        ExportSpecifier::Namespace(ns) => {
                            return Err(self.unsupported(ns.span, "`export * as` re-export of a nested namespace"));
                        }
                        ExportSpecifier::Named(named) if export.src.is_none() => match &named.orig {
                            ModuleExportName::Ident(ident) => self.visitor.reference(ident),
                            ModuleExportName::Str(s) => {
                                return Err(self.unsupported(s.span, "string export name without a module source"));
                            }
                        },
                        _ => {}
                    }
                }
                Ok(())
            }
            ModuleDecl::TsImportEquals(import) => match &import.module_ref {
                TsModuleRef::TsEntityName(entity) => {
                    self.walk_entity(entity);
                    Ok(())
                }
                TsModuleRef::TsExternalModuleRef(_) => Ok(()),
            },
            ModuleDecl::TsExportAssignment(assign) => match expr_root(&assign.expr) {
                Some(root) => {
                    self.visitor.reference(root);
                    Ok(())
                }
                None => Err(self.unsupported(assign.span, "`export =` of a non-identifier expression")),
            },
            ModuleDecl::Import(_) | ModuleDecl::ExportAll(_) | ModuleDecl::TsNamespaceExport(_) => Ok(()),
        }
    }

    pub fn walk_decl(&mut self, decl: &Decl) -> Result<()> {
        match decl {
            Decl::Class(class) => self.walk_class(&class.class),
            Decl::Fn(func) => self.walk_function(&func.function),
            Decl::Var(var) => self.walk_var(var),
            Decl::TsInterface(iface) => self.walk_interface(iface),
            Decl::TsTypeAlias(alias) => self.in_scope(|w| {
                w.walk_type_params(alias.type_params.as_deref())?;
                w.walk_type(&alias.type_ann)
            }),
            Decl::TsEnum(decl) => self.walk_enum(decl),
            Decl::TsModule(module) => self.walk_ts_module(module),
            Decl::Using(using) => Err(self.unsupported(using.span, "`using` declaration")),
        }
    }

    pub fn walk_default_decl(&mut self, decl: &DefaultDecl) -> Result<()> {
        match decl {
            DefaultDecl::Class(class) => self.walk_class(&class.class),
            DefaultDecl::Fn(func) => self.walk_function(&func.function),
            DefaultDecl::TsInterfaceDecl(iface) => self.walk_interface(iface),
        }
    }

    fn walk_var(&mut self, var: &VarDecl) -> Result<()> {
        for declarator in &var.decls {
            match &declarator.name {
                Pat::Ident(binding) => self.walk_type_ann(binding.type_ann.as_deref())?,
                other => {
                    return Err(self.unsupported(other.span(), "destructuring in variable declarations"));
                }
            }
        }
        Ok(())
    }

    fn walk_interface(&mut self, iface: &TsInterfaceDecl) -> Result<()> {
        self.in_scope(|w| {
            w.walk_type_params(iface.type_params.as_deref())?;
            for heritage in &iface.extends {
                w.walk_heritage(&heritage.expr)?;
                w.walk_type_args(heritage.type_args.as_deref())?;
            }
            for element in &iface.body.body {
                w.walk_type_element(element)?;
            }
            Ok(())
        })
    }

    fn walk_enum(&mut self, decl: &TsEnumDecl) -> Result<()> {
        self.in_scope(|w| {
            for member in &decl.members {
                match &member.id {
                    TsEnumMemberId::Ident(ident) => w.bind(ident),
                    TsEnumMemberId::Str(s) => w.visitor.bind(&s.value),
                }
            }
            for member in &decl.members {
                if let Some(init) = &member.init {
                    w.walk_value_expr(init);
                }
            }
            Ok(())
        })
    }

    fn walk_ts_module(&mut self, module: &TsModuleDecl) -> Result<()> {
        match &module.body {
            Some(body) => self.walk_namespace_body(body),
            None => Ok(()),
        }
    }

    /// Namespace bodies hoist every member name before walking any member.
    fn walk_namespace_body(&mut self, body: &TsNamespaceBody) -> Result<()> {
        match body {
            TsNamespaceBody::TsModuleBlock(block) => self.in_scope(|w| {
                for item in &block.body {
                    for name in member_names(item) {
                        w.visitor.bind(&name);
                    }
                }
                for item in &block.body {
                    w.walk_module_item(item)?;
                }
                Ok(())
            }),
            TsNamespaceBody::TsNamespaceDecl(nested) => self.in_scope(|w| {
                w.bind(&nested.id);
                w.walk_namespace_body(&nested.body)
            }),
        }
    }

    // =========================================================================
    // Classes and functions
    // =========================================================================

    fn walk_class(&mut self, class: &Class) -> Result<()> {
        self.in_scope(|w| {
            w.walk_type_params(class.type_params.as_deref())?;
            if let Some(super_class) = &class.super_class {
                w.walk_heritage(super_class)?;
            }
            w.walk_type_args(class.super_type_params.as_deref())?;
            for heritage in &class.implements {
                w.walk_heritage(&heritage.expr)?;
                w.walk_type_args(heritage.type_args.as_deref())?;
            }
            for member in &class.body {
                w.walk_class_member(member)?;
            }
            Ok(())
        })
    }

    fn walk_class_member(&mut self, member: &ClassMember) -> Result<()> {
        match member {
            ClassMember::Constructor(ctor) => {
                self.walk_prop_name(&ctor.key)?;
                self.in_scope(|w| {
                    for param in &ctor.params {
                        match param {
                            ParamOrTsParamProp::Param(param) => w.bind_param(&param.pat),
                            ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                                TsParamPropParam::Ident(binding) => w.visitor.bind_value(&binding.id.sym),
                                TsParamPropParam::Assign(assign) => w.bind_param(&assign.left),
                            },
                        }
                    }
                    for param in &ctor.params {
                        match param {
                            ParamOrTsParamProp::Param(param) => w.walk_pat(&param.pat)?,
                            ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                                TsParamPropParam::Ident(binding) => {
                                    w.walk_type_ann(binding.type_ann.as_deref())?
                                }
                                TsParamPropParam::Assign(assign) => w.walk_pat(&assign.left)?,
                            },
                        }
                    }
                    Ok(())
                })
            }
            ClassMember::Method(method) => {
                self.walk_prop_name(&method.key)?;
                self.walk_function(&method.function)
            }
            ClassMember::PrivateMethod(method) => self.walk_function(&method.function),
            ClassMember::ClassProp(prop) => {
                self.walk_prop_name(&prop.key)?;
                self.walk_type_ann(prop.type_ann.as_deref())
            }
            ClassMember::PrivateProp(prop) => self.walk_type_ann(prop.type_ann.as_deref()),
            ClassMember::TsIndexSignature(sig) => {
                for param in &sig.params {
                    self.walk_fn_param(param)?;
                }
                self.walk_type_ann(sig.type_ann.as_deref())
            }
            ClassMember::AutoAccessor(accessor) => {
                if let Key::Public(key) = &accessor.key {
                    self.walk_prop_name(key)?;
                }
                self.walk_type_ann(accessor.type_ann.as_deref())
            }
            ClassMember::Empty(_) => Ok(()),
            ClassMember::StaticBlock(block) => {
                Err(self.unsupported(block.span, "static blocks in class declarations"))
            }
        }
    }

    fn walk_function(&mut self, function: &Function) -> Result<()> {
        self.in_scope(|w| {
            w.walk_type_params(function.type_params.as_deref())?;
            for param in &function.params {
                w.bind_param(&param.pat);
            }
            for param in &function.params {
                w.walk_pat(&param.pat)?;
            }
            w.walk_type_ann(function.return_type.as_deref())
        })
    }

    /// Bind every parameter name first so constraints can refer to later parameters.
    /// The caller owns the scope.
    fn walk_type_params(&mut self, params: Option<&TsTypeParamDecl>) -> Result<()> {
        let Some(params) = params else {
            return Ok(());
        };
        for param in &params.params {
            self.bind(&param.name);
        }
        for param in &params.params {
            if let Some(constraint) = &param.constraint {
                self.walk_type(constraint)?;
            }
            if let Some(default) = &param.default {
                self.walk_type(default)?;
            }
        }
        Ok(())
    }

    fn walk_pat(&mut self, pat: &Pat) -> Result<()> {
        match pat {
            Pat::Ident(binding) => self.walk_type_ann(binding.type_ann.as_deref()),
            Pat::Array(array) => self.walk_type_ann(array.type_ann.as_deref()),
            Pat::Object(object) => self.walk_type_ann(object.type_ann.as_deref()),
            Pat::Rest(rest) => {
                self.walk_type_ann(rest.type_ann.as_deref())?;
                self.walk_pat(&rest.arg)
            }
            Pat::Assign(assign) => self.walk_pat(&assign.left),
            Pat::Invalid(_) | Pat::Expr(_) => Err(self.unsupported(pat.span(), "parameter pattern")),
        }
    }

    fn walk_fn_param(&mut self, param: &TsFnParam) -> Result<()> {
        match param {
            TsFnParam::Ident(binding) => self.walk_type_ann(binding.type_ann.as_deref()),
            TsFnParam::Array(array) => self.walk_type_ann(array.type_ann.as_deref()),
            TsFnParam::Object(object) => self.walk_type_ann(object.type_ann.as_deref()),
            TsFnParam::Rest(rest) => {
                self.walk_type_ann(rest.type_ann.as_deref())?;
                self.walk_pat(&rest.arg)
            }
        }
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn walk_type_ann(&mut self, ann: Option<&TsTypeAnn>) -> Result<()> {
        match ann {
            Some(ann) => self.walk_type(&ann.type_ann),
            None => Ok(()),
        }
    }

    fn walk_type_args(&mut self, args: Option<&TsTypeParamInstantiation>) -> Result<()> {
        if let Some(args) = args {
            for ty in &args.params {
                self.walk_type(ty)?;
            }
        }
        Ok(())
    }

    pub fn walk_type(&mut self, ty: &TsType) -> Result<()> {
        match ty {
            TsType::TsKeywordType(_) | TsType::TsThisType(_) => Ok(()),
            TsType::TsFnOrConstructorType(TsFnOrConstructorType::TsFnType(func)) => self.in_scope(|w| {
                w.walk_type_params(func.type_params.as_deref())?;
                w.walk_fn_params(&func.params)?;
                w.walk_type(&func.type_ann.type_ann)
            }),
            TsType::TsFnOrConstructorType(TsFnOrConstructorType::TsConstructorType(ctor)) => {
                self.in_scope(|w| {
                    w.walk_type_params(ctor.type_params.as_deref())?;
                    w.walk_fn_params(&ctor.params)?;
                    w.walk_type(&ctor.type_ann.type_ann)
                })
            }
            TsType::TsTypeRef(reference) => {
                self.walk_entity(&reference.type_name);
                self.walk_type_args(reference.type_params.as_deref())
            }
            TsType::TsTypeQuery(query) => {
                match &query.expr_name {
                    TsTypeQueryExpr::TsEntityName(entity) => self.visitor.value_reference(entity_root(entity)),
                    TsTypeQueryExpr::Import(import) => self.walk_import_type(import)?,
                }
                self.walk_type_args(query.type_args.as_deref())
            }
            TsType::TsTypeLit(lit) => {
                for element in &lit.members {
                    self.walk_type_element(element)?;
                }
                Ok(())
            }
            TsType::TsArrayType(array) => self.walk_type(&array.elem_type),
            TsType::TsTupleType(tuple) => {
                for element in &tuple.elem_types {
                    self.walk_type(&element.ty)?;
                }
                Ok(())
            }
            TsType::TsOptionalType(opt) => self.walk_type(&opt.type_ann),
            TsType::TsRestType(rest) => self.walk_type(&rest.type_ann),
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsUnionType(union)) => {
                for ty in &union.types {
                    self.walk_type(ty)?;
                }
                Ok(())
            }
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsIntersectionType(inter)) => {
                for ty in &inter.types {
                    self.walk_type(ty)?;
                }
                Ok(())
            }
            // `infer` bindings are visible in the extends clause and the true branch only.
            TsType::TsConditionalType(cond) => {
                self.walk_type(&cond.check_type)?;
                self.in_scope(|w| {
                    w.infer_scopes.push(w.depth);
                    let extends = w.walk_type(&cond.extends_type);
                    w.infer_scopes.pop();
                    extends?;
                    w.walk_type(&cond.true_type)
                })?;
                self.walk_type(&cond.false_type)
            }
            TsType::TsInferType(infer) => {
                match self.infer_scopes.last() {
                    Some(&target) => self.visitor.bind_outer(self.depth - target, &infer.type_param.name.sym),
                    None => self.bind(&infer.type_param.name),
                }
                match &infer.type_param.constraint {
                    Some(constraint) => self.walk_type(constraint),
                    None => Ok(()),
                }
            }
            TsType::TsParenthesizedType(paren) => self.walk_type(&paren.type_ann),
            TsType::TsTypeOperator(op) => self.walk_type(&op.type_ann),
            TsType::TsIndexedAccessType(access) => {
                self.walk_type(&access.obj_type)?;
                self.walk_type(&access.index_type)
            }
            TsType::TsMappedType(mapped) => {
                if let Some(constraint) = &mapped.type_param.constraint {
                    self.walk_type(constraint)?;
                }
                self.in_scope(|w| {
                    w.bind(&mapped.type_param.name);
                    if let Some(name_type) = &mapped.name_type {
                        w.walk_type(name_type)?;
                    }
                    match &mapped.type_ann {
                        Some(ty) => w.walk_type(ty),
                        None => Ok(()),
                    }
                })
            }
            TsType::TsLitType(lit) => match &lit.lit {
                TsLit::Tpl(tpl) => {
                    for ty in &tpl.types {
                        self.walk_type(ty)?;
                    }
                    Ok(())
                }
                _ => Ok(()),
            },
            TsType::TsTypePredicate(pred) => self.walk_type_ann(pred.type_ann.as_deref()),
            TsType::TsImportType(import) => self.walk_import_type(import),
        }
    }

    fn walk_import_type(&mut self, import: &TsImportType) -> Result<()> {
        self.visitor.import_type(import)?;
        self.walk_type_args(import.type_args.as_deref())
    }

    fn walk_type_element(&mut self, element: &TsTypeElement) -> Result<()> {
        match element {
            TsTypeElement::TsCallSignatureDecl(sig) => self.in_scope(|w| {
                w.walk_type_params(sig.type_params.as_deref())?;
                w.walk_fn_params(&sig.params)?;
                w.walk_type_ann(sig.type_ann.as_deref())
            }),
            TsTypeElement::TsConstructSignatureDecl(sig) => self.in_scope(|w| {
                w.walk_type_params(sig.type_params.as_deref())?;
                w.walk_fn_params(&sig.params)?;
                w.walk_type_ann(sig.type_ann.as_deref())
            }),
            TsTypeElement::TsPropertySignature(prop) => {
                if prop.computed {
                    self.walk_computed_key(&prop.key)?;
                }
                self.walk_type_ann(prop.type_ann.as_deref())
            }
            TsTypeElement::TsGetterSignature(getter) => {
                if getter.computed {
                    self.walk_computed_key(&getter.key)?;
                }
                self.walk_type_ann(getter.type_ann.as_deref())
            }
            TsTypeElement::TsSetterSignature(setter) => {
                if setter.computed {
                    self.walk_computed_key(&setter.key)?;
                }
                self.walk_fn_param(&setter.param)
            }
            TsTypeElement::TsMethodSignature(method) => {
                if method.computed {
                    self.walk_computed_key(&method.key)?;
                }
                self.in_scope(|w| {
                    w.walk_type_params(method.type_params.as_deref())?;
                    w.walk_fn_params(&method.params)?;
                    w.walk_type_ann(method.type_ann.as_deref())
                })
            }
            TsTypeElement::TsIndexSignature(sig) => {
                for param in &sig.params {
                    self.walk_fn_param(param)?;
                }
                self.walk_type_ann(sig.type_ann.as_deref())
            }
        }
    }

    // =========================================================================
    // Names
    // =========================================================================

    fn walk_entity(&mut self, entity: &TsEntityName) {
        self.visitor.reference(entity_root(entity));
    }

    fn walk_heritage(&mut self, expr: &Expr) -> Result<()> {
        match expr_root(expr) {
            Some(root) => {
                self.visitor.reference(root);
                Ok(())
            }
            None => Err(self.unsupported(expr.span(), "heritage clause must be an identifier or property path")),
        }
    }

    fn walk_prop_name(&mut self, key: &PropName) -> Result<()> {
        match key {
            PropName::Computed(computed) => self.walk_computed_key(&computed.expr),
            _ => Ok(()),
        }
    }

    fn walk_computed_key(&mut self, expr: &Expr) -> Result<()> {
        if let Expr::Lit(_) = expr {
            return Ok(());
        }
        match expr_root(expr) {
            Some(root) => {
                self.visitor.reference(root);
                Ok(())
            }
            None => Err(self.unsupported(
                expr.span(),
                "computed member name must be a literal, identifier or property path",
            )),
        }
    }

    /// Enum initializers: references through identifiers and property paths.
    fn walk_value_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(_) | Expr::Member(_) => {
                if let Some(root) = expr_root(expr) {
                    self.visitor.reference(root);
                }
            }
            Expr::Unary(unary) => self.walk_value_expr(&unary.arg),
            Expr::Bin(bin) => {
                self.walk_value_expr(&bin.left);
                self.walk_value_expr(&bin.right);
            }
            Expr::Paren(paren) => self.walk_value_expr(&paren.expr),
            _ => {}
        }
    }
}

/// Leftmost identifier of `A.B.C`.
pub fn entity_root(entity: &TsEntityName) -> &Ident {
    match entity {
        TsEntityName::Ident(ident) => ident,
        TsEntityName::TsQualifiedName(qualified) => entity_root(&qualified.left),
    }
}

/// Leftmost identifier of an identifier or dotted property path expression.
pub fn expr_root(expr: &Expr) -> Option<&Ident> {
    match expr {
        Expr::Ident(ident) => Some(ident),
        Expr::Member(member) => match &member.prop {
            MemberProp::Ident(_) => expr_root(&member.obj),
            _ => None,
        },
        _ => None,
    }
}

/// Names a namespace member introduces into the namespace scope.
pub fn member_names(item: &ModuleItem) -> Vec<String> {
    match item {
        ModuleItem::Stmt(Stmt::Decl(decl)) => decl_names(decl),
        ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => decl_names(&export.decl),
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => match &export.decl {
            DefaultDecl::Class(class) => class.ident.iter().map(|i| i.sym.to_string()).collect(),
            DefaultDecl::Fn(func) => func.ident.iter().map(|i| i.sym.to_string()).collect(),
            DefaultDecl::TsInterfaceDecl(iface) => vec![iface.id.sym.to_string()],
        },
        ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => import
            .specifiers
            .iter()
            .map(|specifier| match specifier {
                swc_ecma_ast::ImportSpecifier::Named(named) => named.local.sym.to_string(),
                swc_ecma_ast::ImportSpecifier::Default(default) => default.local.sym.to_string(),
                swc_ecma_ast::ImportSpecifier::Namespace(ns) => ns.local.sym.to_string(),
            })
            .collect(),
        ModuleItem::ModuleDecl(ModuleDecl::TsImportEquals(import)) => vec![import.id.sym.to_string()],
        _ => Vec::new(),
    }
}

/// Names declared by a declaration. Variable statements may declare several.
pub fn decl_names(decl: &Decl) -> Vec<String> {
    match decl {
        Decl::Class(class) => vec![class.ident.sym.to_string()],
        Decl::Fn(func) => vec![func.ident.sym.to_string()],
        Decl::Var(var) => var
            .decls
            .iter()
            .filter_map(|d| match &d.name {
                Pat::Ident(binding) => Some(binding.id.sym.to_string()),
                _ => None,
            })
            .collect(),
        Decl::TsInterface(iface) => vec![iface.id.sym.to_string()],
        Decl::TsTypeAlias(alias) => vec![alias.id.sym.to_string()],
        Decl::TsEnum(decl) => vec![decl.id.sym.to_string()],
        Decl::TsModule(module) => match &module.id {
            swc_ecma_ast::TsModuleName::Ident(ident) if !module.global => vec![ident.sym.to_string()],
            _ => Vec::new(),
        },
        Decl::Using(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse;

    #[derive(Default)]
    struct Recorder {
        depth: usize,
        max_depth: usize,
        bound: Vec<Vec<String>>,
        values: Vec<Vec<String>>,
        free: Vec<String>,
        imports: Vec<String>,
    }

    impl DeclVisitor for Recorder {
        fn push_scope(&mut self) {
            self.depth += 1;
            self.max_depth = self.max_depth.max(self.depth);
            self.bound.push(Vec::new());
            self.values.push(Vec::new());
        }

        fn pop_scope(&mut self) {
            self.depth -= 1;
            self.bound.pop();
            self.values.pop();
        }

        fn bind(&mut self, name: &str) {
            if let Some(top) = self.bound.last_mut() {
                top.push(name.to_string());
            }
        }

        fn bind_outer(&mut self, levels: usize, name: &str) {
            let index = self.bound.len() - 1 - levels;
            self.bound[index].push(name.to_string());
        }

        fn bind_value(&mut self, name: &str) {
            if let Some(top) = self.values.last_mut() {
                top.push(name.to_string());
            }
        }

        fn reference(&mut self, root: &Ident) {
            let name = root.sym.to_string();
            if !self.bound.iter().any(|scope| scope.contains(&name)) {
                self.free.push(name);
            }
        }

        fn value_reference(&mut self, root: &Ident) {
            let name = root.sym.to_string();
            if !self.values.iter().any(|scope| scope.contains(&name)) {
                self.reference(root);
            }
        }

        fn import_type(&mut self, import: &TsImportType) -> Result<()> {
            self.imports.push(import.arg.value.to_string());
            Ok(())
        }
    }

    fn walk(text: &str) -> Result<Recorder> {
        let unit = parse("test.d.ts", text.to_string())?;
        let mut recorder = Recorder::default();
        for item in &unit.module.body {
            Walker::new(&unit, &mut recorder).walk_module_item(item)?;
            assert_eq!(recorder.depth, 0);
        }
        Ok(recorder)
    }

    #[test]
    fn test_type_parameters_are_not_free() {
        let rec = walk("declare function f<T>(x: T, y: Other): T;").unwrap();
        assert_eq!(rec.free, vec!["Other"]);
    }

    #[test]
    fn test_conditional_infer_scoping() {
        let rec = walk("type A<T> = T extends Promise<infer U> ? U : Fallback;").unwrap();
        assert_eq!(rec.free, vec!["Promise", "Fallback"]);
    }

    #[test]
    fn test_infer_in_nested_signatures_reaches_true_branch() {
        let rec = walk(
            "type A<T> = T extends (...args: any) => infer R ? R : never;\n\
             type B<T> = T extends { m(x: infer P): void } ? P : Other;\n\
             type C<T> = T extends (a: infer X) => infer Y ? [X, Y] : X;",
        )
        .unwrap();
        assert_eq!(rec.free, vec!["Other", "X"]);
    }

    #[test]
    fn test_nested_conditional_keeps_its_own_infer() {
        let rec = walk("type A<T> = T extends (x: T extends Box<infer U> ? U : never) => infer V ? V : U;").unwrap();
        assert_eq!(rec.free, vec!["Box", "U"]);
    }

    #[test]
    fn test_typeof_parameter_is_bound() {
        let rec = walk("declare function f(x: string, y: typeof x): typeof x | typeof z;").unwrap();
        assert_eq!(rec.free, vec!["z"]);
    }

    #[test]
    fn test_constructor_parameters_are_bound() {
        let rec = walk("declare class K { constructor(a: string, b: typeof a); m(c: C): typeof c; }").unwrap();
        assert_eq!(rec.free, vec!["C"]);
    }

    #[test]
    fn test_mapped_type_key_is_bound() {
        let rec = walk("type M<T> = { [K in keyof T as Rename<K>]: Wrap<T[K]> };").unwrap();
        assert_eq!(rec.free, vec!["Rename", "Wrap"]);
    }

    #[test]
    fn test_namespace_members_are_hoisted() {
        let rec = walk("declare namespace N { const a: B; interface B { c: C } }").unwrap();
        assert_eq!(rec.free, vec!["C"]);
    }

    #[test]
    fn test_heritage_and_qualified_names_report_roots() {
        let rec = walk("declare class A extends ns.Base<X> implements I { m(): lib.Type; }").unwrap();
        assert_eq!(rec.free, vec!["ns", "X", "I", "lib"]);
    }

    #[test]
    fn test_inline_imports_are_reported() {
        let rec = walk("type A = import(\"./a\").B<typeof import(\"./c\")>;").unwrap();
        assert_eq!(rec.imports, vec!["./a", "./c"]);
    }

    #[test]
    fn test_static_block_is_unsupported() {
        let err = walk("declare class A { static { } }");
        // The parser may already reject static blocks in ambient classes.
        assert!(err.is_err());
    }

    #[test]
    fn test_destructuring_var_is_unsupported() {
        // Rejected either by the parser or by the walker, never accepted.
        assert!(walk("declare const { a }: { a: string };").is_err());
    }

    #[test]
    fn test_enum_members_are_bound() {
        let rec = walk("declare enum E { A = 1, B = A, C = Other.x }").unwrap();
        assert_eq!(rec.free, vec!["Other"]);
    }

    #[test]
    fn test_computed_keys() {
        let rec = walk("interface I { [Symbol.iterator](): Iter; [\"lit\"]: string }").unwrap();
        assert_eq!(rec.free, vec!["Symbol", "Iter"]);
    }
}
