//! Rust parser using syn for AST-based extraction.
//!
//! Extracts:
//! - Structs, enums and traits as class-like entities
//! - Free functions, inherent and trait-impl methods, trait default methods
//! - Inline modules (items qualified by the module name)
//! - `use` declarations and `//!` module docs
//! - Call sites (plain calls and method calls) within bodies

use std::collections::BTreeSet;

use proc_macro2::Span;
use syn::{
    spanned::Spanned, visit::Visit, Attribute, FnArg, ImplItem, Item, ItemEnum, ItemFn, ItemImpl,
    ItemMod, ItemStruct, ItemTrait, Pat, ReturnType, Signature, TraitItem, Type,
};

use super::result::ParseResult;
use super::traits::Parser;
use crate::knowledge::ontology::{ClassEntity, ClassKind, FunctionEntity, Language, Parameter};

/// Rust parser using syn for AST-based extraction.
pub struct RustParser;

impl RustParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for RustParser {
    fn parse_file(&self, path: &str, content: &str) -> Result<ParseResult, String> {
        let syntax = syn::parse_file(content).map_err(|e| {
            format!("syntax error near line {}: {}", e.span().start().line, e)
        })?;

        let mut visitor = RustVisitor::new(path);
        visitor.result.module_doc = doc_comment(&syntax.attrs);
        for item in &syntax.items {
            visitor.process_item(item);
        }
        visitor.finish();

        Ok(visitor.result)
    }

    fn language(&self) -> Language {
        Language::Rust
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &["rs"]
    }
}

/// Walks items and records entities.
struct RustVisitor {
    result: ParseResult,
    /// Enclosing inline modules.
    modules: Vec<String>,
    /// `(type, trait)` pairs from trait impls, applied as bases at the end.
    impl_traits: Vec<(String, String)>,
}

impl RustVisitor {
    fn new(path: &str) -> Self {
        Self {
            result: ParseResult::new(path, Language::Rust),
            modules: Vec::new(),
            impl_traits: Vec::new(),
        }
    }

    fn qualify(&self, name: &str) -> String {
        if self.modules.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.modules.join("."), name)
        }
    }

    fn process_item(&mut self, item: &Item) {
        match item {
            Item::Fn(f) => self.process_fn(f),
            Item::Struct(s) => self.process_struct(s),
            Item::Enum(e) => self.process_enum(e),
            Item::Trait(t) => self.process_trait(t),
            Item::Impl(i) => self.process_impl(i),
            Item::Mod(m) => self.process_mod(m),
            Item::Use(u) => {
                if self.modules.is_empty() {
                    let tree = &u.tree;
                    self.result
                        .add_import(quote::quote!(#tree).to_string().replace(' ', ""));
                }
            }
            _ => {}
        }
    }

    fn process_mod(&mut self, item: &ItemMod) {
        let Some((_, items)) = &item.content else {
            return;
        };
        self.modules.push(item.ident.to_string());
        for inner in items {
            self.process_item(inner);
        }
        self.modules.pop();
    }

    fn process_fn(&mut self, item: &ItemFn) {
        let func = self.function(
            &item.sig,
            &item.attrs,
            item.span(),
            None,
            Some(&item.block),
        );
        self.result.add_function(func);
    }

    fn process_struct(&mut self, item: &ItemStruct) {
        self.add_class(&item.ident.to_string(), ClassKind::Struct, &item.attrs, item.span());
    }

    fn process_enum(&mut self, item: &ItemEnum) {
        self.add_class(&item.ident.to_string(), ClassKind::Enum, &item.attrs, item.span());
    }

    fn process_trait(&mut self, item: &ItemTrait) {
        let name = item.ident.to_string();
        self.add_class(&name, ClassKind::Trait, &item.attrs, item.span());
        if let Some(class) = self.result.classes.last_mut() {
            class.bases = item
                .supertraits
                .iter()
                .filter_map(|b| match b {
                    syn::TypeParamBound::Trait(t) => t.path.segments.last().map(|s| s.ident.to_string()),
                    _ => None,
                })
                .collect();
        }

        let owner = self.qualify(&name);
        for trait_item in &item.items {
            if let TraitItem::Fn(method) = trait_item {
                let func = self.function(
                    &method.sig,
                    &method.attrs,
                    method.span(),
                    Some(&owner),
                    method.default.as_ref(),
                );
                self.result.add_function(func);
            }
        }
    }

    fn process_impl(&mut self, item: &ItemImpl) {
        let Some(self_ty) = type_name(&item.self_ty) else {
            return;
        };
        let owner = self.qualify(&self_ty);

        if let Some((_, path, _)) = &item.trait_ {
            if let Some(segment) = path.segments.last() {
                self.impl_traits.push((owner.clone(), segment.ident.to_string()));
            }
        }

        for impl_item in &item.items {
            if let ImplItem::Fn(method) = impl_item {
                let func = self.function(
                    &method.sig,
                    &method.attrs,
                    method.span(),
                    Some(&owner),
                    Some(&method.block),
                );
                self.result.add_function(func);
            }
        }
    }

    fn add_class(&mut self, name: &str, kind: ClassKind, attrs: &[Attribute], span: Span) {
        let mut class = ClassEntity::new(name, self.result.file_path.clone(), kind)
            .at_lines(span.start().line as u32, span.end().line as u32);
        class.qualified_name = self.qualify(name);
        class.doc_comment = doc_comment(attrs);
        self.result.add_class(class);
    }

    fn function(
        &self,
        sig: &Signature,
        attrs: &[Attribute],
        span: Span,
        owner: Option<&str>,
        body: Option<&syn::Block>,
    ) -> FunctionEntity {
        let mut func = FunctionEntity::new(sig.ident.to_string(), self.result.file_path.clone())
            .at_lines(span.start().line as u32, span.end().line as u32);
        match owner {
            Some(owner) => func = func.with_parent(owner),
            None => func.qualified_name = self.qualify(&func.name),
        }

        func.signature = quote::quote!(#sig).to_string();
        func.parameters = parameters(sig);
        func.return_type = match &sig.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => Some(quote::quote!(#ty).to_string()),
        };
        func.is_async = sig.asyncness.is_some();
        func.doc_comment = doc_comment(attrs);
        func.decorators = attrs
            .iter()
            .filter(|a| !a.path().is_ident("doc"))
            .map(|a| {
                let meta = &a.meta;
                quote::quote!(#meta).to_string()
            })
            .collect();

        if let Some(body) = body {
            let mut calls = CallCollector::default();
            calls.visit_block(body);
            func.calls = calls.names;
        }

        func
    }

    fn finish(&mut self) {
        for (ty, trait_name) in std::mem::take(&mut self.impl_traits) {
            if let Some(class) = self.result.classes.iter_mut().find(|c| c.qualified_name == ty) {
                if !class.bases.contains(&trait_name) {
                    class.bases.push(trait_name);
                }
            }
        }
        self.result.attach_methods();
    }
}

/// Collects invoked names from a body, without entering nested items.
#[derive(Default)]
struct CallCollector {
    names: BTreeSet<String>,
}

impl<'ast> Visit<'ast> for CallCollector {
    fn visit_expr_call(&mut self, call: &'ast syn::ExprCall) {
        if let syn::Expr::Path(path) = &*call.func {
            if let Some(segment) = path.path.segments.last() {
                self.names.insert(segment.ident.to_string());
            }
        }
        syn::visit::visit_expr_call(self, call);
    }

    fn visit_expr_method_call(&mut self, call: &'ast syn::ExprMethodCall) {
        self.names.insert(call.method.to_string());
        syn::visit::visit_expr_method_call(self, call);
    }

    fn visit_item(&mut self, _item: &'ast Item) {}
}

/// Joined `///` or `//!` doc lines.
fn doc_comment(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n").trim().to_string())
    }
}

fn parameters(sig: &Signature) -> Vec<Parameter> {
    sig.inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Receiver(_) => None,
            FnArg::Typed(t) => {
                let name = match &*t.pat {
                    Pat::Ident(i) => i.ident.to_string(),
                    other => quote::quote!(#other).to_string(),
                };
                let ty = &t.ty;
                Some(Parameter::new(name, Some(quote::quote!(#ty).to_string())))
            }
        })
        .collect()
}

/// Last path segment of an impl's self type: `Store<T>` → Store, `&mut Buf` → Buf.
fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
        Type::Reference(r) => type_name(&r.elem),
        Type::Paren(p) => type_name(&p.elem),
        Type::Group(g) => type_name(&g.elem),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"//! Order storage.

use std::collections::HashMap;
use crate::db::{Pool, Row};

/// In-memory order store.
pub struct Store {
    rows: HashMap<u64, Row>,
}

impl Store {
    /// Insert one row.
    pub async fn insert(&mut self, id: u64, row: Row) -> Option<Row> {
        validate(&row);
        self.rows.insert(id, row)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self { rows: HashMap::new() }
    }
}

#[tracing::instrument]
fn validate(row: &Row) {
    fn inner() { hidden(); }
    row.check();
}

mod tests {
    fn validate() {}
}
"#;

    #[test]
    fn test_rust_entities() {
        let result = RustParser::new().parse_file("src/store.rs", SOURCE).unwrap();

        assert_eq!(result.module_doc.as_deref(), Some("Order storage."));
        assert_eq!(result.imports.len(), 2);
        assert_eq!(result.imports[0], "std::collections::HashMap");

        let store = &result.classes[0];
        assert_eq!(store.kind, ClassKind::Struct);
        assert_eq!(store.doc_comment.as_deref(), Some("In-memory order store."));
        assert_eq!(store.bases, vec!["Default".to_string()]);
        assert_eq!(store.methods, vec!["insert".to_string(), "default".to_string()]);

        let insert = result
            .functions
            .iter()
            .find(|f| f.qualified_name == "Store.insert")
            .unwrap();
        assert!(insert.is_async);
        assert_eq!(insert.parameter_names(), vec!["id", "row"]);
        assert_eq!(insert.return_type.as_deref(), Some("Option < Row >"));
        assert!(insert.calls.contains("validate"));
        assert!(insert.calls.contains("insert"));

        let validate = result.functions.iter().find(|f| f.qualified_name == "validate").unwrap();
        assert_eq!(validate.decorators, vec!["tracing :: instrument".to_string()]);
        assert!(validate.calls.contains("check"));
        assert!(!validate.calls.contains("hidden"));

        assert!(result.functions.iter().any(|f| f.qualified_name == "tests.validate"));
    }

    #[test]
    fn test_rust_syntax_error() {
        let err = RustParser::new().parse_file("bad.rs", "fn broken( {").unwrap_err();
        assert!(err.starts_with("syntax error"));
    }
}
