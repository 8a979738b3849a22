//! Go parser using tree-sitter.

use tree_sitter::Node;

use super::result::ParseResult;
use super::traits::Parser;
use super::treesitter::{extract_doc_comment, unquote, TreeSitterParser};
use crate::knowledge::ontology::{ClassEntity, ClassKind, FunctionEntity, Language, Parameter};

/// Function literals are attributed to the enclosing declaration.
const SCOPES: &[&str] = &["function_declaration", "method_declaration"];

/// Go parser using tree-sitter.
pub struct GoParser {
    base: TreeSitterParser,
}

impl GoParser {
    pub fn new() -> Self {
        Self {
            base: TreeSitterParser::new(tree_sitter_go::LANGUAGE.into(), Language::Go, &["go"]),
        }
    }

    fn extract_function(&self, node: &Node, content: &str, path: &str) -> Option<FunctionEntity> {
        let name = TreeSitterParser::field_text(node, "name", content)?;

        let mut func = FunctionEntity::new(name, path).at_lines(
            TreeSitterParser::node_line(node),
            TreeSitterParser::node_end_line(node),
        );
        if let Some(receiver) = Self::receiver_type(node, content) {
            func = func.with_parent(&receiver);
        }

        func.signature = TreeSitterParser::signature(node, content);
        func.parameters = node
            .child_by_field_name("parameters")
            .map(|p| Self::parameters(&p, content))
            .unwrap_or_default();
        func.return_type = TreeSitterParser::field_text(node, "result", content);
        func.doc_comment = extract_doc_comment(node, content);

        if let Some(body) = node.child_by_field_name("body") {
            TreeSitterParser::visit_calls(&body, SCOPES, &mut |n: &Node| {
                if let Some(callee) = Self::callee(n, content) {
                    func.calls.insert(callee);
                }
            });
        }

        Some(func)
    }

    /// Receiver type name without pointer or type arguments: `(s *Server[T])` → Server.
    fn receiver_type(node: &Node, content: &str) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let mut cursor = receiver.walk();
        let param = receiver
            .named_children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")?;
        let ty = param.child_by_field_name("type")?;
        let text = TreeSitterParser::node_text(&ty, content);
        let name = text.trim_start_matches('*');
        let name = name.split('[').next().unwrap_or(name).trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    fn parameters(list: &Node, content: &str) -> Vec<Parameter> {
        let mut params = Vec::new();
        let mut cursor = list.walk();
        for decl in list.named_children(&mut cursor) {
            if !matches!(decl.kind(), "parameter_declaration" | "variadic_parameter_declaration") {
                continue;
            }
            let type_name = TreeSitterParser::field_text(&decl, "type", content).map(|t| {
                if decl.kind() == "variadic_parameter_declaration" {
                    format!("...{}", t)
                } else {
                    t
                }
            });

            // `a, b int` declares two parameters sharing one type.
            let mut names_cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut names_cursor)
                .map(|n| TreeSitterParser::node_text(&n, content).to_string())
                .collect();
            if names.is_empty() {
                // Unnamed parameter: record the type in its place.
                if let Some(t) = type_name {
                    params.push(Parameter::new(t.clone(), Some(t)));
                }
                continue;
            }
            for name in names {
                params.push(Parameter::new(name, type_name.clone()));
            }
        }
        params
    }

    fn extract_types(&self, node: &Node, content: &str, path: &str, result: &mut ParseResult) {
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let Some(name) = TreeSitterParser::field_text(&spec, "name", content) else {
                continue;
            };
            let kind = match spec.child_by_field_name("type").map(|t| t.kind()) {
                Some("struct_type") => ClassKind::Struct,
                Some("interface_type") => ClassKind::Interface,
                _ => continue,
            };
            let mut class = ClassEntity::new(name, path, kind).at_lines(
                TreeSitterParser::node_line(&spec),
                TreeSitterParser::node_end_line(&spec),
            );
            // Doc comments attach to the `type` keyword's declaration.
            class.doc_comment =
                extract_doc_comment(&spec, content).or_else(|| extract_doc_comment(node, content));
            if kind == ClassKind::Struct {
                class.bases = spec
                    .child_by_field_name("type")
                    .map(|t| Self::embedded_fields(&t, content))
                    .unwrap_or_default();
            }
            result.add_class(class);
        }
    }

    /// Embedded struct fields act as Go's composition "bases".
    fn embedded_fields(struct_type: &Node, content: &str) -> Vec<String> {
        let mut bases = Vec::new();
        let mut cursor = struct_type.walk();
        for list in struct_type.named_children(&mut cursor) {
            if list.kind() != "field_declaration_list" {
                continue;
            }
            let mut field_cursor = list.walk();
            for field in list.named_children(&mut field_cursor) {
                if field.kind() == "field_declaration" && field.child_by_field_name("name").is_none() {
                    if let Some(ty) = TreeSitterParser::field_text(&field, "type", content) {
                        bases.push(ty.trim_start_matches('*').to_string());
                    }
                }
            }
        }
        bases
    }

    fn extract_imports(node: &Node, content: &str, result: &mut ParseResult) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_spec" => {
                    if let Some(path) = TreeSitterParser::field_text(&child, "path", content) {
                        result.add_import(unquote(&path));
                    }
                }
                "import_spec_list" => Self::extract_imports(&child, content, result),
                _ => {}
            }
        }
    }

    /// Name invoked by a call: `foo()` → foo, `pkg.Foo()` / `s.run()` → Foo / run.
    fn callee(node: &Node, content: &str) -> Option<String> {
        if node.kind() != "call_expression" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        let name_node = match function.kind() {
            "identifier" => function,
            "selector_expression" => function.child_by_field_name("field")?,
            _ => return None,
        };
        Some(TreeSitterParser::node_text(&name_node, content).to_string())
    }
}

impl Default for GoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for GoParser {
    fn parse_file(&self, path: &str, content: &str) -> Result<ParseResult, String> {
        let tree = self.base.parse_tree(content)?;
        let root = tree.root_node();
        let mut result = ParseResult::new(path, self.base.language());

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "package_clause" => result.module_doc = extract_doc_comment(&child, content),
                "import_declaration" => Self::extract_imports(&child, content, &mut result),
                "function_declaration" | "method_declaration" => {
                    if let Some(func) = self.extract_function(&child, content, path) {
                        result.add_function(func);
                    }
                }
                "type_declaration" => self.extract_types(&child, content, path, &mut result),
                _ => {}
            }
        }

        result.attach_methods();
        Ok(result)
    }

    fn language(&self) -> Language {
        self.base.language()
    }

    fn supported_extensions(&self) -> &[&'static str] {
        self.base.supported_extensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"// Package store persists orders.
package store

import (
	"database/sql"
	"fmt"
)

// Store wraps a database handle.
type Store struct {
	*Base
	db *sql.DB
}

// Save writes one order.
func (s *Store) Save(ctx context.Context, id, name string) error {
	return s.exec(fmt.Sprintf("insert %s", name))
}

func New(db *sql.DB, opts ...Option) *Store {
	return &Store{db: db}
}
"#;

    #[test]
    fn test_go_declarations() {
        let result = GoParser::new().parse_file("store/store.go", SOURCE).unwrap();

        assert_eq!(result.module_doc.as_deref(), Some("Package store persists orders."));
        assert_eq!(result.imports, vec!["database/sql".to_string(), "fmt".to_string()]);

        let store = &result.classes[0];
        assert_eq!(store.kind, ClassKind::Struct);
        assert_eq!(store.bases, vec!["Base".to_string()]);
        assert_eq!(store.methods, vec!["Save".to_string()]);
        assert_eq!(store.doc_comment.as_deref(), Some("Store wraps a database handle."));

        let save = result.functions.iter().find(|f| f.name == "Save").unwrap();
        assert_eq!(save.qualified_name, "Store.Save");
        assert_eq!(save.parameter_names(), vec!["ctx", "id", "name"]);
        assert_eq!(save.return_type.as_deref(), Some("error"));
        assert_eq!(save.doc_comment.as_deref(), Some("Save writes one order."));
        assert!(save.calls.contains("exec"));
        assert!(save.calls.contains("Sprintf"));

        let new = result.functions.iter().find(|f| f.name == "New").unwrap();
        assert_eq!(new.parameters[1].type_name.as_deref(), Some("...Option"));
    }
}
