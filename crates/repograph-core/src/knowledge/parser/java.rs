//! Java parser using tree-sitter.

use tree_sitter::Node;

use super::result::ParseResult;
use super::traits::Parser;
use super::treesitter::{extract_doc_comment, leading_comment, TreeSitterParser};
use crate::knowledge::ontology::{ClassEntity, ClassKind, FunctionEntity, Language, Parameter};

const SCOPES: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "method_declaration",
    "constructor_declaration",
];

/// Java parser using tree-sitter.
pub struct JavaParser {
    base: TreeSitterParser,
}

impl JavaParser {
    pub fn new() -> Self {
        Self {
            base: TreeSitterParser::new(tree_sitter_java::LANGUAGE.into(), Language::Java, &["java"]),
        }
    }

    fn extract_type(
        &self,
        node: &Node,
        content: &str,
        path: &str,
        outer: Option<&str>,
        result: &mut ParseResult,
    ) {
        let kind = match node.kind() {
            "class_declaration" | "record_declaration" => ClassKind::Class,
            "interface_declaration" => ClassKind::Interface,
            "enum_declaration" => ClassKind::Enum,
            _ => return,
        };
        let Some(name) = TreeSitterParser::field_text(node, "name", content) else {
            return;
        };

        let mut class = ClassEntity::new(&name, path, kind).at_lines(
            TreeSitterParser::node_line(node),
            TreeSitterParser::node_end_line(node),
        );
        if let Some(outer) = outer {
            class.qualified_name = format!("{}.{}", outer, name);
        }
        class.doc_comment = extract_doc_comment(node, content);
        class.bases = Self::supertypes(node, content);

        let qualified = class.qualified_name.clone();
        let class_index = result.classes.len();
        result.add_class(class);

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut methods = Vec::new();
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "method_declaration" | "constructor_declaration" => {
                    if let Some(method) = Self::extract_method(&member, &qualified, content, path) {
                        methods.push(method.name.clone());
                        result.add_function(method);
                    }
                }
                // Enum bodies nest their members one level deeper.
                "enum_body_declarations" => {
                    let mut inner = member.walk();
                    for decl in member.named_children(&mut inner) {
                        if matches!(decl.kind(), "method_declaration" | "constructor_declaration") {
                            if let Some(method) = Self::extract_method(&decl, &qualified, content, path) {
                                methods.push(method.name.clone());
                                result.add_function(method);
                            }
                        }
                    }
                }
                _ => self.extract_type(&member, content, path, Some(&qualified), result),
            }
        }

        if let Some(class) = result.classes.get_mut(class_index) {
            class.methods = methods;
        }
    }

    fn extract_method(node: &Node, class: &str, content: &str, path: &str) -> Option<FunctionEntity> {
        let name = TreeSitterParser::field_text(node, "name", content)?;

        let mut func = FunctionEntity::new(name, path)
            .with_parent(class)
            .at_lines(TreeSitterParser::node_line(node), TreeSitterParser::node_end_line(node));

        func.signature = TreeSitterParser::signature(node, content);
        func.parameters = Self::parameters(node, content);
        func.return_type = TreeSitterParser::field_text(node, "type", content);
        func.decorators = Self::annotations(node, content);
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

    fn parameters(node: &Node, content: &str) -> Vec<Parameter> {
        let Some(params_node) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut params = Vec::new();
        let mut cursor = params_node.walk();
        for child in params_node.named_children(&mut cursor) {
            match child.kind() {
                "formal_parameter" => {
                    if let Some(name) = TreeSitterParser::field_text(&child, "name", content) {
                        params.push(Parameter::new(
                            name,
                            TreeSitterParser::field_text(&child, "type", content),
                        ));
                    }
                }
                "spread_parameter" => {
                    // `String... args`: the declarator holds the name.
                    let mut inner = child.walk();
                    let name = child
                        .named_children(&mut inner)
                        .find(|c| c.kind() == "variable_declarator")
                        .and_then(|d| TreeSitterParser::field_text(&d, "name", content));
                    let mut inner = child.walk();
                    let type_name = child
                        .named_children(&mut inner)
                        .find(|c| c.kind().ends_with("type") || c.kind() == "type_identifier")
                        .map(|t| format!("{}...", TreeSitterParser::node_text(&t, content)));
                    if let Some(name) = name {
                        params.push(Parameter::new(name, type_name));
                    }
                }
                _ => {}
            }
        }
        params
    }

    /// Superclass, implemented and extended interfaces.
    fn supertypes(node: &Node, content: &str) -> Vec<String> {
        let mut bases = Vec::new();
        if let Some(superclass) = node.child_by_field_name("superclass") {
            let mut cursor = superclass.walk();
            for t in superclass.named_children(&mut cursor) {
                bases.push(Self::type_name(&t, content));
            }
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if !matches!(child.kind(), "super_interfaces" | "extends_interfaces") {
                continue;
            }
            let mut list_cursor = child.walk();
            for list in child.named_children(&mut list_cursor) {
                let mut type_cursor = list.walk();
                for t in list.named_children(&mut type_cursor) {
                    bases.push(Self::type_name(&t, content));
                }
            }
        }
        bases
    }

    /// Type name without type arguments: `List<String>` → List.
    fn type_name(node: &Node, content: &str) -> String {
        let text = TreeSitterParser::node_text(node, content);
        text.split('<').next().unwrap_or(text).trim().to_string()
    }

    fn annotations(node: &Node, content: &str) -> Vec<String> {
        let mut cursor = node.walk();
        let Some(modifiers) = node.children(&mut cursor).find(|c| c.kind() == "modifiers") else {
            return Vec::new();
        };
        let mut mod_cursor = modifiers.walk();
        let annotations = modifiers
            .named_children(&mut mod_cursor)
            .filter(|m| matches!(m.kind(), "annotation" | "marker_annotation"))
            .map(|m| {
                TreeSitterParser::node_text(&m, content)
                    .trim_start_matches('@')
                    .to_string()
            })
            .collect();
        annotations
    }

    fn extract_import(node: &Node, content: &str, result: &mut ParseResult) {
        let text = TreeSitterParser::node_text(node, content);
        let import = text
            .trim()
            .trim_start_matches("import")
            .trim()
            .trim_start_matches("static ")
            .trim_end_matches(';')
            .trim();
        result.add_import(import);
    }

    /// Name invoked by a call: `foo()` / `obj.foo()` → foo, `new Foo<>()` → Foo.
    fn callee(node: &Node, content: &str) -> Option<String> {
        match node.kind() {
            "method_invocation" => TreeSitterParser::field_text(node, "name", content),
            "object_creation_expression" => node
                .child_by_field_name("type")
                .map(|t| Self::type_name(&t, content)),
            _ => None,
        }
    }
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for JavaParser {
    fn parse_file(&self, path: &str, content: &str) -> Result<ParseResult, String> {
        let tree = self.base.parse_tree(content)?;
        let root = tree.root_node();
        let mut result = ParseResult::new(path, self.base.language());

        result.module_doc = leading_comment(&root, content);
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "import_declaration" => Self::extract_import(&child, content, &mut result),
                _ => self.extract_type(&child, content, path, None, &mut result),
            }
        }

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

    const SOURCE: &str = r#"package com.acme.users;

import java.util.List;
import com.acme.core.BaseController;

/**
 * REST endpoints for users.
 */
@RestController
public class UserController extends BaseController implements Auditable, Closeable {

    /** Fetch one user. */
    @GetMapping("/users/{id}")
    public User find(@PathVariable long id, String... fields) {
        return repository.findById(id).orElse(new User());
    }

    static class Cache {
        void clear() {}
    }
}
"#;

    #[test]
    fn test_java_class_members() {
        let result = JavaParser::new().parse_file("UserController.java", SOURCE).unwrap();

        assert_eq!(
            result.imports,
            vec!["java.util.List".to_string(), "com.acme.core.BaseController".to_string()]
        );

        let controller = result.classes.iter().find(|c| c.name == "UserController").unwrap();
        assert_eq!(
            controller.bases,
            vec!["BaseController".to_string(), "Auditable".to_string(), "Closeable".to_string()]
        );
        assert_eq!(controller.methods, vec!["find".to_string()]);
        assert_eq!(controller.doc_comment.as_deref(), Some("REST endpoints for users."));

        let find = result
            .functions
            .iter()
            .find(|f| f.qualified_name == "UserController.find")
            .unwrap();
        assert_eq!(find.parameter_names(), vec!["id", "fields"]);
        assert_eq!(find.return_type.as_deref(), Some("User"));
        assert_eq!(find.decorators, vec!["GetMapping(\"/users/{id}\")".to_string()]);
        assert!(find.calls.contains("findById"));
        assert!(find.calls.contains("orElse"));
        assert!(find.calls.contains("User"));

        let cache = result.classes.iter().find(|c| c.name == "Cache").unwrap();
        assert_eq!(cache.qualified_name, "UserController.Cache");
        assert!(result
            .functions
            .iter()
            .any(|f| f.qualified_name == "UserController.Cache.clear"));
    }
}
