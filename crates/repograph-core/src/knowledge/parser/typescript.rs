//! TypeScript and JavaScript parser using tree-sitter.

use tree_sitter::Node;

use super::result::ParseResult;
use super::traits::Parser;
use super::treesitter::{extract_doc_comment, leading_comment, unquote, TreeSitterParser};
use crate::knowledge::ontology::{ClassEntity, ClassKind, FunctionEntity, Language, Parameter};

/// Node kinds whose bodies are attributed to their own entity.
const SCOPES: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "class_declaration",
    "abstract_class_declaration",
    "class",
    "method_definition",
];

/// TypeScript and JavaScript parser using tree-sitter.
pub struct TypeScriptParser {
    base: TreeSitterParser,
}

impl TypeScriptParser {
    /// Create a TypeScript parser.
    pub fn typescript() -> Self {
        Self {
            base: TreeSitterParser::new(
                tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
                Language::TypeScript,
                &["ts"],
            ),
        }
    }

    /// Create a TSX parser.
    pub fn tsx() -> Self {
        Self {
            base: TreeSitterParser::new(
                tree_sitter_typescript::LANGUAGE_TSX.into(),
                Language::TypeScript,
                &["tsx"],
            ),
        }
    }

    /// Create a JavaScript parser.
    pub fn javascript() -> Self {
        Self {
            base: TreeSitterParser::new(
                tree_sitter_javascript::LANGUAGE.into(),
                Language::JavaScript,
                &["js", "jsx", "mjs", "cjs"],
            ),
        }
    }

    fn process_statement(&self, node: Node, content: &str, path: &str, result: &mut ParseResult) {
        match node.kind() {
            "import_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    result.add_import(unquote(TreeSitterParser::node_text(&source, content)));
                }
            }
            "export_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.process_statement(child, content, path, result);
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = TreeSitterParser::field_text(&node, "name", content) {
                    let func = Self::extract_function(&node, &node, name, None, content, path);
                    result.add_function(func);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                for declarator in node.named_children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let Some(value) = declarator.child_by_field_name("value") else {
                        continue;
                    };
                    if !matches!(value.kind(), "arrow_function" | "function_expression" | "function") {
                        continue;
                    }
                    if let Some(name) = TreeSitterParser::field_text(&declarator, "name", content) {
                        let func = Self::extract_function(&value, &node, name, None, content, path);
                        result.add_function(func);
                    }
                }
            }
            "class_declaration" | "abstract_class_declaration" | "class" => {
                self.extract_class(&node, content, path, result);
            }
            "interface_declaration" => {
                if let Some(name) = TreeSitterParser::field_text(&node, "name", content) {
                    let mut iface = ClassEntity::new(name, path, ClassKind::Interface).at_lines(
                        TreeSitterParser::node_line(&node),
                        TreeSitterParser::node_end_line(&node),
                    );
                    iface.doc_comment = Self::doc_for(&node, content);
                    iface.bases = Self::heritage(&node, content);
                    result.add_class(iface);
                }
            }
            "enum_declaration" => {
                if let Some(name) = TreeSitterParser::field_text(&node, "name", content) {
                    let mut e = ClassEntity::new(name, path, ClassKind::Enum).at_lines(
                        TreeSitterParser::node_line(&node),
                        TreeSitterParser::node_end_line(&node),
                    );
                    e.doc_comment = Self::doc_for(&node, content);
                    result.add_class(e);
                }
            }
            _ => {}
        }
    }

    /// Build a function entity.
    ///
    /// `func_node` holds parameters and body; `decl_node` is the statement
    /// carrying the doc comment (they differ for `const f = () => ...`).
    fn extract_function(
        func_node: &Node,
        decl_node: &Node,
        name: String,
        parent: Option<&str>,
        content: &str,
        path: &str,
    ) -> FunctionEntity {
        let mut func = FunctionEntity::new(name, path).at_lines(
            TreeSitterParser::node_line(decl_node),
            TreeSitterParser::node_end_line(decl_node),
        );
        if let Some(parent) = parent {
            func = func.with_parent(parent);
        }

        func.signature = TreeSitterParser::signature(decl_node, content);
        func.parameters = Self::parameters(func_node, content);
        func.return_type = TreeSitterParser::field_text(func_node, "return_type", content)
            .map(|t| t.trim_start_matches(':').trim().to_string());
        func.is_async = {
            let mut cursor = func_node.walk();
            let is_async = func_node.children(&mut cursor).any(|c| c.kind() == "async");
            is_async
        };
        func.decorators = Self::decorators(decl_node, content);
        func.doc_comment = Self::doc_for(decl_node, content);

        if let Some(body) = func_node.child_by_field_name("body") {
            if let Some(callee) = Self::callee(&body, content) {
                // Expression-bodied arrow function: `() => run()`
                func.calls.insert(callee);
            }
            TreeSitterParser::visit_calls(&body, SCOPES, &mut |n: &Node| {
                if let Some(callee) = Self::callee(n, content) {
                    func.calls.insert(callee);
                }
            });
        }

        func
    }

    fn extract_class(&self, node: &Node, content: &str, path: &str, result: &mut ParseResult) {
        let Some(name) = TreeSitterParser::field_text(node, "name", content) else {
            return;
        };

        let mut class = ClassEntity::new(&name, path, ClassKind::Class).at_lines(
            TreeSitterParser::node_line(node),
            TreeSitterParser::node_end_line(node),
        );
        class.doc_comment = Self::doc_for(node, content);
        class.bases = Self::heritage(node, content);

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                if member.kind() != "method_definition" {
                    continue;
                }
                let Some(method_name) = TreeSitterParser::field_text(&member, "name", content) else {
                    continue;
                };
                class.methods.push(method_name.clone());
                let method =
                    Self::extract_function(&member, &member, method_name, Some(&name), content, path);
                result.add_function(method);
            }
        }

        result.add_class(class);
    }

    fn parameters(node: &Node, content: &str) -> Vec<Parameter> {
        let Some(params_node) = node
            .child_by_field_name("parameters")
            .or_else(|| node.child_by_field_name("parameter"))
        else {
            return Vec::new();
        };

        // Single unparenthesized arrow parameter: `x => x + 1`
        if params_node.kind() == "identifier" {
            return vec![Parameter::new(TreeSitterParser::node_text(&params_node, content), None)];
        }

        let mut params = Vec::new();
        let mut cursor = params_node.walk();
        for child in params_node.named_children(&mut cursor) {
            let (name, type_name) = match child.kind() {
                "identifier" | "rest_pattern" | "object_pattern" | "array_pattern" => {
                    (TreeSitterParser::node_text(&child, content).to_string(), None)
                }
                "assignment_pattern" => (
                    TreeSitterParser::field_text(&child, "left", content).unwrap_or_default(),
                    None,
                ),
                "required_parameter" | "optional_parameter" => (
                    TreeSitterParser::field_text(&child, "pattern", content).unwrap_or_default(),
                    TreeSitterParser::field_text(&child, "type", content)
                        .map(|t| t.trim_start_matches(':').trim().to_string()),
                ),
                _ => continue,
            };
            if !name.is_empty() {
                params.push(Parameter::new(name, type_name));
            }
        }
        params
    }

    /// Superclass and implemented interfaces.
    fn heritage(node: &Node, content: &str) -> Vec<String> {
        let mut bases = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if !matches!(child.kind(), "class_heritage" | "extends_type_clause") {
                continue;
            }
            Self::collect_type_names(&child, content, &mut bases);
        }
        bases
    }

    fn collect_type_names(node: &Node, content: &str, out: &mut Vec<String>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "identifier" | "type_identifier" | "member_expression" | "nested_type_identifier" => {
                    out.push(TreeSitterParser::node_text(&child, content).to_string());
                }
                "generic_type" => {
                    if let Some(name) = TreeSitterParser::field_text(&child, "name", content) {
                        out.push(name);
                    }
                }
                "extends_clause" | "implements_clause" => Self::collect_type_names(&child, content, out),
                _ => {}
            }
        }
    }

    fn decorators(node: &Node, content: &str) -> Vec<String> {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .filter(|c| c.kind() == "decorator")
            .map(|d| {
                TreeSitterParser::node_text(&d, content)
                    .trim_start_matches('@')
                    .trim()
                    .to_string()
            })
            .collect()
    }

    /// Doc comment for a declaration, looking through a wrapping `export`.
    fn doc_for(node: &Node, content: &str) -> Option<String> {
        extract_doc_comment(node, content).or_else(|| {
            node.parent()
                .filter(|p| p.kind() == "export_statement")
                .and_then(|p| extract_doc_comment(&p, content))
        })
    }

    /// Name invoked by a call: `foo()` → foo, `obj.method()` → method, `new Foo()` → Foo.
    fn callee(node: &Node, content: &str) -> Option<String> {
        let target = match node.kind() {
            "call_expression" => node.child_by_field_name("function")?,
            "new_expression" => node.child_by_field_name("constructor")?,
            _ => return None,
        };
        let name_node = match target.kind() {
            "identifier" => target,
            "member_expression" => target.child_by_field_name("property")?,
            _ => return None,
        };
        Some(TreeSitterParser::node_text(&name_node, content).to_string())
    }
}

impl Parser for TypeScriptParser {
    fn parse_file(&self, path: &str, content: &str) -> Result<ParseResult, String> {
        let tree = self.base.parse_tree(content)?;
        let root = tree.root_node();
        let mut result = ParseResult::new(path, self.base.language());

        result.module_doc = leading_comment(&root, content);
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            self.process_statement(child, content, path, &mut result);
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

    #[test]
    fn test_typescript_class_and_functions() {
        let source = r#"import { Router } from "express";

/** Handles user sessions. */
export class SessionService extends BaseService implements Disposable {
    async login(user: string, password?: string): Promise<Token> {
        return this.tokens.issue(hash(password));
    }
}

export const logout = async (token: Token) => {
    await revoke(token);
};

function hash(value: string): string {
    return digest(value);
}
"#;
        let result = TypeScriptParser::typescript()
            .parse_file("src/session.ts", source)
            .unwrap();

        assert_eq!(result.imports, vec!["express".to_string()]);

        let class = &result.classes[0];
        assert_eq!(class.name, "SessionService");
        assert_eq!(class.bases, vec!["BaseService".to_string(), "Disposable".to_string()]);
        assert_eq!(class.methods, vec!["login".to_string()]);
        assert_eq!(class.doc_comment.as_deref(), Some("Handles user sessions."));

        let login = result
            .functions
            .iter()
            .find(|f| f.qualified_name == "SessionService.login")
            .unwrap();
        assert!(login.is_async);
        assert_eq!(login.parameter_names(), vec!["user", "password"]);
        assert_eq!(login.return_type.as_deref(), Some("Promise<Token>"));
        assert!(login.calls.contains("issue"));
        assert!(login.calls.contains("hash"));

        let logout = result.functions.iter().find(|f| f.name == "logout").unwrap();
        assert!(logout.is_async);
        assert!(logout.calls.contains("revoke"));

        let hash = result.functions.iter().find(|f| f.name == "hash").unwrap();
        assert!(hash.calls.contains("digest"));
        assert!(hash.parent.is_none());
    }

    #[test]
    fn test_javascript_module_doc_and_new_expression() {
        let source = r#"// Entry point for the worker process.

const queue = require("./queue");

function start() {
    const w = new Worker(queue);
    w.run();
}
"#;
        let result = TypeScriptParser::javascript()
            .parse_file("worker.js", source)
            .unwrap();

        assert_eq!(result.module_doc.as_deref(), Some("Entry point for the worker process."));
        let start = &result.functions[0];
        assert!(start.calls.contains("Worker"));
        assert!(start.calls.contains("run"));
    }

    #[test]
    fn test_javascript_syntax_error() {
        assert!(TypeScriptParser::javascript()
            .parse_file("bad.js", "function ( {")
            .is_err());
    }
}
