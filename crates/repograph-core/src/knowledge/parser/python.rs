//! Python parser using tree-sitter.

use tree_sitter::Node;

use super::result::ParseResult;
use super::traits::Parser;
use super::treesitter::{unquote, TreeSitterParser};
use crate::knowledge::ontology::{ClassEntity, ClassKind, FunctionEntity, Language, Parameter};

/// Node kinds that open a new scope for call attribution.
const SCOPES: &[&str] = &["function_definition", "class_definition", "decorated_definition", "lambda"];

/// Python parser using tree-sitter.
pub struct PythonParser {
    base: TreeSitterParser,
}

impl PythonParser {
    pub fn new() -> Self {
        Self {
            base: TreeSitterParser::new(
                tree_sitter_python::LANGUAGE.into(),
                Language::Python,
                &["py", "pyi"],
            ),
        }
    }

    /// Walk a block of statements, collecting classes and functions.
    ///
    /// `owner` is the qualified name of the enclosing class or function.
    fn process_block(
        &self,
        block: &Node,
        content: &str,
        path: &str,
        owner: Option<&Owner>,
        result: &mut ParseResult,
    ) {
        let mut cursor = block.walk();
        for child in block.children(&mut cursor) {
            match child.kind() {
                "function_definition" => {
                    self.process_function(&child, &[], content, path, owner, result);
                }
                "class_definition" => {
                    self.process_class(&child, content, path, owner, result);
                }
                "decorated_definition" => {
                    let decorators = Self::decorators(&child, content);
                    if let Some(def) = child.child_by_field_name("definition") {
                        match def.kind() {
                            "function_definition" => {
                                self.process_function(&def, &decorators, content, path, owner, result)
                            }
                            "class_definition" => self.process_class(&def, content, path, owner, result),
                            _ => {}
                        }
                    }
                }
                "import_statement" | "import_from_statement" => {
                    if owner.is_none() {
                        Self::collect_imports(&child, content, result);
                    }
                }
                // Definitions nested in if/try/with blocks still belong to this scope.
                "if_statement" | "try_statement" | "with_statement" | "else_clause"
                | "elif_clause" | "except_clause" | "finally_clause" | "block" => {
                    self.process_block(&child, content, path, owner, result);
                }
                _ => {}
            }
        }
    }

    fn process_function(
        &self,
        node: &Node,
        decorators: &[String],
        content: &str,
        path: &str,
        owner: Option<&Owner>,
        result: &mut ParseResult,
    ) {
        let Some(name) = TreeSitterParser::field_text(node, "name", content) else {
            return;
        };

        let mut func = FunctionEntity::new(&name, path).at_lines(
            TreeSitterParser::node_line(node),
            TreeSitterParser::node_end_line(node),
        );
        let is_method = matches!(owner, Some(Owner::Class(_)));
        if let Some(owner) = owner {
            func = func.with_parent(owner.qualified_name());
            if !is_method {
                // Nested function: qualified by its enclosing function, no class parent.
                func.parent = None;
            }
        }

        func.signature = TreeSitterParser::signature(node, content);
        func.parameters = Self::parameters(node, content, is_method);
        func.return_type = TreeSitterParser::field_text(node, "return_type", content);
        func.is_async = node
            .child(0)
            .map(|c| c.kind() == "async")
            .unwrap_or(false);
        func.decorators = decorators.to_vec();
        func.doc_comment = node
            .child_by_field_name("body")
            .and_then(|body| Self::docstring(&body, content));

        if let Some(body) = node.child_by_field_name("body") {
            TreeSitterParser::visit_calls(&body, SCOPES, &mut |n: &Node| {
                if let Some(callee) = Self::callee(n, content) {
                    func.calls.insert(callee);
                }
            });
        }

        let qualified = func.qualified_name.clone();
        result.add_function(func);

        if let Some(body) = node.child_by_field_name("body") {
            self.process_block(&body, content, path, Some(&Owner::Function(qualified)), result);
        }
    }

    fn process_class(
        &self,
        node: &Node,
        content: &str,
        path: &str,
        owner: Option<&Owner>,
        result: &mut ParseResult,
    ) {
        let Some(name) = TreeSitterParser::field_text(node, "name", content) else {
            return;
        };

        let mut class = ClassEntity::new(&name, path, ClassKind::Class).at_lines(
            TreeSitterParser::node_line(node),
            TreeSitterParser::node_end_line(node),
        );
        if let Some(owner) = owner {
            class.qualified_name = format!("{}.{}", owner.qualified_name(), name);
        }

        class.bases = node
            .child_by_field_name("superclasses")
            .map(|sc| {
                let mut cursor = sc.walk();
                sc.named_children(&mut cursor)
                    .filter(|c| c.kind() == "identifier" || c.kind() == "attribute")
                    .map(|c| TreeSitterParser::node_text(&c, content).to_string())
                    .collect()
            })
            .unwrap_or_default();

        let body = node.child_by_field_name("body");
        class.doc_comment = body.and_then(|b| Self::docstring(&b, content));

        let qualified = class.qualified_name.clone();
        let first_function = result.functions.len();
        let class_index = result.classes.len();
        result.add_class(class);

        if let Some(body) = body {
            self.process_block(&body, content, path, Some(&Owner::Class(qualified.clone())), result);
        }

        let methods: Vec<String> = result.functions[first_function..]
            .iter()
            .filter(|f| f.parent.as_deref() == Some(qualified.as_str()))
            .map(|f| f.name.clone())
            .collect();
        if let Some(class) = result.classes.get_mut(class_index) {
            class.methods = methods;
        }
    }

    fn parameters(node: &Node, content: &str, is_method: bool) -> Vec<Parameter> {
        let Some(params_node) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };

        let mut params = Vec::new();
        let mut cursor = params_node.walk();
        for child in params_node.named_children(&mut cursor) {
            let (name, type_name) = match child.kind() {
                "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                    (TreeSitterParser::node_text(&child, content).to_string(), None)
                }
                "default_parameter" | "typed_default_parameter" => (
                    TreeSitterParser::field_text(&child, "name", content).unwrap_or_default(),
                    TreeSitterParser::field_text(&child, "type", content),
                ),
                "typed_parameter" => {
                    let mut inner = child.walk();
                    let name = child
                        .named_children(&mut inner)
                        .find(|c| {
                            matches!(
                                c.kind(),
                                "identifier" | "list_splat_pattern" | "dictionary_splat_pattern"
                            )
                        })
                        .map(|c| TreeSitterParser::node_text(&c, content).to_string())
                        .unwrap_or_default();
                    (name, TreeSitterParser::field_text(&child, "type", content))
                }
                _ => continue,
            };

            if name.is_empty() {
                continue;
            }
            if is_method && params.is_empty() && (name == "self" || name == "cls") {
                continue;
            }
            params.push(Parameter::new(name, type_name));
        }

        params
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

    /// A string literal as the first statement of a block.
    fn docstring(block: &Node, content: &str) -> Option<String> {
        let mut cursor = block.walk();
        let first_stmt = block.named_children(&mut cursor).next()?;
        if first_stmt.kind() != "expression_statement" {
            return None;
        }
        let string_node = first_stmt.named_child(0).filter(|n| n.kind() == "string")?;
        let text = unquote(TreeSitterParser::node_text(&string_node, content));
        (!text.is_empty()).then_some(text)
    }

    fn collect_imports(node: &Node, content: &str, result: &mut ParseResult) {
        if node.kind() == "import_from_statement" {
            if let Some(module) = TreeSitterParser::field_text(node, "module_name", content) {
                result.add_import(module);
            }
            return;
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => result.add_import(TreeSitterParser::node_text(&child, content)),
                "aliased_import" => {
                    if let Some(name) = TreeSitterParser::field_text(&child, "name", content) {
                        result.add_import(name);
                    }
                }
                _ => {}
            }
        }
    }

    /// Name invoked by a `call` node: `foo()` → foo, `obj.method()` → method.
    fn callee(node: &Node, content: &str) -> Option<String> {
        if node.kind() != "call" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        let name_node = match function.kind() {
            "identifier" => function,
            "attribute" => function.child_by_field_name("attribute")?,
            _ => return None,
        };
        Some(TreeSitterParser::node_text(&name_node, content).to_string())
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Enclosing declaration of a nested definition.
enum Owner {
    Class(String),
    Function(String),
}

impl Owner {
    fn qualified_name(&self) -> &str {
        match self {
            Self::Class(name) | Self::Function(name) => name,
        }
    }
}

impl Parser for PythonParser {
    fn parse_file(&self, path: &str, content: &str) -> Result<ParseResult, String> {
        let tree = self.base.parse_tree(content)?;
        let root = tree.root_node();
        let mut result = ParseResult::new(path, self.base.language());

        result.module_doc = Self::docstring(&root, content);
        self.process_block(&root, content, path, None, &mut result);

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

    const SOURCE: &str = r#""""Billing service module."""
import os
from app.models import Invoice

class InvoiceService(BaseService):
    """Creates and sends invoices."""

    def __init__(self, repo):
        self.repo = repo

    @cached
    async def send(self, invoice: Invoice, retries: int = 3) -> bool:
        """Send one invoice."""
        payload = render(invoice)
        return self.repo.deliver(payload)

def render(invoice, *args, **kwargs):
    def helper():
        return format_line(invoice)
    return helper()
"#;

    fn parse() -> ParseResult {
        PythonParser::new().parse_file("billing/service.py", SOURCE).unwrap()
    }

    #[test]
    fn test_module_docstring_and_imports() {
        let result = parse();
        assert_eq!(result.module_doc.as_deref(), Some("Billing service module."));
        assert_eq!(result.imports, vec!["os".to_string(), "app.models".to_string()]);
    }

    #[test]
    fn test_class_with_methods() {
        let result = parse();
        assert_eq!(result.classes.len(), 1);
        let class = &result.classes[0];
        assert_eq!(class.name, "InvoiceService");
        assert_eq!(class.bases, vec!["BaseService".to_string()]);
        assert_eq!(class.methods, vec!["__init__".to_string(), "send".to_string()]);
        assert_eq!(class.doc_comment.as_deref(), Some("Creates and sends invoices."));
    }

    #[test]
    fn test_method_signature_details() {
        let result = parse();
        let send = result
            .functions
            .iter()
            .find(|f| f.qualified_name == "InvoiceService.send")
            .unwrap();
        assert!(send.is_async);
        assert_eq!(send.parent.as_deref(), Some("InvoiceService"));
        assert_eq!(send.parameter_names(), vec!["invoice", "retries"]);
        assert_eq!(send.parameters[0].type_name.as_deref(), Some("Invoice"));
        assert_eq!(send.return_type.as_deref(), Some("bool"));
        assert_eq!(send.decorators, vec!["cached".to_string()]);
        assert_eq!(send.doc_comment.as_deref(), Some("Send one invoice."));
        assert!(send.calls.contains("render"));
        assert!(send.calls.contains("deliver"));
    }

    #[test]
    fn test_nested_function_calls_stay_with_their_scope() {
        let result = parse();
        let render = result.functions.iter().find(|f| f.qualified_name == "render").unwrap();
        assert_eq!(render.parameter_names(), vec!["invoice", "*args", "**kwargs"]);
        assert!(render.calls.contains("helper"));
        assert!(!render.calls.contains("format_line"));

        let helper = result
            .functions
            .iter()
            .find(|f| f.qualified_name == "render.helper")
            .unwrap();
        assert!(helper.parent.is_none());
        assert!(helper.calls.contains("format_line"));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = PythonParser::new()
            .parse_file("bad.py", "def broken(:\n    pass\n")
            .unwrap_err();
        assert!(err.contains("syntax error"));
    }
}
