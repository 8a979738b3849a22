//! Tree-sitter based parsing utilities shared across language parsers.

use tree_sitter::{Language as TSLanguage, Node, Parser as TSParser, Tree};

use crate::knowledge::ontology::Language;

/// Base tree-sitter parser with shared functionality.
pub struct TreeSitterParser {
    grammar: TSLanguage,
    language: Language,
    extensions: &'static [&'static str],
}

impl TreeSitterParser {
    pub fn new(grammar: TSLanguage, language: Language, extensions: &'static [&'static str]) -> Self {
        Self {
            grammar,
            language,
            extensions,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn supported_extensions(&self) -> &[&'static str] {
        self.extensions
    }

    /// Parse source code into a tree-sitter tree.
    ///
    /// Tree-sitter recovers from malformed input by inserting error nodes; a
    /// tree containing any is reported as a syntax error.
    pub fn parse_tree(&self, content: &str) -> Result<Tree, String> {
        let mut parser = TSParser::new();
        parser
            .set_language(&self.grammar)
            .map_err(|e| format!("Failed to set language: {}", e))?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| "Failed to parse content".to_string())?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error(root).map(|n| Self::node_line(&n)).unwrap_or(1);
            return Err(format!("syntax error near line {}", line));
        }

        Ok(tree)
    }

    /// Get text for a node from source content.
    pub fn node_text<'a>(node: &Node, content: &'a str) -> &'a str {
        content.get(node.byte_range()).unwrap_or("")
    }

    /// Get line number (1-based) for a node.
    pub fn node_line(node: &Node) -> u32 {
        node.start_position().row as u32 + 1
    }

    /// Get end line number (1-based) for a node.
    pub fn node_end_line(node: &Node) -> u32 {
        node.end_position().row as u32 + 1
    }

    /// Text of a named field, if present.
    pub fn field_text(node: &Node, field: &str, content: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|n| Self::node_text(&n, content).to_string())
    }

    /// First line of a declaration, without a trailing `{` or `:`.
    pub fn signature(node: &Node, content: &str) -> String {
        Self::node_text(node, content)
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .trim_end_matches('{')
            .trim_end_matches(':')
            .trim_end()
            .to_string()
    }

    /// Visit call-like nodes under `node` without entering nested scopes.
    ///
    /// `scopes` lists node kinds (nested functions, classes) whose bodies belong
    /// to a different entity.
    pub fn visit_calls<F>(node: &Node, scopes: &[&str], visit: &mut F)
    where
        F: FnMut(&Node),
    {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if scopes.contains(&child.kind()) {
                continue;
            }
            visit(&child);
            Self::visit_calls(&child, scopes, visit);
        }
    }
}

/// Depth-first search for the first error or missing node.
fn first_error<'a>(node: Node<'a>) -> Option<Node<'a>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'a>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error() || c.is_missing())
        .find_map(first_error)
}

/// Helper to extract doc comments from preceding sibling comment nodes.
pub fn extract_doc_comment(node: &Node, content: &str) -> Option<String> {
    let mut blocks = Vec::new();
    let mut sibling = node.prev_sibling();

    while let Some(s) = sibling {
        if !matches!(s.kind(), "comment" | "line_comment" | "block_comment") {
            break;
        }
        let text = TreeSitterParser::node_text(&s, content);
        let cleaned: Vec<&str> = text
            .lines()
            .map(|line| {
                line.trim()
                    .trim_start_matches("///")
                    .trim_start_matches("//")
                    .trim_start_matches("/**")
                    .trim_start_matches("/*")
                    .trim_end_matches("*/")
                    .trim_start_matches('*')
                    .trim_start_matches('#')
                    .trim()
            })
            .filter(|line| !line.is_empty())
            .collect();
        if !cleaned.is_empty() {
            blocks.push(cleaned.join("\n"));
        }
        sibling = s.prev_sibling();
    }

    if blocks.is_empty() {
        None
    } else {
        blocks.reverse();
        Some(blocks.join("\n"))
    }
}

/// Comment block at the top of a file, separated from the first
/// declaration by a blank line.
pub fn leading_comment(root: &Node, content: &str) -> Option<String> {
    let mut cursor = root.walk();
    let children: Vec<Node> = root.children(&mut cursor).collect();
    let first_code = children
        .iter()
        .position(|c| !matches!(c.kind(), "comment" | "line_comment" | "block_comment"))?;
    if first_code == 0 {
        return None;
    }
    let last_comment = children[first_code - 1];
    let next = children[first_code];
    if next.start_position().row <= last_comment.end_position().row + 1 {
        return None;
    }
    extract_doc_comment(&next, content)
}

/// Strip quotes and string prefixes from a string literal.
pub fn unquote(literal: &str) -> String {
    let body = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'", "`"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].trim().to_string();
        }
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote_variants() {
        assert_eq!(unquote("\"\"\"Doc string.\"\"\""), "Doc string.");
        assert_eq!(unquote("'single'"), "single");
        assert_eq!(unquote("r\"raw\""), "raw");
        assert_eq!(unquote("`/path`"), "/path");
    }

    #[test]
    fn test_parse_tree_reports_syntax_error() {
        let base = TreeSitterParser::new(
            tree_sitter_python::LANGUAGE.into(),
            Language::Python,
            &["py"],
        );
        assert!(base.parse_tree("def ok():\n    return 1\n").is_ok());
        let err = base.parse_tree("def broken(:\n    pass\n").unwrap_err();
        assert!(err.contains("syntax error"));
    }
}
