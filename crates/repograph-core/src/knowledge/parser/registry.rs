//! Parser registry for managing language-specific parsers.

use std::collections::HashMap;
use std::sync::Arc;

use super::go::GoParser;
use super::java::JavaParser;
use super::python::PythonParser;
use super::rust::RustParser;
use super::traits::Parser;
use super::typescript::TypeScriptParser;
use crate::knowledge::ontology::Language;

/// Registry of language parsers.
///
/// Maps file extensions to their respective parsers.
/// Automatically registers all built-in parsers on creation.
pub struct ParserRegistry {
    /// Extension to parser mapping.
    parsers: HashMap<String, Arc<dyn Parser>>,
}

impl ParserRegistry {
    /// Create a new registry with all built-in parsers.
    pub fn new() -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
        };

        // Register built-in parsers
        registry.register(Arc::new(RustParser::new()));
        registry.register(Arc::new(TypeScriptParser::typescript()));
        registry.register(Arc::new(TypeScriptParser::tsx()));
        registry.register(Arc::new(TypeScriptParser::javascript()));
        registry.register(Arc::new(PythonParser::new()));
        registry.register(Arc::new(GoParser::new()));
        registry.register(Arc::new(JavaParser::new()));

        registry
    }

    /// Register a parser for its supported extensions.
    pub fn register(&mut self, parser: Arc<dyn Parser>) {
        for ext in parser.supported_extensions() {
            self.parsers.insert(ext.to_lowercase(), Arc::clone(&parser));
        }
    }

    /// Get a parser for the given file extension.
    pub fn parser_for_extension(&self, extension: &str) -> Option<Arc<dyn Parser>> {
        self.parsers.get(&extension.to_lowercase()).cloned()
    }

    /// Get a parser for the given file path.
    pub fn parser_for_path(&self, path: &str) -> Option<Arc<dyn Parser>> {
        std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| self.parser_for_extension(ext))
    }

    /// Get the canonical parser for a language.
    ///
    /// Used when a file's extension is unknown but its language was detected
    /// by the content provider or inferred for the repository.
    pub fn parser_for_language(&self, language: Language) -> Option<Arc<dyn Parser>> {
        let ext = match language {
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::TypeScript => "ts",
            Language::Go => "go",
            Language::Java => "java",
            Language::Rust => "rs",
        };
        self.parser_for_extension(ext)
    }

    /// Languages with at least one registered parser, sorted.
    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.parsers.values().map(|p| p.language()).collect();
        languages.sort();
        languages.dedup();
        languages
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
