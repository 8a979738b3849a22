//! Parse result types containing extracted entities.

use crate::knowledge::ontology::{ClassEntity, FunctionEntity, Language};

/// Result of parsing a source file.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// File path that was parsed.
    pub file_path: String,

    /// Language the file was parsed as.
    pub language: Language,

    /// Module-level docstring or leading doc comment.
    pub module_doc: Option<String>,

    /// Imported modules, in source order.
    pub imports: Vec<String>,

    /// Class-like declarations.
    pub classes: Vec<ClassEntity>,

    /// Functions and methods.
    pub functions: Vec<FunctionEntity>,

    /// Parse warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

impl ParseResult {
    /// Create a new parse result for the given file.
    pub fn new(file_path: impl Into<String>, language: Language) -> Self {
        Self {
            file_path: file_path.into(),
            language,
            module_doc: None,
            imports: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add a class entity.
    pub fn add_class(&mut self, class: ClassEntity) {
        self.classes.push(class);
    }

    /// Add a function entity.
    pub fn add_function(&mut self, func: FunctionEntity) {
        self.functions.push(func);
    }

    /// Record an import, ignoring duplicates.
    pub fn add_import(&mut self, import: impl Into<String>) {
        let import = import.into();
        if !import.is_empty() && !self.imports.contains(&import) {
            self.imports.push(import);
        }
    }

    /// Add a parse warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Merge functions sharing a qualified name (redefinitions, overloads).
    ///
    /// The first declaration wins; call sites of later ones are folded into it.
    pub fn merge_duplicate_functions(&mut self) {
        let mut merged: Vec<FunctionEntity> = Vec::with_capacity(self.functions.len());
        for func in std::mem::take(&mut self.functions) {
            match merged
                .iter_mut()
                .find(|f| f.qualified_name == func.qualified_name)
            {
                Some(existing) => {
                    existing.calls.extend(func.calls);
                    self.warnings.push(format!(
                        "duplicate definition of {} at line {}",
                        func.qualified_name, func.start_line
                    ));
                }
                None => merged.push(func),
            }
        }
        self.functions = merged;

        let mut seen = std::collections::HashSet::new();
        self.classes.retain(|c| seen.insert(c.qualified_name.clone()));
    }

    /// Fill each class's method list from functions declaring it as parent.
    ///
    /// For languages where methods live outside the type body (Go receivers,
    /// Rust impl blocks).
    pub fn attach_methods(&mut self) {
        for class in &mut self.classes {
            for func in &self.functions {
                if func.parent.as_deref() == Some(class.qualified_name.as_str())
                    && !class.methods.contains(&func.name)
                {
                    class.methods.push(func.name.clone());
                }
            }
        }
    }

    /// Get statistics about the parse result.
    pub fn stats(&self) -> ParseStats {
        ParseStats {
            classes: self.classes.len(),
            functions: self.functions.len(),
            methods: self.functions.iter().filter(|f| f.parent.is_some()).count(),
            call_sites: self.functions.iter().map(|f| f.calls.len()).sum(),
            imports: self.imports.len(),
            warnings: self.warnings.len(),
        }
    }
}

/// Statistics about a parse result.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseStats {
    pub classes: usize,
    pub functions: usize,
    pub methods: usize,
    pub call_sites: usize,
    pub imports: usize,
    pub warnings: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_duplicate_functions_keeps_first() {
        let mut result = ParseResult::new("a.py", Language::Python);
        let mut first = FunctionEntity::new("run", "a.py").at_lines(1, 3);
        first.calls.insert("setup".to_string());
        let mut second = FunctionEntity::new("run", "a.py").at_lines(5, 8);
        second.calls.insert("teardown".to_string());
        result.add_function(first);
        result.add_function(second);

        result.merge_duplicate_functions();

        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].start_line, 1);
        assert!(result.functions[0].calls.contains("teardown"));
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_imports_are_deduplicated() {
        let mut result = ParseResult::new("a.py", Language::Python);
        result.add_import("os");
        result.add_import("os");
        result.add_import("");
        assert_eq!(result.imports, vec!["os".to_string()]);
        assert_eq!(result.stats().imports, 1);
    }
}
