//! Code entity nodes: Classes and Functions.
//!
//! These represent the declarations recovered from a parsed module.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// =============================================================================
// FUNCTION ENTITY
// =============================================================================

/// A function or method in the codebase.
///
/// Identity within a repository is `(file_path, qualified_name)`. Methods carry
/// their owning class in `parent` and are qualified as `Class.method`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEntity {
    /// Unique identifier (e.g., "function:repo:src/app.py:Service.run")
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,

    /// Function name
    pub name: String,

    /// Name qualified by enclosing classes (e.g., "Service.run")
    pub qualified_name: String,

    /// File containing this function (the owning module's path)
    pub file_path: String,

    /// Start line number
    pub start_line: u32,

    /// End line number
    pub end_line: u32,

    /// First line of the declaration
    pub signature: String,

    /// Enclosing class if this is a method
    pub parent: Option<String>,

    /// Parameters in declaration order
    pub parameters: Vec<Parameter>,

    /// Return annotation when the language has one
    pub return_type: Option<String>,

    /// Documentation comment or docstring
    pub doc_comment: Option<String>,

    /// Whether the function is async
    pub is_async: bool,

    /// Decorators, annotations or attributes (without `@`/`#[]`)
    #[serde(default)]
    pub decorators: Vec<String>,

    /// Identifiers syntactically invoked from the body
    #[serde(default, skip_serializing)]
    pub calls: BTreeSet<String>,
}

impl FunctionEntity {
    pub fn new(name: impl Into<String>, file_path: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: None,
            qualified_name: name.clone(),
            name,
            file_path: file_path.into(),
            start_line: 0,
            end_line: 0,
            signature: String::new(),
            parent: None,
            parameters: Vec::new(),
            return_type: None,
            doc_comment: None,
            is_async: false,
            decorators: Vec::new(),
            calls: BTreeSet::new(),
        }
    }

    /// Mark this function as a method of `class`.
    pub fn with_parent(mut self, class: &str) -> Self {
        self.qualified_name = format!("{}.{}", class, self.name);
        self.parent = Some(class.to_string());
        self
    }

    pub fn at_lines(mut self, start: u32, end: u32) -> Self {
        self.start_line = start;
        self.end_line = end;
        self
    }

    /// Ordered parameter names.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            type_name,
        }
    }
}

// =============================================================================
// CLASS ENTITY
// =============================================================================

/// A class-like declaration: class, struct, interface, trait or enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassEntity {
    /// Unique identifier
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,

    /// Class name
    pub name: String,

    /// Name qualified by enclosing classes (e.g., "Outer.Inner")
    pub qualified_name: String,

    /// File containing this class
    pub file_path: String,

    /// Start line number
    pub start_line: u32,

    /// End line number
    pub end_line: u32,

    /// Declaration flavour
    pub kind: ClassKind,

    /// Base classes, superclass and implemented interfaces
    #[serde(default)]
    pub bases: Vec<String>,

    /// Method names in declaration order
    #[serde(default)]
    pub methods: Vec<String>,

    /// Documentation comment or docstring
    pub doc_comment: Option<String>,
}

impl ClassEntity {
    pub fn new(name: impl Into<String>, file_path: impl Into<String>, kind: ClassKind) -> Self {
        let name = name.into();
        Self {
            id: None,
            qualified_name: name.clone(),
            name,
            file_path: file_path.into(),
            start_line: 0,
            end_line: 0,
            kind,
            bases: Vec::new(),
            methods: Vec::new(),
            doc_comment: None,
        }
    }

    pub fn at_lines(mut self, start: u32, end: u32) -> Self {
        self.start_line = start;
        self.end_line = end;
        self
    }
}

/// Flavour of a class-like declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    #[default]
    Class,
    Struct,
    Interface,
    Trait,
    Enum,
}
