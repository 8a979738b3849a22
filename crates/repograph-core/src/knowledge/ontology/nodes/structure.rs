//! Structure entity nodes: the Repository root and its Modules.
//!
//! These represent the organizational structure of a codebase.

use serde::{Deserialize, Serialize};

// =============================================================================
// LANGUAGE
// =============================================================================

/// Programming language of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    Java,
    JavaScript,
    Python,
    Rust,
    TypeScript,
}

impl Language {
    /// Every language with a parser, in alphabetical order.
    pub const ALL: [Language; 6] = [
        Language::Go,
        Language::Java,
        Language::JavaScript,
        Language::Python,
        Language::Rust,
        Language::TypeScript,
    ];

    /// Detect language from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" | "pyi" => Some(Self::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "ts" | "tsx" => Some(Self::TypeScript),
            "go" => Some(Self::Go),
            "java" => Some(Self::Java),
            "rs" => Some(Self::Rust),
            _ => None,
        }
    }

    /// Detect language from a file path.
    pub fn from_path(path: &str) -> Option<Self> {
        std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Lower-case name used in configuration and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Java => "java",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Rust => "rust",
            Self::TypeScript => "typescript",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Go => "Go",
            Self::Java => "Java",
            Self::JavaScript => "JavaScript",
            Self::Python => "Python",
            Self::Rust => "Rust",
            Self::TypeScript => "TypeScript",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    /// Accepts the canonical names plus common aliases and bare extensions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Self::Python),
            "javascript" | "js" => Ok(Self::JavaScript),
            "typescript" | "ts" => Ok(Self::TypeScript),
            "go" | "golang" => Ok(Self::Go),
            "java" => Ok(Self::Java),
            "rust" | "rs" => Ok(Self::Rust),
            other => Err(format!("unknown language: {}", other)),
        }
    }
}

// =============================================================================
// REPOSITORY ENTITY
// =============================================================================

/// The root node of one repository's graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEntity {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,

    /// Display name
    pub name: String,

    /// Source location (URL or local path)
    pub location: String,

    /// Analyzed branch
    pub branch: String,

    /// Dominant language, `None` when no file had a known language
    pub language: Option<Language>,
}

// =============================================================================
// MODULE ENTITY
// =============================================================================

/// A source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntity {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,

    /// Dotted module name derived from the path (e.g. "pkg.service")
    pub name: String,

    /// Path relative to the repository root
    pub file_path: String,

    /// Language the file was parsed as
    pub language: Language,

    /// Module-level docstring or leading doc comment
    pub doc_comment: Option<String>,

    /// Imported module paths, in source order
    #[serde(default)]
    pub imports: Vec<String>,

    /// SHA-256 of the file contents (hex)
    pub content_hash: String,

    /// Number of lines in the file
    pub lines: u32,
}

impl ModuleEntity {
    /// Derive a dotted module name from a file path: `pkg/service.py` → `pkg.service`.
    pub fn name_from_path(path: &str) -> String {
        let trimmed = path.trim_start_matches("./");
        let without_ext = match trimmed.rfind('.') {
            Some(dot) if dot > trimmed.rfind('/').map(|s| s + 1).unwrap_or(0) => &trimmed[..dot],
            _ => trimmed,
        };
        without_ext.replace(['/', '\\'], ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("PYI"), Some(Language::Python));
        assert_eq!(Language::from_extension("tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("cjs"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("rb"), None);
    }

    #[test]
    fn test_language_from_str_aliases() {
        assert_eq!("Python".parse::<Language>(), Ok(Language::Python));
        assert_eq!("golang".parse::<Language>(), Ok(Language::Go));
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn test_module_name_from_path() {
        assert_eq!(ModuleEntity::name_from_path("a.py"), "a");
        assert_eq!(ModuleEntity::name_from_path("pkg/service.py"), "pkg.service");
        assert_eq!(ModuleEntity::name_from_path("./src/lib.rs"), "src.lib");
        assert_eq!(ModuleEntity::name_from_path(".github/Makefile"), ".github.Makefile");
    }
}
