//! Language-agnostic parsing infrastructure for entity extraction.
//!
//! Provides a `Parser` trait for extracting modules, classes and functions from
//! source code, with implementations for Rust (syn) and Python,
//! TypeScript/JavaScript, Go and Java (tree-sitter).
//!
//! ## Components
//!
//! - `Parser` trait - Common interface for all language parsers
//! - `ParserRegistry` - Maps file extensions and languages to parsers
//! - `ParseResult` - Extracted entities for one file
//!
//! A file whose tree contains syntax errors is rejected as a whole rather than
//! partially extracted.

mod go;
mod java;
mod python;
mod registry;
mod result;
mod rust;
mod traits;
mod treesitter;
mod typescript;

pub use go::GoParser;
pub use java::JavaParser;
pub use python::PythonParser;
pub use registry::ParserRegistry;
pub use result::{ParseResult, ParseStats};
pub use rust::RustParser;
pub use traits::Parser;
pub use typescript::TypeScriptParser;
