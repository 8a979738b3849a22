//! Core parser trait for language-agnostic entity extraction.

use super::result::ParseResult;
use crate::knowledge::ontology::Language;

/// Language-agnostic parser trait.
///
/// Implement this trait for each language to extract declared entities from
/// one source file. Each parser is responsible for:
///
/// 1. **Module metadata**: leading docstring and imports
/// 2. **Declarations**: classes and functions, methods qualified by their class
/// 3. **Call sites**: identifiers invoked from each function body
///
/// # Example Implementation
///
/// ```ignore
/// impl Parser for RustParser {
///     fn parse_file(&self, path: &str, content: &str) -> Result<ParseResult, String> {
///         let syntax = syn::parse_file(content).map_err(|e| e.to_string())?;
///         // Walk items...
///     }
///
///     fn language(&self) -> Language { Language::Rust }
///     fn supported_extensions(&self) -> &[&'static str] { &["rs"] }
/// }
/// ```
pub trait Parser: Send + Sync {
    /// Parse a source file and extract entities.
    ///
    /// # Arguments
    /// * `path` - Path relative to the repository root
    /// * `content` - Source code content
    ///
    /// # Returns
    /// * `Ok(ParseResult)` - Extracted entities
    /// * `Err(String)` - The file is syntactically malformed
    fn parse_file(&self, path: &str, content: &str) -> Result<ParseResult, String>;

    /// Language this parser handles.
    fn language(&self) -> Language;

    /// File extensions this parser handles.
    fn supported_extensions(&self) -> &[&'static str];
}
