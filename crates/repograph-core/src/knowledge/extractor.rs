//! Per-file entity extraction.
//!
//! Turns one source file into a module record plus the classes and functions
//! it declares. Files in languages without a parser produce nothing; files
//! that fail to parse are reported as skipped, never as errors.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::ontology::{ClassEntity, FunctionEntity, Language, ModuleEntity};
use super::parser::{Parser, ParserRegistry};
use crate::provider::SourceFile;

/// Entities extracted from one file.
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    pub module: ModuleEntity,
    pub classes: Vec<ClassEntity>,
    pub functions: Vec<FunctionEntity>,
    pub warnings: Vec<String>,
}

/// A file left out of the graph because it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Outcome of extracting one file.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// Parsed successfully.
    Extracted(ExtractedFile),
    /// No parser for the file's language.
    Unsupported,
    /// Malformed source; the file is skipped.
    Skipped(SkippedFile),
}

/// Parses source files into entity records.
pub struct EntityExtractor {
    registry: ParserRegistry,
}

impl EntityExtractor {
    /// Create an extractor with all built-in parsers.
    pub fn new() -> Self {
        Self::with_registry(ParserRegistry::new())
    }

    pub fn with_registry(registry: ParserRegistry) -> Self {
        Self { registry }
    }

    /// Pick the parser for a file.
    ///
    /// The provider-detected language wins, then the extension. The
    /// repository's dominant language is only a guess for files without any
    /// extension; the returned flag marks that guess.
    fn select_parser(
        &self,
        file: &SourceFile,
        dominant: Option<Language>,
    ) -> Option<(Arc<dyn Parser>, bool)> {
        if let Some(language) = file.language {
            return self.registry.parser_for_language(language).map(|p| (p, false));
        }
        if let Some(parser) = self.registry.parser_for_path(&file.path) {
            return Some((parser, false));
        }
        let has_extension = std::path::Path::new(&file.path).extension().is_some();
        match dominant {
            Some(language) if !has_extension => {
                self.registry.parser_for_language(language).map(|p| (p, true))
            }
            _ => None,
        }
    }

    /// Extract entities from one file.
    pub fn extract(&self, file: &SourceFile, dominant: Option<Language>) -> FileOutcome {
        let Some((parser, guessed)) = self.select_parser(file, dominant) else {
            debug!(path = %file.path, "no parser for file");
            return FileOutcome::Unsupported;
        };

        let mut parsed = match parser.parse_file(&file.path, &file.content) {
            Ok(parsed) => parsed,
            // A failed guess says nothing about the file's health.
            Err(_) if guessed => return FileOutcome::Unsupported,
            Err(reason) => {
                debug!(path = %file.path, %reason, "parse failed");
                return FileOutcome::Skipped(SkippedFile {
                    path: file.path.clone(),
                    reason,
                });
            }
        };
        parsed.merge_duplicate_functions();

        let stats = parsed.stats();
        debug!(
            path = %file.path,
            language = %parsed.language,
            classes = stats.classes,
            functions = stats.functions,
            methods = stats.methods,
            call_sites = stats.call_sites,
            "extracted file"
        );

        let module = ModuleEntity {
            id: None,
            name: ModuleEntity::name_from_path(&file.path),
            file_path: file.path.clone(),
            language: parsed.language,
            doc_comment: parsed.module_doc,
            imports: parsed.imports,
            content_hash: content_hash(&file.content),
            lines: file.content.lines().count() as u32,
        };

        FileOutcome::Extracted(ExtractedFile {
            module,
            classes: parsed.classes,
            functions: parsed.functions,
            warnings: parsed.warnings,
        })
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of file contents, hex encoded.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Language with the most files, ties broken by name. Files without a known
/// language do not count.
pub fn dominant_language(files: &[SourceFile]) -> Option<Language> {
    let mut counts: BTreeMap<Language, usize> = BTreeMap::new();
    for file in files {
        if let Some(language) = file.language.or_else(|| Language::from_path(&file.path)) {
            *counts.entry(language).or_default() += 1;
        }
    }
    // BTreeMap iterates alphabetically; keep the first of equal counts.
    counts
        .into_iter()
        .fold(None, |best: Option<(Language, usize)>, (language, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((language, count)),
        })
        .map(|(language, _)| language)
}
