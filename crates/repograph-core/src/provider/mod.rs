//! Repository content providers.
//!
//! A provider supplies the raw material of an analysis: every source file with
//! its text, and the commit log. Cloning and checkout are the provider's
//! business; the rest of the crate only sees [`SourceFile`]s and
//! [`CommitRecord`]s.

mod error;
mod local;
mod memory;

pub use error::ProviderError;
pub use local::LocalProvider;
pub use memory::{MemoryProvider, ProviderFailure};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use crate::history::CommitRecord;
use crate::knowledge::Language;
use crate::repository::Repository;

/// One file of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    pub content: String,
    /// Language detected by the provider, if any
    pub language: Option<Language>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            language: None,
        }
    }

    /// Same as [`SourceFile::new`] with the language taken from the extension.
    pub fn detected(path: impl Into<String>, content: impl Into<String>) -> Self {
        let mut file = Self::new(path, content);
        file.language = Language::from_path(&file.path);
        file
    }
}

/// Source of repository files and history.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// All files of the repository at its configured branch.
    async fn list_files(&self, repository: &Repository) -> Result<Vec<SourceFile>, ProviderError>;

    /// Commits, most recent first.
    async fn commit_log(&self, repository: &Repository) -> Result<Vec<CommitRecord>, ProviderError>;
}
