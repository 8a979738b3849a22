//! Documents derived from a completed graph.
//!
//! The [`DocumentSynthesizer`] renders the four document types from a graph
//! snapshot and classified history; a [`DocumentStore`] keeps the current set
//! per repository, replaced wholesale on every regeneration.

mod document;
mod error;
mod file;
mod memory;
mod synthesizer;

pub use document::{DocType, Document};
pub use error::DocumentStoreError;
pub use file::FileDocumentStore;
pub use memory::MemoryDocumentStore;
pub use synthesizer::{
    architecture_confidence, changelog_confidence, comprehensive_confidence, DocumentSynthesizer,
    SynthesisInput,
};

use async_trait::async_trait;

use crate::repository::RepositoryId;

/// Trait for document storage backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Replace every document of a repository with `documents`.
    async fn replace(&self, repository: &RepositoryId, documents: Vec<Document>) -> Result<(), DocumentStoreError>;

    /// The current document of one type.
    async fn get(&self, repository: &RepositoryId, doc_type: DocType) -> Result<Option<Document>, DocumentStoreError>;

    /// All current documents of a repository, ordered by type.
    async fn list(&self, repository: &RepositoryId) -> Result<Vec<Document>, DocumentStoreError>;

    /// Drop a repository's documents. Returns whether any existed.
    async fn remove(&self, repository: &RepositoryId) -> Result<bool, DocumentStoreError>;
}
