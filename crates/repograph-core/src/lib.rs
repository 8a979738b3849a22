pub mod config;
pub mod docs;
pub mod history;
pub mod job;
pub mod knowledge;
pub mod manager;
pub mod pipeline;
pub mod provider;
pub mod repository;

pub use config::Config;
pub use docs::{DocType, Document, DocumentStore, FileDocumentStore, MemoryDocumentStore};
pub use history::{CommitRecord, HistoryClassifier, IntentCategory};
pub use job::{AnalysisJob, JobError, JobOutcome, JobStage, JobState, JobStatus, JobType};
pub use knowledge::{GraphStore, KnowledgeError, MemoryGraphStore, Neighborhood, Snapshot};
pub use manager::{AnalysisManager, ManagerError};
pub use pipeline::AnalysisPipeline;
pub use provider::{ContentProvider, LocalProvider, MemoryProvider, ProviderError, SourceFile};
pub use repository::{Repository, RepositoryId, RepositoryStatus};
