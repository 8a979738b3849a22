//! Knowledge graph construction and storage.
//!
//! Turns repository content into a typed graph of modules, classes,
//! functions, APIs and features, and keeps one authoritative graph per
//! repository.
//!
//! # Components
//!
//! - [`EntityExtractor`] - Parses one file into module, class and function entities
//! - [`CallGraphBuilder`] - Name-based CALLS edges between extracted functions
//! - [`FeatureClassifier`] - Keyword groupings driven by a versioned rule table
//! - [`ApiDetector`] - Pattern-based endpoint detection
//! - [`GraphBuilder`] - Assigns ids and materializes nodes and edges
//! - [`GraphStore`] - Atomic per-repository replacement, snapshots and neighbor queries
//!
//! # Example
//!
//! ```ignore
//! use repograph_core::knowledge::{GraphStore, MemoryGraphStore};
//!
//! let store = MemoryGraphStore::new();
//! store.replace(&repo_id, content).await?;
//! let hood = store.neighbors("function:acme:app.py:main").await?;
//! ```

pub mod api;
mod builder;
mod callgraph;
mod error;
mod extractor;
mod features;
pub mod ontology;
pub mod parser;
mod snapshot;
mod store;

pub use api::{ApiDetector, ApiSource, API_RULES_VERSION};
pub use builder::{GraphBuilder, GraphContent};
pub use callgraph::{CallGraphBuilder, CallLink, FunctionKey};
pub use error::KnowledgeError;
pub use extractor::{
    content_hash, dominant_language, EntityExtractor, ExtractedFile, FileOutcome, SkippedFile,
};
pub use features::{FeatureClassifier, FeatureGroup, FeatureRule, FeatureRules, FEATURE_RULES_VERSION};
pub use ontology::{
    ApiEntity, ApiType, ClassEntity, ClassKind, FeatureEntity, FunctionEntity, GraphEdge, GraphNode, HttpMethod,
    Language, ModuleEntity, NodeId, NodeKind, Parameter, Relation, RepositoryEntity,
};
pub use snapshot::{
    ApiSummary, ArchitectureOverview, ModuleSummary, Neighborhood, Snapshot, WireEdge, WireGraph,
    WireNode,
};
pub use store::{GraphGeneration, GraphStore, MemoryGraphStore};
