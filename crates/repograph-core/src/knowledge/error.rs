//! Knowledge graph error types.

use thiserror::Error;

use super::ontology::Relation;
use crate::repository::RepositoryId;

/// Errors that can occur in the knowledge graph.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Node id does not exist in any current graph.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// No graph has been stored for the repository.
    #[error("No graph for repository: {0}")]
    GraphNotFound(RepositoryId),

    /// A node was submitted without an id.
    #[error("Node without id: {0}")]
    MissingId(String),

    /// Two nodes share an id.
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    /// A node id belongs to another repository.
    #[error("Node {node} does not belong to repository {repository}")]
    ForeignNode {
        node: String,
        repository: RepositoryId,
    },

    /// The repository root node is missing from a graph.
    #[error("Graph for {0} has no repository root")]
    MissingRoot(RepositoryId),

    /// A node is not reachable from the repository root.
    #[error("Orphan node: {0}")]
    OrphanNode(String),

    /// An edge references a node that is not part of the graph.
    #[error("Dangling {relation} edge {from} -> {to}")]
    DanglingEdge {
        relation: Relation,
        from: String,
        to: String,
    },

    /// An edge connects node kinds its relation does not allow.
    #[error("Invalid {relation} edge {from} -> {to}")]
    InvalidEdge {
        relation: Relation,
        from: String,
        to: String,
    },

    /// The backing store cannot be reached.
    #[error("Graph store unavailable: {0}")]
    Unavailable(String),
}
