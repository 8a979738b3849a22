//! Knowledge Graph Ontology
//!
//! Defines the schema for a repository's knowledge graph. The node and edge
//! kinds here are the wire contract for graph consumers and stay stable across
//! analysis runs.
//!
//! ## Modules
//!
//! - `nodes/` - Entity types: Structure (Repository, Module), Code (Class,
//!   Function), API (Api), Feature (synthetic grouping)
//! - `edges/` - Relationship types: CONTAINS, DEFINES, CALLS, EXPOSES,
//!   HAS_FEATURE, INCLUDES
//!
//! ## Identifiers
//!
//! Every node id starts with its kind and the owning repository id, so the
//! repository of any node can be recovered from the id alone:
//!
//! - `repository:<repo>`
//! - `module:<repo>:<path>`
//! - `class:<repo>:<path>:<qualified name>`
//! - `function:<repo>:<path>:<qualified name>`
//! - `api:<repo>:<path>:<VERB>:<endpoint>`
//! - `feature:<repo>:<label>`

pub mod edges;
pub mod nodes;

pub use edges::*;
pub use nodes::*;

use crate::repository::RepositoryId;

/// Stable identifier construction for graph nodes.
pub struct NodeId;

impl NodeId {
    pub fn repository(repo: &RepositoryId) -> String {
        format!("repository:{}", repo)
    }

    pub fn module(repo: &RepositoryId, path: &str) -> String {
        format!("module:{}:{}", repo, path)
    }

    pub fn class(repo: &RepositoryId, path: &str, qualified_name: &str) -> String {
        format!("class:{}:{}:{}", repo, path, qualified_name)
    }

    pub fn function(repo: &RepositoryId, path: &str, qualified_name: &str) -> String {
        format!("function:{}:{}:{}", repo, path, qualified_name)
    }

    pub fn api(repo: &RepositoryId, path: &str, method: HttpMethod, endpoint: &str) -> String {
        format!("api:{}:{}:{}:{}", repo, path, method, endpoint)
    }

    pub fn feature(repo: &RepositoryId, label: &str) -> String {
        format!("feature:{}:{}", repo, label)
    }

    /// Recover the owning repository from a node id.
    ///
    /// Returns `None` for ids that do not follow the `<kind>:<repo>` layout.
    pub fn repository_of(node_id: &str) -> Option<RepositoryId> {
        let mut parts = node_id.splitn(3, ':');
        let kind = parts.next()?;
        if NodeKind::from_prefix(kind).is_none() {
            return None;
        }
        let repo = parts.next()?;
        RepositoryId::new(repo).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_of_round_trips_every_kind() {
        let repo = RepositoryId::new("acme").unwrap();
        let ids = [
            NodeId::repository(&repo),
            NodeId::module(&repo, "src/app.py"),
            NodeId::class(&repo, "src/app.py", "Service"),
            NodeId::function(&repo, "src/app.py", "Service.run"),
            NodeId::api(&repo, "src/app.py", HttpMethod::Get, "/users/{id}"),
            NodeId::feature(&repo, "Authentication"),
        ];

        for id in ids {
            assert_eq!(NodeId::repository_of(&id), Some(repo.clone()), "{}", id);
        }
    }

    #[test]
    fn test_repository_of_rejects_unknown_layout() {
        assert!(NodeId::repository_of("nonsense").is_none());
        assert!(NodeId::repository_of("widget:acme:x").is_none());
        assert!(NodeId::repository_of("module:").is_none());
    }
}
