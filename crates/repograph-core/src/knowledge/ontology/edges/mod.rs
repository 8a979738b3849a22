//! Edge types (relationships) for the knowledge graph.
//!
//! Edges are typed and directed:
//!
//! - **Structural**: CONTAINS (Repository→Module), DEFINES (Module→Class, Module→Function)
//! - **Behavioral**: CALLS (Function→Function, one per ordered pair)
//! - **API**: EXPOSES (Repository→API)
//! - **Feature**: HAS_FEATURE (Repository→Feature), INCLUDES (Feature→Function)

use serde::{Deserialize, Serialize};

use super::NodeKind;

/// Relationship kind.
///
/// Declaration order is the canonical edge ordering in a graph generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    Contains,
    Defines,
    Calls,
    Exposes,
    HasFeature,
    Includes,
}

impl Relation {
    /// Get the relationship name for display.
    pub fn relation_name(&self) -> &'static str {
        match self {
            Self::Contains => "CONTAINS",
            Self::Defines => "DEFINES",
            Self::Calls => "CALLS",
            Self::Exposes => "EXPOSES",
            Self::HasFeature => "HAS_FEATURE",
            Self::Includes => "INCLUDES",
        }
    }

    /// Whether an edge of this kind may connect the given endpoint kinds.
    pub fn allows(&self, from: NodeKind, to: NodeKind) -> bool {
        matches!(
            (self, from, to),
            (Self::Contains, NodeKind::Repository, NodeKind::Module)
                | (Self::Defines, NodeKind::Module, NodeKind::Class)
                | (Self::Defines, NodeKind::Module, NodeKind::Function)
                | (Self::Calls, NodeKind::Function, NodeKind::Function)
                | (Self::Exposes, NodeKind::Repository, NodeKind::Api)
                | (Self::HasFeature, NodeKind::Repository, NodeKind::Feature)
                | (Self::Includes, NodeKind::Feature, NodeKind::Function)
        )
    }

    /// Relations that make a node reachable from the repository root.
    pub fn is_ownership(&self) -> bool {
        !matches!(self, Self::Calls)
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.relation_name())
    }
}

/// A directed, typed edge between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Relationship kind
    #[serde(rename = "edge_type")]
    pub relation: Relation,
    /// Source node ID
    pub from: String,
    /// Target node ID
    pub to: String,
}

impl GraphEdge {
    pub fn new(relation: Relation, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            relation,
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn contains(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(Relation::Contains, from, to)
    }

    pub fn defines(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(Relation::Defines, from, to)
    }

    pub fn calls(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(Relation::Calls, from, to)
    }

    pub fn exposes(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(Relation::Exposes, from, to)
    }

    pub fn has_feature(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(Relation::HasFeature, from, to)
    }

    pub fn includes(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(Relation::Includes, from, to)
    }

    /// Get the relationship name for display.
    pub fn relation_name(&self) -> &'static str {
        self.relation.relation_name()
    }

    /// The endpoint opposite to `node_id`, if the edge touches it.
    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.from == node_id {
            Some(&self.to)
        } else if self.to == node_id {
            Some(&self.from)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_schema() {
        assert!(Relation::Calls.allows(NodeKind::Function, NodeKind::Function));
        assert!(Relation::Defines.allows(NodeKind::Module, NodeKind::Class));
        assert!(!Relation::Includes.allows(NodeKind::Feature, NodeKind::Class));
        assert!(!Relation::Contains.allows(NodeKind::Module, NodeKind::Function));
    }

    #[test]
    fn test_edge_serializes_relation_upper_case() {
        let edge = GraphEdge::has_feature("repository:r", "feature:r:Caching");
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["edge_type"], "HAS_FEATURE");
        assert_eq!(edge.other_end("feature:r:Caching"), Some("repository:r"));
    }
}
