//! Read-side views of a stored graph.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ontology::{GraphEdge, GraphNode, HttpMethod, NodeKind};
use crate::repository::RepositoryId;

/// Full node/edge content of one graph generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub repository: RepositoryId,
    /// Generation counter; increases on every replace
    pub generation: u64,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Snapshot {
    /// Keep the first `limit` nodes and only the edges between them.
    pub fn limited(mut self, limit: usize) -> Self {
        if self.nodes.len() <= limit {
            return self;
        }
        self.nodes.truncate(limit);
        let kept: HashSet<String> = self
            .nodes
            .iter()
            .filter_map(|n| n.id().map(str::to_string))
            .collect();
        self.edges
            .retain(|e| kept.contains(e.from.as_str()) && kept.contains(e.to.as_str()));
        self
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id() == Some(id))
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind() == kind).count()
    }

    /// SHA-256 over sorted node ids and edges, hex encoded.
    ///
    /// Independent of the generation counter: two analyses of identical
    /// content have the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut ids: Vec<&str> = self.nodes.iter().filter_map(|n| n.id()).collect();
        ids.sort_unstable();
        let mut edges: Vec<&GraphEdge> = self.edges.iter().collect();
        edges.sort();

        let mut hasher = Sha256::new();
        for id in ids {
            hasher.update(id.as_bytes());
            hasher.update(b"\n");
        }
        for edge in edges {
            hasher.update(edge.relation_name().as_bytes());
            hasher.update(b" ");
            hasher.update(edge.from.as_bytes());
            hasher.update(b" ");
            hasher.update(edge.to.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    /// Visualization form.
    pub fn to_wire(&self) -> WireGraph {
        WireGraph {
            nodes: self.nodes.iter().map(WireNode::from).collect(),
            edges: self.edges.iter().map(WireEdge::from).collect(),
        }
    }
}

/// A node and everything directly connected to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub node: GraphNode,
    /// Adjacent nodes, in either direction, each once
    pub neighbors: Vec<GraphNode>,
    /// Connecting edges
    pub edges: Vec<GraphEdge>,
}

impl Neighborhood {
    pub fn to_wire(&self) -> WireGraph {
        WireGraph {
            nodes: std::iter::once(&self.node)
                .chain(&self.neighbors)
                .map(WireNode::from)
                .collect(),
            edges: self.edges.iter().map(WireEdge::from).collect(),
        }
    }
}

/// Module listing for architecture views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSummary {
    pub endpoint: String,
    pub method: HttpMethod,
}

/// Modules and APIs of the current generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureOverview {
    pub modules: Vec<ModuleSummary>,
    pub apis: Vec<ApiSummary>,
}

// =============================================================================
// Wire form for graph consumers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireGraph {
    pub nodes: Vec<WireNode>,
    pub edges: Vec<WireEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNode {
    pub id: String,
    pub label: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl From<&GraphNode> for WireNode {
    fn from(node: &GraphNode) -> Self {
        Self {
            id: node.id().unwrap_or_default().to_string(),
            label: node.label(),
            kind: node.type_name().to_string(),
            doc: node.doc().map(str::to_string),
        }
    }
}

/// Edge with upper-case relationship name in `rel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEdge {
    pub source: String,
    pub target: String,
    pub rel: String,
}

impl From<&GraphEdge> for WireEdge {
    fn from(edge: &GraphEdge) -> Self {
        Self {
            source: edge.from.clone(),
            target: edge.to.clone(),
            rel: edge.relation_name().to_string(),
        }
    }
}
