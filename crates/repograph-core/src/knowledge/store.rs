//! Graph storage with atomic per-repository replacement.
//!
//! Each repository's graph lives in an immutable [`GraphGeneration`]: an arena
//! of nodes addressed by slot, an id → slot index and per-slot adjacency lists.
//! A replace builds and validates the next generation off to the side, then
//! swaps the `Arc` under the map's shard lock. Readers clone the `Arc` and
//! work on a generation that can no longer change, so they see either the old
//! graph or the new one in full.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use super::builder::GraphContent;
use super::error::KnowledgeError;
use super::ontology::{GraphEdge, GraphNode, NodeId};
use super::snapshot::{ApiSummary, ArchitectureOverview, ModuleSummary, Neighborhood, Snapshot};
use crate::repository::RepositoryId;

/// Authoritative store of knowledge graphs.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Swap the repository's graph for `content`. Returns the new generation.
    ///
    /// Content is validated first; on error the previous graph is untouched.
    async fn replace(&self, repository: &RepositoryId, content: GraphContent) -> Result<u64, KnowledgeError>;

    /// Current graph of a repository.
    async fn snapshot(&self, repository: &RepositoryId) -> Result<Snapshot, KnowledgeError>;

    /// Nodes adjacent to `node_id` in either direction, with connecting edges.
    async fn neighbors(&self, node_id: &str) -> Result<Neighborhood, KnowledgeError>;

    /// Modules and APIs of the current graph.
    async fn architecture_overview(&self, repository: &RepositoryId) -> Result<ArchitectureOverview, KnowledgeError>;

    /// Drop a repository's graph. Returns whether one existed.
    async fn remove(&self, repository: &RepositoryId) -> Result<bool, KnowledgeError>;
}

/// One immutable, validated graph.
#[derive(Debug)]
pub struct GraphGeneration {
    repository: RepositoryId,
    generation: u64,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    index: HashMap<String, usize>,
    /// Edge indices touching each node slot
    adjacency: Vec<Vec<usize>>,
}

impl GraphGeneration {
    /// Validate `content` and index it.
    ///
    /// Rejects nodes without ids, duplicate ids, nodes of another repository,
    /// dangling or schema-violating edges, a missing root and orphans.
    /// Repeated edges are kept once.
    pub fn build(repository: &RepositoryId, content: GraphContent) -> Result<Self, KnowledgeError> {
        let GraphContent { nodes, edges } = content;

        let mut index = HashMap::with_capacity(nodes.len());
        for (slot, node) in nodes.iter().enumerate() {
            let id = node
                .id()
                .ok_or_else(|| KnowledgeError::MissingId(node.name().to_string()))?;
            if NodeId::repository_of(id).as_ref() != Some(repository) {
                return Err(KnowledgeError::ForeignNode {
                    node: id.to_string(),
                    repository: repository.clone(),
                });
            }
            if index.insert(id.to_string(), slot).is_some() {
                return Err(KnowledgeError::DuplicateNode(id.to_string()));
            }
        }

        let mut seen = HashSet::with_capacity(edges.len());
        let mut kept = Vec::with_capacity(edges.len());
        let mut adjacency = vec![Vec::new(); nodes.len()];
        for edge in edges {
            let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) else {
                return Err(KnowledgeError::DanglingEdge {
                    relation: edge.relation,
                    from: edge.from,
                    to: edge.to,
                });
            };
            if !edge.relation.allows(nodes[from].kind(), nodes[to].kind()) {
                return Err(KnowledgeError::InvalidEdge {
                    relation: edge.relation,
                    from: edge.from,
                    to: edge.to,
                });
            }
            if !seen.insert(edge.clone()) {
                continue;
            }
            let edge_index = kept.len();
            adjacency[from].push(edge_index);
            if to != from {
                adjacency[to].push(edge_index);
            }
            kept.push(edge);
        }

        let generation = Self {
            repository: repository.clone(),
            generation: 0,
            nodes,
            edges: kept,
            index,
            adjacency,
        };
        generation.check_reachability()?;
        Ok(generation)
    }

    /// Every node must hang off the root through ownership edges.
    fn check_reachability(&self) -> Result<(), KnowledgeError> {
        let root = NodeId::repository(&self.repository);
        let Some(&root_slot) = self.index.get(&root) else {
            return Err(KnowledgeError::MissingRoot(self.repository.clone()));
        };

        let mut reached = vec![false; self.nodes.len()];
        reached[root_slot] = true;
        let mut queue = VecDeque::from([root_slot]);
        while let Some(slot) = queue.pop_front() {
            for &edge_index in &self.adjacency[slot] {
                let edge = &self.edges[edge_index];
                if !edge.relation.is_ownership() || self.index.get(&edge.from) != Some(&slot) {
                    continue;
                }
                if let Some(&next) = self.index.get(&edge.to) {
                    if !reached[next] {
                        reached[next] = true;
                        queue.push_back(next);
                    }
                }
            }
        }

        match reached.iter().position(|r| !r) {
            Some(slot) => Err(KnowledgeError::OrphanNode(
                self.nodes[slot].id().unwrap_or_default().to_string(),
            )),
            None => Ok(()),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&slot| &self.nodes[slot])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            repository: self.repository.clone(),
            generation: self.generation,
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    fn neighborhood(&self, node_id: &str) -> Option<Neighborhood> {
        let slot = *self.index.get(node_id)?;
        let mut seen = HashSet::new();
        let mut neighbors = Vec::new();
        let mut edges = Vec::new();

        for &edge_index in &self.adjacency[slot] {
            let edge = &self.edges[edge_index];
            edges.push(edge.clone());
            if let Some(other) = edge.other_end(node_id) {
                if other != node_id && seen.insert(other) {
                    if let Some(node) = self.node(other) {
                        neighbors.push(node.clone());
                    }
                }
            }
        }

        Some(Neighborhood {
            node: self.nodes[slot].clone(),
            neighbors,
            edges,
        })
    }

    fn overview(&self) -> ArchitectureOverview {
        let mut overview = ArchitectureOverview::default();
        for node in &self.nodes {
            match node {
                GraphNode::Module(m) => overview.modules.push(ModuleSummary {
                    name: m.name.clone(),
                    path: m.file_path.clone(),
                }),
                GraphNode::Api(a) => overview.apis.push(ApiSummary {
                    endpoint: a.endpoint.clone(),
                    method: a.method,
                }),
                _ => {}
            }
        }
        overview
    }
}

/// In-process [`GraphStore`].
///
/// Repositories live in separate map shards, so work on different
/// repositories does not contend.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    graphs: DashMap<RepositoryId, Arc<GraphGeneration>>,
    unavailable: AtomicBool,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes fail with [`KnowledgeError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Current generation of a repository, shared.
    pub fn current(&self, repository: &RepositoryId) -> Option<Arc<GraphGeneration>> {
        self.graphs.get(repository).map(|g| Arc::clone(g.value()))
    }

    fn require(&self, repository: &RepositoryId) -> Result<Arc<GraphGeneration>, KnowledgeError> {
        self.current(repository)
            .ok_or_else(|| KnowledgeError::GraphNotFound(repository.clone()))
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn replace(&self, repository: &RepositoryId, content: GraphContent) -> Result<u64, KnowledgeError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(KnowledgeError::Unavailable("graph store is not accepting writes".into()));
        }

        let mut next = GraphGeneration::build(repository, content)?;
        let generation = match self.graphs.entry(repository.clone()) {
            Entry::Occupied(mut current) => {
                next.generation = current.get().generation + 1;
                let generation = next.generation;
                current.insert(Arc::new(next));
                generation
            }
            Entry::Vacant(slot) => {
                next.generation = 1;
                slot.insert(Arc::new(next));
                1
            }
        };

        info!(repository = %repository, generation, "graph replaced");
        Ok(generation)
    }

    async fn snapshot(&self, repository: &RepositoryId) -> Result<Snapshot, KnowledgeError> {
        Ok(self.require(repository)?.snapshot())
    }

    async fn neighbors(&self, node_id: &str) -> Result<Neighborhood, KnowledgeError> {
        let not_found = || KnowledgeError::NodeNotFound(node_id.to_string());
        let repository = NodeId::repository_of(node_id).ok_or_else(not_found)?;
        let graph = self.current(&repository).ok_or_else(not_found)?;
        let neighborhood = graph.neighborhood(node_id).ok_or_else(not_found)?;
        debug!(node = node_id, degree = neighborhood.edges.len(), "neighbors");
        Ok(neighborhood)
    }

    async fn architecture_overview(&self, repository: &RepositoryId) -> Result<ArchitectureOverview, KnowledgeError> {
        Ok(self.require(repository)?.overview())
    }

    async fn remove(&self, repository: &RepositoryId) -> Result<bool, KnowledgeError> {
        Ok(self.graphs.remove(repository).is_some())
    }
}
