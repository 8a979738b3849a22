//! Materializes extraction results into graph nodes and edges.
//!
//! The builder assigns every entity its stable id, wires the ownership edges
//! and drops anything that would dangle (a CALLS link to a function that was
//! never added, a feature member from a skipped file). The output order is a
//! pure function of the input, so identical content yields identical graphs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::callgraph::{CallLink, FunctionKey};
use super::extractor::ExtractedFile;
use super::features::FeatureGroup;
use super::ontology::{
    ApiEntity, FeatureEntity, GraphEdge, GraphNode, Language, NodeId, NodeKind, RepositoryEntity,
};
use crate::repository::{Repository, RepositoryId};

/// A complete node/edge set for one repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphContent {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphContent {
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind() == kind).count()
    }

    pub fn count_edges(&self, relation: super::ontology::Relation) -> usize {
        self.edges.iter().filter(|e| e.relation == relation).count()
    }
}

/// Builder for one repository's graph.
pub struct GraphBuilder {
    repository: RepositoryId,
    root: String,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    seen_nodes: HashSet<String>,
    seen_edges: HashSet<GraphEdge>,
}

impl GraphBuilder {
    /// Start a graph with its repository root.
    pub fn new(repository: &Repository, language: Option<Language>) -> Self {
        let root = NodeId::repository(&repository.id);
        let mut builder = Self {
            repository: repository.id.clone(),
            root: root.clone(),
            nodes: Vec::new(),
            edges: Vec::new(),
            seen_nodes: HashSet::new(),
            seen_edges: HashSet::new(),
        };
        builder.add_node(
            root,
            RepositoryEntity {
                id: None,
                name: repository.name.clone(),
                location: repository.location.clone(),
                branch: repository.branch.clone(),
                language,
            }
            .into(),
        );
        builder
    }

    pub fn root_id(&self) -> &str {
        &self.root
    }

    /// Add a module with its classes and functions.
    pub fn add_file(&mut self, file: &ExtractedFile) {
        let path = &file.module.file_path;
        let module_id = NodeId::module(&self.repository, path);
        if !self.add_node(module_id.clone(), file.module.clone().into()) {
            return;
        }
        self.add_edge(GraphEdge::contains(self.root.clone(), module_id.clone()));

        for class in &file.classes {
            let id = NodeId::class(&self.repository, path, &class.qualified_name);
            if self.add_node(id.clone(), class.clone().into()) {
                self.add_edge(GraphEdge::defines(module_id.clone(), id));
            }
        }

        for func in &file.functions {
            let id = NodeId::function(&self.repository, path, &func.qualified_name);
            if self.add_node(id.clone(), func.clone().into()) {
                self.add_edge(GraphEdge::defines(module_id.clone(), id));
            }
        }
    }

    /// Add CALLS edges whose endpoints are both present.
    pub fn add_calls(&mut self, links: &[CallLink]) {
        for link in links {
            let caller = self.function_id(&link.caller);
            let callee = self.function_id(&link.callee);
            if caller != callee
                && self.seen_nodes.contains(&caller)
                && self.seen_nodes.contains(&callee)
            {
                self.add_edge(GraphEdge::calls(caller, callee));
            }
        }
    }

    /// Add API nodes exposed by the repository.
    pub fn add_apis(&mut self, apis: &[ApiEntity]) {
        for api in apis {
            let id = NodeId::api(&self.repository, &api.file_path, api.method, &api.endpoint);
            if self.add_node(id.clone(), api.clone().into()) {
                self.add_edge(GraphEdge::exposes(self.root.clone(), id));
            }
        }
    }

    /// Add features and their INCLUDES edges.
    ///
    /// Members that are not in the graph are ignored; a feature left with no
    /// members is not added.
    pub fn add_features(&mut self, groups: &[FeatureGroup], rules_version: &str) {
        for group in groups {
            let members: Vec<String> = group
                .members
                .iter()
                .map(|key| self.function_id(key))
                .filter(|id| self.seen_nodes.contains(id))
                .collect();
            if members.is_empty() {
                continue;
            }

            let id = NodeId::feature(&self.repository, &group.label);
            let feature = FeatureEntity {
                id: None,
                name: group.label.clone(),
                keywords: group.keywords.clone(),
                rules_version: rules_version.to_string(),
                size: members.len(),
            };
            if !self.add_node(id.clone(), feature.into()) {
                continue;
            }
            self.add_edge(GraphEdge::has_feature(self.root.clone(), id.clone()));
            for member in members {
                self.add_edge(GraphEdge::includes(id.clone(), member));
            }
        }
    }

    /// Finish with nodes ordered by kind then id, edges by relation then endpoints.
    pub fn build(self) -> GraphContent {
        let mut nodes = self.nodes;
        nodes.sort_by(|a, b| {
            a.kind()
                .cmp(&b.kind())
                .then_with(|| a.id().unwrap_or("").cmp(b.id().unwrap_or("")))
        });
        let mut edges = self.edges;
        edges.sort();

        GraphContent { nodes, edges }
    }

    fn function_id(&self, key: &FunctionKey) -> String {
        NodeId::function(&self.repository, &key.module_path, &key.qualified_name)
    }

    /// Add a node if not already present.
    fn add_node(&mut self, id: String, mut node: GraphNode) -> bool {
        if !self.seen_nodes.insert(id.clone()) {
            return false;
        }
        node.set_id(id);
        self.nodes.push(node);
        true
    }

    fn add_edge(&mut self, edge: GraphEdge) {
        if self.seen_edges.insert(edge.clone()) {
            self.edges.push(edge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::ontology::{FunctionEntity, HttpMethod, ModuleEntity, Relation};

    fn repository() -> Repository {
        Repository::new(RepositoryId::new("demo").unwrap(), "demo", "mem://demo")
    }

    fn file(path: &str, functions: &[&str]) -> ExtractedFile {
        ExtractedFile {
            module: ModuleEntity {
                id: None,
                name: ModuleEntity::name_from_path(path),
                file_path: path.to_string(),
                language: Language::Python,
                doc_comment: None,
                imports: vec![],
                content_hash: String::new(),
                lines: 1,
            },
            classes: vec![],
            functions: functions.iter().map(|f| FunctionEntity::new(*f, path)).collect(),
            warnings: vec![],
        }
    }

    #[test]
    fn test_ownership_edges_and_ids() {
        let mut builder = GraphBuilder::new(&repository(), Some(Language::Python));
        builder.add_file(&file("b.py", &["bar"]));
        builder.add_file(&file("a.py", &["foo"]));
        builder.add_calls(&[CallLink {
            caller: FunctionKey::new("a.py", "foo"),
            callee: FunctionKey::new("b.py", "bar"),
        }]);
        let graph = builder.build();

        let ids: Vec<&str> = graph.nodes.iter().filter_map(|n| n.id()).collect();
        assert_eq!(
            ids,
            vec![
                "repository:demo",
                "module:demo:a.py",
                "module:demo:b.py",
                "function:demo:a.py:foo",
                "function:demo:b.py:bar",
            ]
        );
        assert_eq!(graph.count_edges(Relation::Contains), 2);
        assert_eq!(graph.count_edges(Relation::Defines), 2);
        assert_eq!(
            graph.edges.iter().find(|e| e.relation == Relation::Calls),
            Some(&GraphEdge::calls("function:demo:a.py:foo", "function:demo:b.py:bar"))
        );
    }

    #[test]
    fn test_dangling_references_are_dropped() {
        let mut builder = GraphBuilder::new(&repository(), None);
        builder.add_file(&file("a.py", &["foo"]));
        builder.add_calls(&[CallLink {
            caller: FunctionKey::new("a.py", "foo"),
            callee: FunctionKey::new("gone.py", "bar"),
        }]);
        builder.add_features(
            &[FeatureGroup {
                label: "Ghost".into(),
                keywords: vec!["ghost".into()],
                members: vec![FunctionKey::new("gone.py", "bar")],
            }],
            "v1",
        );
        let graph = builder.build();

        assert_eq!(graph.count_edges(Relation::Calls), 0);
        assert_eq!(graph.count(NodeKind::Feature), 0);
    }

    #[test]
    fn test_apis_and_features() {
        let mut builder = GraphBuilder::new(&repository(), None);
        builder.add_file(&file("auth.py", &["login"]));
        let api = ApiEntity {
            id: None,
            endpoint: "/login".into(),
            method: HttpMethod::Post,
            api_type: Default::default(),
            file_path: "auth.py".into(),
            line: 1,
            handler: Some("login".into()),
            rule: "python-decorator-verb".into(),
        };
        builder.add_apis(&[api.clone(), api]);
        builder.add_features(
            &[FeatureGroup {
                label: "Authentication".into(),
                keywords: vec!["login".into()],
                members: vec![FunctionKey::new("auth.py", "login")],
            }],
            "features-v1",
        );
        let graph = builder.build();

        assert_eq!(graph.count(NodeKind::Api), 1);
        assert!(graph.edges.contains(&GraphEdge::exposes(
            "repository:demo",
            "api:demo:auth.py:POST:/login"
        )));
        assert!(graph.edges.contains(&GraphEdge::includes(
            "feature:demo:Authentication",
            "function:demo:auth.py:login"
        )));
        match graph.nodes.last() {
            Some(GraphNode::Feature(f)) => {
                assert_eq!(f.size, 1);
                assert_eq!(f.rules_version, "features-v1");
            }
            other => panic!("expected feature last, got {:?}", other),
        }
    }
}
