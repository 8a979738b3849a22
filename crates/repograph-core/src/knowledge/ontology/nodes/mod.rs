//! Node types for the knowledge graph.
//!
//! Nodes represent entities of one repository. They are organized by domain:
//!
//! - **Structure**: the Repository root and its Modules (one per source file)
//! - **Code**: Classes and Functions declared in modules
//! - **API**: endpoints detected from route declarations
//! - **Feature**: synthetic keyword-derived groupings of functions

mod api;
mod code;
mod feature;
mod structure;

pub use api::*;
pub use code::*;
pub use feature::*;
pub use structure::*;

use serde::{Deserialize, Serialize};

/// A unified node type that can hold any entity in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type")]
pub enum GraphNode {
    // === Structure Nodes ===
    /// The root node of a repository's graph
    Repository(RepositoryEntity),
    /// A source file
    Module(ModuleEntity),

    // === Code Nodes ===
    /// A class, struct, interface or trait
    Class(ClassEntity),
    /// A function or method
    Function(FunctionEntity),

    // === API Nodes ===
    /// A detected endpoint declaration
    Api(ApiEntity),

    // === Feature Nodes ===
    /// A keyword-derived grouping
    Feature(FeatureEntity),
}

/// Discriminant of [`GraphNode`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Repository,
    Module,
    Class,
    Function,
    Api,
    Feature,
}

impl NodeKind {
    /// Id prefix used by [`super::NodeId`].
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Repository => "repository",
            Self::Module => "module",
            Self::Class => "class",
            Self::Function => "function",
            Self::Api => "api",
            Self::Feature => "feature",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "repository" => Some(Self::Repository),
            "module" => Some(Self::Module),
            "class" => Some(Self::Class),
            "function" => Some(Self::Function),
            "api" => Some(Self::Api),
            "feature" => Some(Self::Feature),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

impl GraphNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Repository(_) => NodeKind::Repository,
            Self::Module(_) => NodeKind::Module,
            Self::Class(_) => NodeKind::Class,
            Self::Function(_) => NodeKind::Function,
            Self::Api(_) => NodeKind::Api,
            Self::Feature(_) => NodeKind::Feature,
        }
    }

    /// Get a human-readable type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Repository(_) => "Repository",
            Self::Module(_) => "Module",
            Self::Class(_) => "Class",
            Self::Function(_) => "Function",
            Self::Api(_) => "API",
            Self::Feature(_) => "Feature",
        }
    }

    /// Get the unique identifier for this node.
    ///
    /// Entities produced by parsers carry no id until the graph builder
    /// assigns one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Repository(n) => n.id.as_deref(),
            Self::Module(n) => n.id.as_deref(),
            Self::Class(n) => n.id.as_deref(),
            Self::Function(n) => n.id.as_deref(),
            Self::Api(n) => n.id.as_deref(),
            Self::Feature(n) => n.id.as_deref(),
        }
    }

    /// Get the display name for this node.
    pub fn name(&self) -> &str {
        match self {
            Self::Repository(n) => &n.name,
            Self::Module(n) => &n.name,
            Self::Class(n) => &n.qualified_name,
            Self::Function(n) => &n.qualified_name,
            Self::Api(n) => &n.endpoint,
            Self::Feature(n) => &n.name,
        }
    }

    /// A short label for visualization, e.g. `GET /users` for an API.
    pub fn label(&self) -> String {
        match self {
            Self::Api(n) => format!("{} {}", n.method, n.endpoint),
            other => other.name().to_string(),
        }
    }

    /// Documentation attached to the entity, if any.
    pub fn doc(&self) -> Option<&str> {
        match self {
            Self::Module(n) => n.doc_comment.as_deref(),
            Self::Class(n) => n.doc_comment.as_deref(),
            Self::Function(n) => n.doc_comment.as_deref(),
            Self::Repository(_) | Self::Api(_) | Self::Feature(_) => None,
        }
    }

    /// File the entity is declared in, if it comes from source.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            Self::Module(n) => Some(&n.file_path),
            Self::Class(n) => Some(&n.file_path),
            Self::Function(n) => Some(&n.file_path),
            Self::Api(n) => Some(&n.file_path),
            Self::Repository(_) | Self::Feature(_) => None,
        }
    }

    /// Assign the graph identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = Some(id.into());
        match self {
            Self::Repository(n) => n.id = id,
            Self::Module(n) => n.id = id,
            Self::Class(n) => n.id = id,
            Self::Function(n) => n.id = id,
            Self::Api(n) => n.id = id,
            Self::Feature(n) => n.id = id,
        }
    }
}

impl From<RepositoryEntity> for GraphNode {
    fn from(e: RepositoryEntity) -> Self {
        Self::Repository(e)
    }
}

impl From<ModuleEntity> for GraphNode {
    fn from(e: ModuleEntity) -> Self {
        Self::Module(e)
    }
}

impl From<ClassEntity> for GraphNode {
    fn from(e: ClassEntity) -> Self {
        Self::Class(e)
    }
}

impl From<FunctionEntity> for GraphNode {
    fn from(e: FunctionEntity) -> Self {
        Self::Function(e)
    }
}

impl From<ApiEntity> for GraphNode {
    fn from(e: ApiEntity) -> Self {
        Self::Api(e)
    }
}

impl From<FeatureEntity> for GraphNode {
    fn from(e: FeatureEntity) -> Self {
        Self::Feature(e)
    }
}
