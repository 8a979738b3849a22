//! Feature nodes: synthetic groupings that do not exist in source.

use serde::{Deserialize, Serialize};

/// A keyword-derived grouping of functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEntity {
    /// Unique identifier
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,

    /// Feature label (e.g., "Authentication")
    pub name: String,

    /// Keywords of the rule that produced this feature
    pub keywords: Vec<String>,

    /// Version of the rule table used
    pub rules_version: String,

    /// Number of included functions
    pub size: usize,
}
