use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::RepositoryId;

/// Kind of a generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Architecture,
    Changelog,
    Onboarding,
    Comprehensive,
}

impl DocType {
    /// Every document type, in synthesis order.
    pub const ALL: [DocType; 4] = [
        DocType::Architecture,
        DocType::Changelog,
        DocType::Onboarding,
        DocType::Comprehensive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Changelog => "changelog",
            Self::Onboarding => "onboarding",
            Self::Comprehensive => "comprehensive",
        }
    }

    /// Document title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Architecture => "Architecture Overview",
            Self::Changelog => "Recent Changes",
            Self::Onboarding => "Getting Started",
            Self::Comprehensive => "Comprehensive Documentation",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown document type '{}'", s))
    }
}

/// A document derived from one graph generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: String,
    pub repository: RepositoryId,
    pub doc_type: DocType,
    pub title: String,
    /// Markdown body
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub content: String,
    /// 0..=100
    pub confidence: u8,
    /// Increments on every regeneration for the repository
    pub version: u32,
    pub auto_generated: bool,
    /// Counts the document was built from
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Fingerprint of the graph snapshot the document was derived from
    pub fingerprint: String,
}

impl Document {
    pub fn new(
        repository: RepositoryId,
        doc_type: DocType,
        content: String,
        confidence: u8,
        version: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            repository,
            doc_type,
            title: doc_type.title().to_string(),
            content,
            confidence: confidence.min(100),
            version,
            auto_generated: true,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
            fingerprint: String::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_type_names() {
        for doc_type in DocType::ALL {
            assert_eq!(doc_type.as_str().parse::<DocType>().unwrap(), doc_type);
        }
        assert!("readme".parse::<DocType>().is_err());
        assert_eq!(DocType::Changelog.title(), "Recent Changes");
    }

    #[test]
    fn test_confidence_is_clamped() {
        let repo = RepositoryId::new("demo").unwrap();
        let doc = Document::new(repo, DocType::Architecture, "# A".into(), 250, 1);
        assert_eq!(doc.confidence, 100);
        assert!(doc.auto_generated);
        assert_eq!(doc.title, "Architecture Overview");
    }
}
