//! Commit history classification.
//!
//! Buckets commits into intent categories from message text alone. Nothing
//! here reads the knowledge graph; the result only feeds the changelog.

mod classifier;
pub mod rules;

pub use classifier::{ClassifiedCommit, ClassifiedHistory, HistoryClassifier};
pub use rules::HISTORY_RULES_VERSION;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit as supplied by the content provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
}

impl CommitRecord {
    pub fn new(
        id: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            timestamp,
            author: author.into(),
        }
    }

    /// First line of the message, trimmed.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }

    /// Abbreviated commit id.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(7) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

/// Why a commit was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentCategory {
    Feature,
    Bugfix,
    Refactor,
    Docs,
    Chore,
    Other,
}

impl IntentCategory {
    /// All categories in changelog order.
    pub const ALL: [IntentCategory; 6] = [
        Self::Feature,
        Self::Bugfix,
        Self::Refactor,
        Self::Docs,
        Self::Chore,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Bugfix => "bugfix",
            Self::Refactor => "refactor",
            Self::Docs => "docs",
            Self::Chore => "chore",
            Self::Other => "other",
        }
    }

    /// Changelog section heading.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Feature => "Features",
            Self::Bugfix => "Bug Fixes",
            Self::Refactor => "Refactoring",
            Self::Docs => "Documentation",
            Self::Chore => "Chores",
            Self::Other => "Other Changes",
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
