//! Registered repositories and their analysis status.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::knowledge::Language;

/// Default branch for newly registered repositories.
pub const DEFAULT_BRANCH: &str = "main";

/// Identifier of a repository.
///
/// Used as a segment of every node id, so it may not be empty or contain `:`
/// or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryId(String);

/// Rejected repository id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid repository id '{0}': must be non-empty without ':' or whitespace")]
pub struct InvalidRepositoryId(pub String);

impl RepositoryId {
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidRepositoryId> {
        let id = id.into();
        if id.is_empty() || id.contains(':') || id.chars().any(char::is_whitespace) {
            return Err(InvalidRepositoryId(id));
        }
        Ok(Self(id))
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Derive an id from a display name: lower-cased, with runs of anything
    /// other than ASCII alphanumerics, `-`, `_` and `.` collapsed to `-`.
    pub fn slug(name: &str) -> Result<Self, InvalidRepositoryId> {
        let mut slug = String::with_capacity(name.len());
        for c in name.trim().chars() {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        Self::new(slug.trim_matches('-'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RepositoryId {
    type Error = InvalidRepositoryId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RepositoryId> for String {
    fn from(id: RepositoryId) -> Self {
        id.0
    }
}

impl std::str::FromStr for RepositoryId {
    type Err = InvalidRepositoryId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Analysis status of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryStatus {
    #[default]
    Pending,
    Analyzing,
    Analyzed,
    Failed,
}

impl RepositoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Analyzing => "analyzing",
            Self::Analyzed => "analyzed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RepositoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
    /// Source location: clone URL or local path
    pub location: String,
    pub branch: String,
    /// Dominant language from the last completed analysis
    pub language: Option<Language>,
    pub status: RepositoryStatus,
    pub last_analyzed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Repository {
    pub fn new(id: RepositoryId, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            location: location.into(),
            branch: DEFAULT_BRANCH.to_string(),
            language: None,
            status: RepositoryStatus::Pending,
            last_analyzed: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }
}

/// In-memory registry of repositories, keyed by id.
#[derive(Debug, Default)]
pub struct RepositoryRegistry {
    repositories: RwLock<BTreeMap<RepositoryId, Repository>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository, replacing any previous record with the same id.
    pub fn register(&self, repository: Repository) -> Repository {
        self.repositories
            .write()
            .insert(repository.id.clone(), repository.clone());
        repository
    }

    pub fn get(&self, id: &RepositoryId) -> Option<Repository> {
        self.repositories.read().get(id).cloned()
    }

    pub fn contains(&self, id: &RepositoryId) -> bool {
        self.repositories.read().contains_key(id)
    }

    /// All repositories ordered by id.
    pub fn list(&self) -> Vec<Repository> {
        self.repositories.read().values().cloned().collect()
    }

    pub fn remove(&self, id: &RepositoryId) -> Option<Repository> {
        self.repositories.write().remove(id)
    }

    /// Apply `f` to the record in place. Returns false if the id is unknown.
    pub fn update<F>(&self, id: &RepositoryId, f: F) -> bool
    where
        F: FnOnce(&mut Repository),
    {
        match self.repositories.write().get_mut(id) {
            Some(repo) => {
                f(repo);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_id_validation() {
        assert!(RepositoryId::new("acme-api").is_ok());
        assert!(RepositoryId::new("").is_err());
        assert!(RepositoryId::new("a:b").is_err());
        assert!(RepositoryId::new("a b").is_err());
    }

    #[test]
    fn test_slug() {
        assert_eq!(RepositoryId::slug("My Project!").unwrap().as_str(), "my-project");
        assert_eq!(RepositoryId::slug("repo_v2.1").unwrap().as_str(), "repo_v2.1");
        assert!(RepositoryId::slug("!!!").is_err());
    }

    #[test]
    fn test_repository_id_deserialize_rejects_colon() {
        let ok: Result<RepositoryId, _> = serde_json::from_str("\"acme\"");
        assert!(ok.is_ok());
        let bad: Result<RepositoryId, _> = serde_json::from_str("\"a:b\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_registry_update_and_remove() {
        let registry = RepositoryRegistry::new();
        let id = RepositoryId::new("acme").unwrap();
        let repo = registry.register(Repository::new(id.clone(), "Acme", "/tmp/acme"));
        assert_eq!(repo.status, RepositoryStatus::Pending);
        assert_eq!(repo.branch, DEFAULT_BRANCH);

        assert!(registry.update(&id, |r| r.status = RepositoryStatus::Analyzing));
        assert_eq!(registry.get(&id).unwrap().status, RepositoryStatus::Analyzing);

        assert!(registry.remove(&id).is_some());
        assert!(!registry.contains(&id));
        assert!(!registry.update(&id, |r| r.status = RepositoryStatus::Failed));
    }
}
