//! In-memory provider, keyed by repository location.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{CommitRecord, ContentProvider, ProviderError, SourceFile};
use crate::repository::Repository;

/// Failure a [`MemoryProvider`] can be told to raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    NotFound,
    AccessDenied,
    Unavailable,
}

impl ProviderFailure {
    fn to_error(self, location: &str) -> ProviderError {
        match self {
            Self::NotFound => ProviderError::NotFound(location.to_string()),
            Self::AccessDenied => ProviderError::AccessDenied(location.to_string()),
            Self::Unavailable => ProviderError::Unavailable(location.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Entry {
    files: Vec<SourceFile>,
    commits: Vec<CommitRecord>,
    fail_files: Option<ProviderFailure>,
    fail_commits: Option<ProviderFailure>,
    delay: Option<Duration>,
}

/// Serves files and commits from memory.
///
/// Unknown locations fail with `NotFound`. Failures and latency can be
/// injected per location.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry(&self, location: &str, f: impl FnOnce(&mut Entry)) {
        f(self.entries.write().entry(location.to_string()).or_default());
    }

    pub fn set_files(&self, location: &str, files: Vec<SourceFile>) {
        self.with_entry(location, |e| e.files = files);
    }

    pub fn set_commits(&self, location: &str, commits: Vec<CommitRecord>) {
        self.with_entry(location, |e| e.commits = commits);
    }

    /// Make `list_files` fail for `location`.
    pub fn fail_files(&self, location: &str, failure: ProviderFailure) {
        self.with_entry(location, |e| e.fail_files = Some(failure));
    }

    /// Make `commit_log` fail for `location`.
    pub fn fail_commits(&self, location: &str, failure: ProviderFailure) {
        self.with_entry(location, |e| e.fail_commits = Some(failure));
    }

    /// Delay every `list_files` call for `location`.
    pub fn set_delay(&self, location: &str, delay: Duration) {
        self.with_entry(location, |e| e.delay = Some(delay));
    }

    pub fn clear_failures(&self, location: &str) {
        self.with_entry(location, |e| {
            e.fail_files = None;
            e.fail_commits = None;
        });
    }

    fn entry(&self, location: &str) -> Result<Entry, ProviderError> {
        self.entries
            .read()
            .get(location)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(location.to_string()))
    }
}

#[async_trait]
impl ContentProvider for MemoryProvider {
    async fn list_files(&self, repository: &Repository) -> Result<Vec<SourceFile>, ProviderError> {
        let entry = self.entry(&repository.location)?;
        if let Some(delay) = entry.delay {
            tokio::time::sleep(delay).await;
        }
        match entry.fail_files {
            Some(failure) => Err(failure.to_error(&repository.location)),
            None => Ok(entry.files),
        }
    }

    async fn commit_log(&self, repository: &Repository) -> Result<Vec<CommitRecord>, ProviderError> {
        let entry = self.entry(&repository.location)?;
        match entry.fail_commits {
            Some(failure) => Err(failure.to_error(&repository.location)),
            None => Ok(entry.commits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryId;

    fn repository(location: &str) -> Repository {
        Repository::new(RepositoryId::new("mem").unwrap(), "mem", location)
    }

    #[tokio::test]
    async fn test_serves_and_fails() {
        let provider = MemoryProvider::new();
        provider.set_files("mem://a", vec![SourceFile::new("a.py", "x = 1")]);

        let files = provider.list_files(&repository("mem://a")).await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(provider.commit_log(&repository("mem://a")).await.unwrap().is_empty());

        provider.fail_files("mem://a", ProviderFailure::AccessDenied);
        let err = provider.list_files(&repository("mem://a")).await.unwrap_err();
        assert!(matches!(err, ProviderError::AccessDenied(_)));

        provider.clear_failures("mem://a");
        assert!(provider.list_files(&repository("mem://a")).await.is_ok());

        let err = provider.list_files(&repository("mem://missing")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }
}
