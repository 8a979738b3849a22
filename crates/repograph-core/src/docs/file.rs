use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{DocType, Document, DocumentStore, DocumentStoreError};
use crate::config::StorageConfig;
use crate::repository::RepositoryId;

const CONTENT_EXT: &str = "md";
const META_SUFFIX: &str = ".meta.yaml";

/// File-based document store.
///
/// Layout:
/// ```text
/// <data_dir>/
///   <repository>/
///     architecture.md          # Document body
///     architecture.meta.yaml   # Everything but the body
///     changelog.md
///     ...
/// ```
///
/// A replace writes the new set into a staging directory, renames the current
/// set aside, promotes the staging directory, then deletes the old set. Readers
/// never see documents of two generations. If a crash leaves only the set
/// aside, reads fall back to it and the next replace restores it first.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    base_path: PathBuf,
}

impl FileDocumentStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Creates a store under the configured data directory.
    pub fn with_config(config: &StorageConfig) -> Self {
        Self::new(config.data_path())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the directory holding a repository's documents.
    pub fn repository_dir(&self, repository: &RepositoryId) -> PathBuf {
        self.base_path.join(repository.as_str())
    }

    fn staging_dir(&self, repository: &RepositoryId) -> PathBuf {
        self.base_path.join(format!(".{}.staging", repository))
    }

    fn retired_dir(&self, repository: &RepositoryId) -> PathBuf {
        self.base_path.join(format!(".{}.retired", repository))
    }

    /// Directory to read from: the current set, else one left aside by an
    /// interrupted replace.
    fn readable_dir(&self, repository: &RepositoryId) -> PathBuf {
        let dir = self.repository_dir(repository);
        let retired = self.retired_dir(repository);
        if !dir.exists() && retired.exists() {
            retired
        } else {
            dir
        }
    }

    /// Undo an interrupted swap.
    fn recover(&self, repository: &RepositoryId) -> Result<(), DocumentStoreError> {
        let dir = self.repository_dir(repository);
        let retired = self.retired_dir(repository);
        if !retired.exists() {
            return Ok(());
        }
        if dir.exists() {
            fs::remove_dir_all(&retired).map_err(|e| DocumentStoreError::io(&retired, e))?;
        } else {
            warn!(repository = %repository, path = %retired.display(), "restoring documents of an interrupted replace");
            fs::rename(&retired, &dir).map_err(|e| DocumentStoreError::io(&dir, e))?;
        }
        Ok(())
    }

    fn content_file(dir: &Path, doc_type: DocType) -> PathBuf {
        dir.join(format!("{}.{}", doc_type, CONTENT_EXT))
    }

    fn meta_file(dir: &Path, doc_type: DocType) -> PathBuf {
        dir.join(format!("{}{}", doc_type, META_SUFFIX))
    }

    fn write_set(&self, repository: &RepositoryId, documents: &[Document]) -> Result<(), DocumentStoreError> {
        self.recover(repository)?;

        let staging = self.staging_dir(repository);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| DocumentStoreError::io(&staging, e))?;
        }
        fs::create_dir_all(&staging).map_err(|e| DocumentStoreError::io(&staging, e))?;

        for document in documents {
            let content_path = Self::content_file(&staging, document.doc_type);
            fs::write(&content_path, &document.content)
                .map_err(|e| DocumentStoreError::io(&content_path, e))?;

            let mut meta = document.clone();
            meta.content.clear();
            let yaml = serde_yaml::to_string(&meta)?;
            let meta_path = Self::meta_file(&staging, document.doc_type);
            fs::write(&meta_path, yaml).map_err(|e| DocumentStoreError::io(&meta_path, e))?;
        }

        let dir = self.repository_dir(repository);
        let retired = self.retired_dir(repository);
        let had_previous = dir.exists();
        if had_previous {
            fs::rename(&dir, &retired).map_err(|e| DocumentStoreError::io(&retired, e))?;
        }
        if let Err(e) = fs::rename(&staging, &dir) {
            if had_previous {
                fs::rename(&retired, &dir).map_err(|e| DocumentStoreError::io(&dir, e))?;
            }
            return Err(DocumentStoreError::io(&dir, e));
        }
        if had_previous {
            fs::remove_dir_all(&retired).map_err(|e| DocumentStoreError::io(&retired, e))?;
        }

        debug!(repository = %repository, documents = documents.len(), path = %dir.display(), "documents written");
        Ok(())
    }

    fn load(dir: &Path, doc_type: DocType) -> Result<Option<Document>, DocumentStoreError> {
        let meta_path = Self::meta_file(dir, doc_type);
        if !meta_path.exists() {
            return Ok(None);
        }

        let yaml = fs::read_to_string(&meta_path).map_err(|e| DocumentStoreError::io(&meta_path, e))?;
        let mut document: Document = serde_yaml::from_str(&yaml)?;
        if document.doc_type != doc_type {
            return Err(DocumentStoreError::InvalidFile(meta_path));
        }

        let content_path = Self::content_file(dir, doc_type);
        document.content =
            fs::read_to_string(&content_path).map_err(|e| DocumentStoreError::io(&content_path, e))?;
        Ok(Some(document))
    }

    fn load_all(dir: &Path) -> Result<Vec<Document>, DocumentStoreError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        let entries = fs::read_dir(dir).map_err(|e| DocumentStoreError::io(dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| DocumentStoreError::io(dir, e))?;
            let name = entry.file_name();
            let Some(doc_type) = name
                .to_str()
                .and_then(|n| n.strip_suffix(META_SUFFIX))
                .and_then(|t| t.parse::<DocType>().ok())
            else {
                continue;
            };

            match Self::load(dir, doc_type) {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => {}
                Err(e) => warn!(path = %entry.path().display(), error = %e, "skipping unreadable document"),
            }
        }

        documents.sort_by_key(|d| d.doc_type);
        Ok(documents)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, DocumentStoreError>
    where
        T: Send + 'static,
        F: FnOnce(FileDocumentStore) -> Result<T, DocumentStoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(store))
            .await
            .map_err(|e| DocumentStoreError::Join(e.to_string()))?
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn replace(&self, repository: &RepositoryId, documents: Vec<Document>) -> Result<(), DocumentStoreError> {
        let repository = repository.clone();
        self.blocking(move |store| store.write_set(&repository, &documents)).await
    }

    async fn get(&self, repository: &RepositoryId, doc_type: DocType) -> Result<Option<Document>, DocumentStoreError> {
        let dir = self.readable_dir(repository);
        self.blocking(move |_| Self::load(&dir, doc_type)).await
    }

    async fn list(&self, repository: &RepositoryId) -> Result<Vec<Document>, DocumentStoreError> {
        let dir = self.readable_dir(repository);
        self.blocking(move |_| Self::load_all(&dir)).await
    }

    async fn remove(&self, repository: &RepositoryId) -> Result<bool, DocumentStoreError> {
        let dirs = [self.repository_dir(repository), self.retired_dir(repository)];
        self.blocking(move |_| {
            let mut removed = false;
            for dir in dirs.iter().filter(|d| d.exists()) {
                fs::remove_dir_all(dir).map_err(|e| DocumentStoreError::io(dir, e))?;
                removed = true;
            }
            Ok(removed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (FileDocumentStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileDocumentStore::new(temp_dir.path());
        (store, temp_dir)
    }

    fn document(repo: &RepositoryId, doc_type: DocType, body: &str, version: u32) -> Document {
        Document::new(repo.clone(), doc_type, body.to_string(), 80, version)
            .with_metadata(json!({ "modules": 2 }))
            .with_fingerprint("abc")
    }

    #[tokio::test]
    async fn test_replace_and_get() {
        let (store, _temp) = create_test_store();
        let repo = RepositoryId::new("demo").unwrap();

        let doc = document(&repo, DocType::Architecture, "# Architecture Overview\n", 1);
        store.replace(&repo, vec![doc.clone()]).await.unwrap();

        let dir = store.repository_dir(&repo);
        assert!(dir.join("architecture.md").exists());
        assert!(dir.join("architecture.meta.yaml").exists());

        let loaded = store.get(&repo, DocType::Architecture).await.unwrap().unwrap();
        assert_eq!(loaded, doc);
        assert!(store.get(&repo, DocType::Changelog).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_drops_previous_set() {
        let (store, _temp) = create_test_store();
        let repo = RepositoryId::new("demo").unwrap();

        store
            .replace(
                &repo,
                vec![
                    document(&repo, DocType::Changelog, "old", 1),
                    document(&repo, DocType::Onboarding, "old", 1),
                ],
            )
            .await
            .unwrap();
        store
            .replace(&repo, vec![document(&repo, DocType::Comprehensive, "new", 2)])
            .await
            .unwrap();

        let listed = store.list(&repo).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].doc_type, DocType::Comprehensive);
        assert_eq!(listed[0].content, "new");
        assert_eq!(listed[0].metadata["modules"], 2);
    }

    #[tokio::test]
    async fn test_interrupted_swap_keeps_previous_set() {
        let (store, _temp) = create_test_store();
        let repo = RepositoryId::new("demo").unwrap();

        store
            .replace(&repo, vec![document(&repo, DocType::Architecture, "old", 1)])
            .await
            .unwrap();
        // A crash between setting the old set aside and promoting the new one.
        fs::rename(store.repository_dir(&repo), store.retired_dir(&repo)).unwrap();

        let listed = store.list(&repo).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "old");
        assert!(store.get(&repo, DocType::Architecture).await.unwrap().is_some());

        store
            .replace(&repo, vec![document(&repo, DocType::Architecture, "new", 2)])
            .await
            .unwrap();
        assert!(!store.retired_dir(&repo).exists());
        assert_eq!(store.list(&repo).await.unwrap()[0].content, "new");
    }

    #[tokio::test]
    async fn test_remove() {
        let (store, _temp) = create_test_store();
        let repo = RepositoryId::new("demo").unwrap();

        assert!(!store.remove(&repo).await.unwrap());
        store
            .replace(&repo, vec![document(&repo, DocType::Architecture, "x", 1)])
            .await
            .unwrap();
        assert!(store.remove(&repo).await.unwrap());
        assert!(store.list(&repo).await.unwrap().is_empty());
    }
}
