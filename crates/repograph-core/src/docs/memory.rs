use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{DocType, Document, DocumentStore, DocumentStoreError};
use crate::repository::RepositoryId;

/// In-process document store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<RepositoryId, BTreeMap<DocType, Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn replace(&self, repository: &RepositoryId, documents: Vec<Document>) -> Result<(), DocumentStoreError> {
        let set = documents.into_iter().map(|d| (d.doc_type, d)).collect();
        self.documents.write().insert(repository.clone(), set);
        Ok(())
    }

    async fn get(&self, repository: &RepositoryId, doc_type: DocType) -> Result<Option<Document>, DocumentStoreError> {
        Ok(self
            .documents
            .read()
            .get(repository)
            .and_then(|set| set.get(&doc_type))
            .cloned())
    }

    async fn list(&self, repository: &RepositoryId) -> Result<Vec<Document>, DocumentStoreError> {
        Ok(self
            .documents
            .read()
            .get(repository)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove(&self, repository: &RepositoryId) -> Result<bool, DocumentStoreError> {
        Ok(self.documents.write().remove(repository).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_is_wholesale() {
        let store = MemoryDocumentStore::new();
        let repo = RepositoryId::new("demo").unwrap();

        let first = vec![
            Document::new(repo.clone(), DocType::Changelog, "old".into(), 10, 1),
            Document::new(repo.clone(), DocType::Architecture, "old".into(), 10, 1),
        ];
        store.replace(&repo, first).await.unwrap();
        let listed = store.list(&repo).await.unwrap();
        assert_eq!(listed[0].doc_type, DocType::Architecture);

        store
            .replace(&repo, vec![Document::new(repo.clone(), DocType::Onboarding, "new".into(), 90, 2)])
            .await
            .unwrap();
        assert!(store.get(&repo, DocType::Changelog).await.unwrap().is_none());
        assert_eq!(store.get(&repo, DocType::Onboarding).await.unwrap().unwrap().version, 2);

        assert!(store.remove(&repo).await.unwrap());
        assert!(store.list(&repo).await.unwrap().is_empty());
    }
}
