use std::collections::BTreeSet;
use std::sync::Arc;

use repograph_core::knowledge::{EntityExtractor, FileOutcome, GraphBuilder, GraphContent, KnowledgeError, NodeId};
use repograph_core::{GraphStore, MemoryGraphStore, Repository, RepositoryId, SourceFile};

fn repository() -> Repository {
    Repository::new(RepositoryId::new("swap").unwrap(), "swap", "mem://swap")
}

/// Graph of one python file defining `count` functions.
fn content(repository: &Repository, path: &str, count: usize) -> GraphContent {
    let source: String = (0..count)
        .map(|i| format!("def fn_{i}():\n    return {i}\n\n"))
        .collect();
    let file = SourceFile::detected(path, source);

    let mut builder = GraphBuilder::new(repository, None);
    match EntityExtractor::new().extract(&file, None) {
        FileOutcome::Extracted(extracted) => builder.add_file(&extracted),
        other => panic!("unexpected outcome: {:?}", other),
    }
    builder.build()
}

fn node_ids(content: &GraphContent) -> BTreeSet<String> {
    content
        .nodes
        .iter()
        .filter_map(|n| n.id().map(str::to_string))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_mixed_generations() {
    let repo = repository();
    let old = content(&repo, "old.py", 20);
    let new = content(&repo, "new.py", 35);
    let old_ids = node_ids(&old);
    let new_ids = node_ids(&new);

    let store = Arc::new(MemoryGraphStore::new());
    store.replace(&repo.id, old.clone()).await.unwrap();

    let writer = {
        let store = store.clone();
        let id = repo.id.clone();
        tokio::spawn(async move {
            for round in 0..200 {
                let next = if round % 2 == 0 { new.clone() } else { old.clone() };
                store.replace(&id, next).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let id = repo.id.clone();
            let (old_ids, new_ids) = (old_ids.clone(), new_ids.clone());
            tokio::spawn(async move {
                let mut last_generation = 0;
                for _ in 0..200 {
                    let snapshot = store.snapshot(&id).await.unwrap();
                    let ids: BTreeSet<String> = snapshot
                        .nodes
                        .iter()
                        .filter_map(|n| n.id().map(str::to_string))
                        .collect();
                    assert!(ids == old_ids || ids == new_ids, "mixed snapshot at generation {}", snapshot.generation);
                    for edge in &snapshot.edges {
                        assert!(ids.contains(&edge.from) && ids.contains(&edge.to));
                    }
                    assert!(snapshot.generation >= last_generation);
                    last_generation = snapshot.generation;
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(store.snapshot(&repo.id).await.unwrap().generation, 201);
}

#[tokio::test]
async fn test_repositories_are_independent() {
    let first = repository();
    let second = Repository::new(RepositoryId::new("other").unwrap(), "other", "mem://other");

    let store = MemoryGraphStore::new();
    store.replace(&first.id, content(&first, "a.py", 2)).await.unwrap();
    store.replace(&second.id, content(&second, "a.py", 3)).await.unwrap();
    store.replace(&second.id, content(&second, "a.py", 1)).await.unwrap();

    let a = store.snapshot(&first.id).await.unwrap();
    let b = store.snapshot(&second.id).await.unwrap();
    assert_eq!(a.generation, 1);
    assert_eq!(b.generation, 2);
    assert_ne!(a.fingerprint(), b.fingerprint());

    assert!(store.remove(&first.id).await.unwrap());
    assert!(matches!(
        store.neighbors(&NodeId::module(&first.id, "a.py")).await,
        Err(KnowledgeError::NodeNotFound(_))
    ));
    assert!(store.neighbors(&NodeId::module(&second.id, "a.py")).await.is_ok());
}

#[tokio::test]
async fn test_architecture_overview() {
    let repo = repository();
    let store = MemoryGraphStore::new();
    store.replace(&repo.id, content(&repo, "svc/main.py", 2)).await.unwrap();

    let overview = store.architecture_overview(&repo.id).await.unwrap();
    assert_eq!(overview.modules.len(), 1);
    assert_eq!(overview.modules[0].path, "svc/main.py");
    assert!(overview.apis.is_empty());
}
