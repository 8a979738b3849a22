use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use repograph_core::knowledge::{GraphNode, NodeId, NodeKind, Relation};
use repograph_core::{
    AnalysisManager, CommitRecord, Config, DocType, HistoryClassifier, IntentCategory, JobOutcome, JobState, KnowledgeError,
    ManagerError, MemoryProvider, Repository, Snapshot, SourceFile,
};

const LOCATION: &str = "mem://demo";

fn create_test_manager() -> (AnalysisManager, Arc<MemoryProvider>) {
    let provider = Arc::new(MemoryProvider::new());
    let manager = AnalysisManager::new(&Config::default(), provider.clone());
    (manager, provider)
}

async fn analyze(manager: &AnalysisManager) -> Repository {
    let repo = manager.register_repository("demo", LOCATION, None).unwrap();
    let job_id = manager.start_analysis(&repo.id).await.unwrap();
    let job = manager.wait(&job_id).await.unwrap();
    assert_eq!(job.state, JobState::Completed, "job failed: {:?}", job.error);
    repo
}

fn commit(id: &str, message: &str, day: u32) -> CommitRecord {
    CommitRecord::new(id, message, Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(), "dev")
}

fn sample_project() -> Vec<SourceFile> {
    vec![
        SourceFile::detected(
            "app/auth.py",
            r#""""Authentication helpers."""

class SessionStore:
    """Keeps login sessions."""

    def get(self, token):
        return lookup_token(token)


def lookup_token(token):
    return token


@app.post("/login")
def login(request):
    """Log a user in."""
    return lookup_token(request.token)
"#,
        ),
        SourceFile::detected(
            "app/cache.py",
            r#"def cache_get(key):
    return key


def warm_cache():
    cache_get("a")
    cache_get("b")
"#,
        ),
        SourceFile::detected(
            "web/server.js",
            r#"const express = require('express');
const app = express();

function listUsers(req, res) {
  res.json([]);
}

app.get('/users', listUsers);
"#,
        ),
        SourceFile::detected("README.md", "# Demo\n"),
    ]
}

fn ids(snapshot: &Snapshot, kind: NodeKind) -> Vec<String> {
    let mut ids: Vec<String> = snapshot
        .nodes
        .iter()
        .filter(|n| n.kind() == kind)
        .filter_map(|n| n.id().map(str::to_string))
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn test_two_file_call_scenario() {
    let (manager, provider) = create_test_manager();
    provider.set_files(
        LOCATION,
        vec![
            SourceFile::detected("a.py", "def foo():\n    return bar()\n"),
            SourceFile::detected("b.py", "def bar():\n    return 1\n"),
        ],
    );

    let repo = analyze(&manager).await;
    let snapshot = manager.snapshot(&repo.id).await.unwrap();

    let foo = NodeId::function(&repo.id, "a.py", "foo");
    let bar = NodeId::function(&repo.id, "b.py", "bar");
    assert_eq!(ids(&snapshot, NodeKind::Function), vec![foo.clone(), bar.clone()]);

    let calls: Vec<_> = snapshot.edges.iter().filter(|e| e.relation == Relation::Calls).collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].from, foo);
    assert_eq!(calls[0].to, bar);

    let mut defines: Vec<(String, String)> = snapshot
        .edges
        .iter()
        .filter(|e| e.relation == Relation::Defines)
        .map(|e| (e.from.clone(), e.to.clone()))
        .collect();
    defines.sort();
    assert_eq!(
        defines,
        vec![
            (NodeId::module(&repo.id, "a.py"), foo),
            (NodeId::module(&repo.id, "b.py"), bar),
        ]
    );
}

#[tokio::test]
async fn test_syntax_error_skips_file() {
    let (manager, provider) = create_test_manager();
    provider.set_files(
        LOCATION,
        vec![
            SourceFile::detected("good.py", "def ok():\n    return 1\n"),
            SourceFile::detected("broken.py", "def broken(:\n    return\n"),
            SourceFile::detected("other.py", "class Thing:\n    pass\n"),
        ],
    );

    let repo = manager.register_repository("demo", LOCATION, None).unwrap();
    let job_id = manager.start_analysis(&repo.id).await.unwrap();
    let job = manager.wait(&job_id).await.unwrap();

    assert_eq!(job.state, JobState::Completed);
    assert!(job.error.is_none());
    let outcome = job.outcome.unwrap();
    assert_eq!(outcome.modules, 2);
    assert_eq!(outcome.parsed_files, 2);
    assert_eq!(outcome.skipped_files.len(), 1);
    assert_eq!(outcome.skipped_files[0].path, "broken.py");

    let snapshot = manager.snapshot(&repo.id).await.unwrap();
    assert!(snapshot.node(&NodeId::module(&repo.id, "broken.py")).is_none());
}

#[tokio::test]
async fn test_commit_classification_scenario() {
    let commits = vec![
        commit("a1b2c3d4e5", "feat: add login", 3),
        commit("b2c3d4e5f6", "fix: null pointer", 2),
        commit("c3d4e5f6a7", "chore: bump deps", 1),
    ];

    let history = HistoryClassifier::new().classify(&commits);
    assert_eq!(history.count(IntentCategory::Feature), 1);
    assert_eq!(history.count(IntentCategory::Bugfix), 1);
    assert_eq!(history.count(IntentCategory::Chore), 1);
    assert_eq!(history.count(IntentCategory::Other), 0);

    let (manager, provider) = create_test_manager();
    provider.set_files(LOCATION, vec![SourceFile::detected("main.py", "def main():\n    pass\n")]);
    provider.set_commits(LOCATION, commits);

    let repo = analyze(&manager).await;
    let changelog = manager.document(&repo.id, DocType::Changelog).await.unwrap().unwrap();
    assert_eq!(changelog.confidence, 100);
    assert!(changelog.content.contains("## Features"));
    assert!(changelog.content.contains("- [2024-03-03] feat: add login (a1b2c3d)"));
    assert!(changelog.content.contains("- [2024-03-02] fix: null pointer (b2c3d4e)"));
}

fn ruby_files(count: usize) -> Vec<SourceFile> {
    (0..count)
        .map(|i| SourceFile::detected(format!("lib/task_{i}.rb"), format!("def task_{i}\n  {i}\nend\n")))
        .collect()
}

async fn confidences(files: Vec<SourceFile>) -> (JobOutcome, BTreeMap<DocType, u8>) {
    let (manager, provider) = create_test_manager();
    provider.set_files(LOCATION, files);
    let repo = analyze(&manager).await;
    let outcome = manager.jobs(&repo.id)[0].outcome.clone().unwrap();
    let documents = manager.documents(&repo.id).await.unwrap();
    let confidences = documents.iter().map(|d| (d.doc_type, d.confidence)).collect();
    (outcome, confidences)
}

#[tokio::test]
async fn test_unsupported_repository_has_no_confidence() {
    let (outcome, confidences) = confidences(ruby_files(9)).await;

    assert_eq!(outcome.parsed_files, 0);
    assert_eq!(outcome.unsupported_files, 9);
    assert_eq!(confidences[&DocType::Architecture], 0);
    assert_eq!(confidences[&DocType::Onboarding], 0);
    assert_eq!(confidences[&DocType::Comprehensive], 0);
    assert_eq!(outcome.confidences, confidences);
}

#[tokio::test]
async fn test_confidence_grows_with_analyzed_share() {
    let mut mixed = ruby_files(9);
    mixed.push(SourceFile::detected("main.py", "def main():\n    pass\n"));
    let (outcome, mixed) = confidences(mixed).await;
    assert_eq!(outcome.parsed_files, 1);
    assert_eq!(outcome.unsupported_files, 9);
    assert_eq!(mixed[&DocType::Architecture], 10);

    let (_, half) = confidences(vec![
        SourceFile::detected("main.py", "def main():\n    pass\n"),
        SourceFile::detected("broken.py", "def broken(:\n    return\n"),
    ])
    .await;
    assert_eq!(half[&DocType::Architecture], 50);

    let (_, full) = confidences(vec![SourceFile::detected("main.py", "def main():\n    pass\n")]).await;
    assert_eq!(full[&DocType::Architecture], 100);

    for doc_type in [DocType::Architecture, DocType::Onboarding, DocType::Comprehensive] {
        assert!(mixed[&doc_type] <= half[&doc_type]);
        assert!(half[&doc_type] <= full[&doc_type]);
    }
}

#[tokio::test]
async fn test_neighbors_of_unknown_node() {
    let (manager, provider) = create_test_manager();
    provider.set_files(LOCATION, vec![SourceFile::detected("a.py", "def foo():\n    pass\n")]);
    let repo = analyze(&manager).await;

    for id in [
        NodeId::function(&repo.id, "a.py", "missing"),
        NodeId::function(&"other".parse().unwrap(), "a.py", "foo"),
        "not-a-node-id".to_string(),
    ] {
        match manager.neighbors(&id).await {
            Err(ManagerError::Knowledge(KnowledgeError::NodeNotFound(node))) => assert_eq!(node, id),
            other => panic!("expected NodeNotFound for {}, got {:?}", id, other.map(|n| n.neighbors.len())),
        }
    }

    let foo = manager
        .neighbors(&NodeId::function(&repo.id, "a.py", "foo"))
        .await
        .unwrap();
    assert_eq!(foo.neighbors.len(), 1);
    assert_eq!(foo.neighbors[0].id(), Some(NodeId::module(&repo.id, "a.py").as_str()));
}

#[tokio::test]
async fn test_analysis_is_deterministic() {
    let (manager, provider) = create_test_manager();
    provider.set_files(LOCATION, sample_project());

    let repo = analyze(&manager).await;
    let first = manager.snapshot(&repo.id).await.unwrap();
    let job_id = manager.start_analysis(&repo.id).await.unwrap();
    manager.wait(&job_id).await.unwrap();
    let second = manager.snapshot(&repo.id).await.unwrap();

    assert_eq!(first.generation + 1, second.generation);
    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.edges, second.edges);
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(ids(&first, NodeKind::Feature), ids(&second, NodeKind::Feature));

    // A second manager over the same content agrees too.
    let (other, other_provider) = create_test_manager();
    other_provider.set_files(LOCATION, sample_project());
    let repo = analyze(&other).await;
    let third = other.snapshot(&repo.id).await.unwrap();
    assert_eq!(first.fingerprint(), third.fingerprint());
}

#[tokio::test]
async fn test_sample_project_contents() {
    let (manager, provider) = create_test_manager();
    provider.set_files(LOCATION, sample_project());
    let repo = analyze(&manager).await;
    let snapshot = manager.snapshot(&repo.id).await.unwrap();

    // README.md has no parser and produces no module.
    assert_eq!(snapshot.count(NodeKind::Module), 3);
    assert_eq!(snapshot.count(NodeKind::Class), 1);
    assert!(snapshot
        .node(&NodeId::function(&repo.id, "app/auth.py", "SessionStore.get"))
        .is_some());

    let features = ids(&snapshot, NodeKind::Feature);
    assert!(features.contains(&NodeId::feature(&repo.id, "Authentication")));
    assert!(features.contains(&NodeId::feature(&repo.id, "Caching")));

    let apis = ids(&snapshot, NodeKind::Api);
    assert_eq!(apis.len(), 2);

    let documents = manager.documents(&repo.id).await.unwrap();
    let types: Vec<DocType> = documents.iter().map(|d| d.doc_type).collect();
    assert_eq!(types, DocType::ALL.to_vec());
    for document in &documents {
        assert_eq!(document.version, 1);
        assert_eq!(document.fingerprint, snapshot.fingerprint());
    }
}

#[tokio::test]
async fn test_no_orphans_and_sound_calls() {
    let (manager, provider) = create_test_manager();
    provider.set_files(LOCATION, sample_project());
    let repo = analyze(&manager).await;
    let snapshot = manager.snapshot(&repo.id).await.unwrap();

    let nodes: HashMap<&str, &GraphNode> = snapshot
        .nodes
        .iter()
        .filter_map(|n| n.id().map(|id| (id, n)))
        .collect();
    assert_eq!(nodes.len(), snapshot.nodes.len());

    // Every CALLS edge joins two functions of this snapshot.
    for edge in snapshot.edges.iter().filter(|e| e.relation == Relation::Calls) {
        assert_eq!(nodes.get(edge.from.as_str()).map(|n| n.kind()), Some(NodeKind::Function));
        assert_eq!(nodes.get(edge.to.as_str()).map(|n| n.kind()), Some(NodeKind::Function));
    }

    // Every node is reachable from the root over ownership edges.
    let root = NodeId::repository(&repo.id);
    let mut reached: HashSet<&str> = HashSet::from([root.as_str()]);
    let mut queue = VecDeque::from([root.as_str()]);
    while let Some(current) = queue.pop_front() {
        for edge in &snapshot.edges {
            if edge.relation.is_ownership() && edge.from == current && reached.insert(edge.to.as_str()) {
                queue.push_back(edge.to.as_str());
            }
        }
    }
    for id in nodes.keys() {
        assert!(reached.contains(id), "orphan node {}", id);
    }
}
