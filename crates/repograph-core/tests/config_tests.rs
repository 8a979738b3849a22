use std::sync::Arc;

use repograph_core::config::{
    ConfigError, DEFAULT_COMMIT_LIMIT, DEFAULT_DATA_DIR, DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_JOBS,
};
use repograph_core::knowledge::{NodeId, NodeKind};
use repograph_core::{AnalysisManager, Config, JobState, MemoryProvider, SourceFile};
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.analysis.max_concurrent_jobs, DEFAULT_MAX_CONCURRENT_JOBS);
    assert_eq!(config.analysis.job_timeout_secs, DEFAULT_JOB_TIMEOUT_SECS);
    assert_eq!(config.analysis.commit_limit, DEFAULT_COMMIT_LIMIT);
    assert_eq!(config.storage.data_dir, DEFAULT_DATA_DIR);
    assert!(config.rules.api_detection);
}

#[test]
fn test_config_to_toml() {
    let toml_str = Config::default().to_toml_string();
    assert!(toml_str.contains("[analysis]"));
    assert!(toml_str.contains("[rules]"));
    assert!(toml_str.contains("[documents]"));
    assert!(toml_str.contains("[storage]"));
}

#[test]
fn test_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("repograph.toml");
    std::fs::write(
        &path,
        r#"
[analysis]
max_concurrent_jobs = 2
exclude_dirs = ["vendor"]

[documents]
changelog_per_section = 3

[storage]
data_dir = ".custom-repograph"
"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.analysis.max_concurrent_jobs, 2);
    assert_eq!(config.analysis.exclude_dirs, vec!["vendor".to_string()]);
    assert_eq!(config.documents.changelog_per_section, 3);
    assert_eq!(config.storage.data_dir, ".custom-repograph");
    // Unset keys keep their defaults.
    assert_eq!(config.analysis.job_timeout_secs, DEFAULT_JOB_TIMEOUT_SECS);
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("repograph.toml");

    std::fs::write(&path, "[analysis]\nmax_concurrent_jobs = 0\n").unwrap();
    assert!(matches!(Config::from_file(&path), Err(ConfigError::Invalid(_))));

    std::fs::write(&path, "[analysis\n").unwrap();
    assert!(matches!(Config::from_file(&path), Err(ConfigError::ParseError(_))));

    assert!(matches!(
        Config::from_file(temp_dir.path().join("missing.toml")),
        Err(ConfigError::ReadError(_))
    ));
}

#[tokio::test]
async fn test_feature_table_from_config() {
    let config: Config = toml::from_str(
        r#"
[rules]
version = "billing-1"

[[rules.features]]
label = "Billing"
keywords = ["INVOICE"]
"#,
    )
    .unwrap();

    let provider = Arc::new(MemoryProvider::new());
    provider.set_files(
        "mem://billing",
        vec![SourceFile::detected(
            "billing.py",
            "def send_invoice():\n    pass\n\ndef login():\n    pass\n",
        )],
    );
    let manager = AnalysisManager::new(&config, provider);
    let repo = manager.register_repository("billing", "mem://billing", None).unwrap();
    let job_id = manager.start_analysis(&repo.id).await.unwrap();
    assert_eq!(manager.wait(&job_id).await.unwrap().state, JobState::Completed);

    let snapshot = manager.snapshot(&repo.id).await.unwrap();
    let features: Vec<&str> = snapshot
        .nodes
        .iter()
        .filter(|n| n.kind() == NodeKind::Feature)
        .filter_map(|n| n.id())
        .collect();
    assert_eq!(features, vec![NodeId::feature(&repo.id, "Billing").as_str()]);
}
