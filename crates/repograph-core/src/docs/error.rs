use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during document storage operations.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid document file: {0}")]
    InvalidFile(PathBuf),

    #[error("Document store task failed: {0}")]
    Join(String),
}

impl DocumentStoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocumentStoreError::Io {
            path: path.into(),
            source,
        }
    }
}
