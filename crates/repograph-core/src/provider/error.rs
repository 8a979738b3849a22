//! Content provider error types.

use thiserror::Error;

/// Errors raised while fetching repository content.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Repository, path or branch does not exist.
    #[error("Repository content not found: {0}")]
    NotFound(String),

    /// Credentials or permissions were rejected.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The source is temporarily unreachable.
    #[error("Content provider unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Classify an IO error against the location it concerned.
    pub fn from_io(location: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(location.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied(location.to_string()),
            _ => Self::Io(err),
        }
    }
}
