//! Provider for a checkout on the local filesystem.

use std::fs;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use tracing::{debug, warn};

use super::{CommitRecord, ContentProvider, ProviderError, SourceFile};
use crate::config::AnalysisConfig;
use crate::repository::Repository;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

/// Reads files and history from a local directory.
///
/// The repository's `location` is the checkout root. Files are walked with
/// `.gitignore` honoured and hidden entries skipped; the commit log comes
/// from `git log` on the checked-out HEAD and is empty outside a git work
/// tree.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    exclude_dirs: Vec<String>,
    max_file_size: u64,
    commit_limit: usize,
}

impl LocalProvider {
    pub fn new() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            exclude_dirs: config.exclude_dirs.clone(),
            max_file_size: config.max_file_size,
            commit_limit: config.commit_limit,
        }
    }

    /// Adds a directory name to exclude.
    pub fn exclude_dir(mut self, dir: impl Into<String>) -> Self {
        self.exclude_dirs.push(dir.into());
        self
    }

    /// Sets the maximum file size in bytes.
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    fn root(repository: &Repository) -> Result<PathBuf, ProviderError> {
        let root = PathBuf::from(&repository.location);
        let metadata =
            fs::metadata(&root).map_err(|e| ProviderError::from_io(&repository.location, e))?;
        if !metadata.is_dir() {
            return Err(ProviderError::NotFound(format!(
                "{} is not a directory",
                repository.location
            )));
        }
        Ok(root)
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        relative.components().any(|c| match c {
            Component::Normal(name) => self
                .exclude_dirs
                .iter()
                .any(|d| name.to_str() == Some(d.as_str())),
            _ => false,
        })
    }

    fn walk(&self, root: &Path) -> Vec<SourceFile> {
        let mut files = Vec::new();

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            if self.is_excluded(relative) {
                continue;
            }

            let relative_path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            match fs::metadata(path) {
                Ok(metadata) if metadata.len() > self.max_file_size => {
                    debug!(path = %relative_path, size = metadata.len(), "file over size limit");
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %relative_path, error = %e, "failed to stat file");
                    continue;
                }
            }

            match fs::read_to_string(path) {
                Ok(content) => files.push(SourceFile::detected(relative_path, content)),
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    debug!(path = %relative_path, "skipping non-UTF-8 file");
                }
                Err(e) => {
                    warn!(path = %relative_path, error = %e, "failed to read file");
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentProvider for LocalProvider {
    async fn list_files(&self, repository: &Repository) -> Result<Vec<SourceFile>, ProviderError> {
        let root = Self::root(repository)?;
        let provider = self.clone();
        let files = tokio::task::spawn_blocking(move || provider.walk(&root))
            .await
            .map_err(|e| ProviderError::Unavailable(format!("file walk aborted: {}", e)))?;
        debug!(repository = %repository.id, files = files.len(), "listed files");
        Ok(files)
    }

    async fn commit_log(&self, repository: &Repository) -> Result<Vec<CommitRecord>, ProviderError> {
        let root = Self::root(repository)?;
        let format = format!("--format=%H{f}%an{f}%aI{f}%B{r}", f = "%x1f", r = "%x1e");

        let output = tokio::process::Command::new("git")
            .arg("-C")
            .arg(&root)
            .arg("log")
            .arg("-n")
            .arg(self.commit_limit.to_string())
            .arg(format)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!(repository = %repository.id, error = %e, "git unavailable, using empty history");
                return Ok(Vec::new());
            }
        };
        if !output.status.success() {
            debug!(repository = %repository.id, "no git history");
            return Ok(Vec::new());
        }

        Ok(parse_log(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `git log` output written with unit/record separators.
fn parse_log(raw: &str) -> Vec<CommitRecord> {
    raw.split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            if record.trim().is_empty() {
                return None;
            }
            let mut fields = record.splitn(4, FIELD_SEP);
            let id = fields.next()?.trim();
            let author = fields.next()?;
            let timestamp = DateTime::parse_from_rfc3339(fields.next()?.trim()).ok()?;
            let message = fields.next().unwrap_or("").trim();
            Some(CommitRecord::new(
                id,
                message,
                timestamp.with_timezone(&Utc),
                author,
            ))
        })
        .collect()
}
