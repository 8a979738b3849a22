//! Configuration management for repograph.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `repograph.toml` file
//! 3. User config `~/.config/repograph/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

use crate::knowledge::{FeatureRule, FeatureRules, FEATURE_RULES_VERSION};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Job scheduling and content limits.
    pub analysis: AnalysisConfig,

    /// Heuristic rule tables.
    pub rules: RulesConfig,

    /// Document synthesis limits.
    pub documents: DocumentsConfig,

    /// Storage configuration.
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./repograph.toml` (project local)
    /// 2. `~/.config/repograph/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(LOCAL_CONFIG_FILE).exists() {
            return Self::from_file(LOCAL_CONFIG_FILE);
        }

        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// `<config_dir>/repograph/config.toml`, if the platform has a config dir.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(jobs) = std::env::var("REPOGRAPH_MAX_JOBS") {
            if let Ok(n) = jobs.parse() {
                self.analysis.max_concurrent_jobs = n;
            }
        }
        if let Ok(secs) = std::env::var("REPOGRAPH_JOB_TIMEOUT_SECS") {
            if let Ok(n) = secs.parse() {
                self.analysis.job_timeout_secs = n;
            }
        }
        if let Ok(limit) = std::env::var("REPOGRAPH_COMMIT_LIMIT") {
            if let Ok(n) = limit.parse() {
                self.analysis.commit_limit = n;
            }
        }

        // Storage overrides
        if let Ok(dir) = std::env::var("REPOGRAPH_DATA_DIR") {
            self.storage.data_dir = dir;
        }
    }

    /// Reject values the job scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid("analysis.max_concurrent_jobs must be at least 1".into()));
        }
        if self.analysis.extraction_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "analysis.extraction_concurrency must be at least 1".into(),
            ));
        }
        if self.analysis.job_timeout_secs == 0 {
            return Err(ConfigError::Invalid("analysis.job_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        Self::default().to_toml_string()
    }

    /// Render this configuration as TOML.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Job scheduling and repository content limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Jobs running at once; further jobs wait in `pending`.
    pub max_concurrent_jobs: usize,

    /// Wall-clock budget per job, in seconds.
    pub job_timeout_secs: u64,

    /// Files extracted in parallel within one job.
    pub extraction_concurrency: usize,

    /// Maximum size of a single file to read (in bytes).
    pub max_file_size: u64,

    /// Directories to exclude from scanning.
    pub exclude_dirs: Vec<String>,

    /// Most recent commits to read.
    pub commit_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            extraction_concurrency: DEFAULT_EXTRACTION_CONCURRENCY,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            commit_limit: DEFAULT_COMMIT_LIMIT,
        }
    }
}

impl AnalysisConfig {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

/// Versioned heuristic rule tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Version recorded on every Feature node.
    pub version: String,

    /// Whether the API detector runs at all.
    pub api_detection: bool,

    /// API rule names to switch off (e.g. "go-handlefunc").
    pub disabled_api_rules: Vec<String>,

    /// Feature labels and keywords, in priority order.
    pub features: Vec<FeatureRule>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        let table = FeatureRules::default();
        Self {
            version: table.version,
            api_detection: DEFAULT_API_DETECTION,
            disabled_api_rules: Vec::new(),
            features: table.rules,
        }
    }
}

impl RulesConfig {
    /// The feature table with keywords normalized to lower case.
    pub fn feature_rules(&self) -> FeatureRules {
        let version = if self.version.is_empty() {
            FEATURE_RULES_VERSION.to_string()
        } else {
            self.version.clone()
        };
        FeatureRules {
            version,
            rules: self
                .features
                .iter()
                .map(|rule| FeatureRule {
                    label: rule.label.clone(),
                    keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                })
                .collect(),
        }
    }
}

/// Document synthesis limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Commits classified for the changelog.
    pub changelog_commit_limit: usize,

    /// Commits listed under each changelog section.
    pub changelog_per_section: usize,

    /// Modules detailed in the architecture document.
    pub architecture_module_limit: usize,

    /// Key modules listed in the onboarding document.
    pub onboarding_module_limit: usize,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            changelog_commit_limit: DEFAULT_CHANGELOG_COMMIT_LIMIT,
            changelog_per_section: DEFAULT_CHANGELOG_PER_SECTION,
            architecture_module_limit: DEFAULT_ARCHITECTURE_MODULE_LIMIT,
            onboarding_module_limit: DEFAULT_ONBOARDING_MODULE_LIMIT,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for generated documents (default: ".repograph").
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}
