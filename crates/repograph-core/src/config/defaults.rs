//! Default values for repograph configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Analysis Defaults
// ============================================================================

/// Maximum number of analysis jobs running at once.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

/// Wall-clock budget of one analysis job (10 minutes).
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;

/// Files extracted in parallel within one job.
pub const DEFAULT_EXTRACTION_CONCURRENCY: usize = 8;

/// Maximum size of a single source file (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Most recent commits read from history.
pub const DEFAULT_COMMIT_LIMIT: usize = 100;

/// Directories never walked by the local provider.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Dependencies
    "node_modules",
    "vendor",
    "venv",
    ".venv",
    "env",
    "site-packages",
    "__pycache__",
    ".pytest_cache",
    ".tox",
    // Build outputs
    "target",
    "build",
    "dist",
    "out",
    "bin",
    "obj",
    // IDE/Editor
    ".idea",
    ".vscode",
    // repograph's own data
    ".repograph",
    // Other common excludes
    "coverage",
    ".next",
    ".nuxt",
    ".cache",
];

// ============================================================================
// Rules Defaults
// ============================================================================

/// API detection is on unless disabled.
pub const DEFAULT_API_DETECTION: bool = true;

// ============================================================================
// Document Defaults
// ============================================================================

/// Commits considered by the changelog.
pub const DEFAULT_CHANGELOG_COMMIT_LIMIT: usize = 50;

/// Commits listed per changelog section.
pub const DEFAULT_CHANGELOG_PER_SECTION: usize = 10;

/// Modules detailed in the architecture document.
pub const DEFAULT_ARCHITECTURE_MODULE_LIMIT: usize = 50;

/// Key modules suggested by the onboarding document.
pub const DEFAULT_ONBOARDING_MODULE_LIMIT: usize = 5;

/// Nodes returned for an initial graph display.
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 500;

// ============================================================================
// Storage Defaults
// ============================================================================

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = ".repograph";

/// Project-local config file name.
pub const LOCAL_CONFIG_FILE: &str = "repograph.toml";

/// Directory under the user config dir.
pub const USER_CONFIG_DIR: &str = "repograph";

/// User config file name.
pub const USER_CONFIG_FILE: &str = "config.toml";
