//! Configuration management for PREVC.
//!
//! Handles loading configuration from TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::workflow::{WorkflowError, WorkflowResult};

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "PREVC_CONFIG";

/// Name of the per-repository config file.
pub const LOCAL_CONFIG_FILE: &str = ".prevc.toml";

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Filesystem layout
    pub paths: PathsConfig,

    /// Defaults applied by `init` when an option is omitted
    pub defaults: DefaultsConfig,

    /// Scale inference thresholds
    pub scale: ScaleConfig,

    /// Summary/report settings
    pub report: ReportConfig,
}

/// Filesystem layout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Context root, relative to the repository
    pub context_root: PathBuf,

    /// Plans directory, relative to the context root
    pub plans_dir: PathBuf,
}

/// Workflow defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Start new workflows in autonomous mode
    pub autonomous_mode: bool,

    /// Require a linked plan before leaving P, when the route has a P phase
    pub require_plan: bool,
}

/// Scale inference thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// At or below this many files a change is QUICK
    pub quick_max_files: usize,

    /// At or below this many files a simple feature is SMALL
    pub small_max_files: usize,

    /// Above this many files a change is LARGE
    pub large_min_files: usize,
}

/// Report settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of recent handoffs shown in summaries
    pub recent_handoffs: usize,
}

impl WorkflowConfig {
    /// Load configuration for a repository.
    ///
    /// Resolution order: `$PREVC_CONFIG`, `<repo>/.prevc.toml`, the global
    /// config file, then defaults.
    pub fn load(repo: &Path) -> WorkflowResult<Self> {
        match Self::source_path(repo) {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// File [`load`](Self::load) reads for `repo`, or `None` when the
    /// defaults apply.
    pub fn source_path(repo: &Path) -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        let local_config = repo.join(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        Self::global_config_path().filter(|global| global.exists())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> WorkflowResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WorkflowError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| WorkflowError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Path of the global config file.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("prevc").join("config.toml"))
    }

    /// Absolute context root for a repository.
    pub fn context_root(&self, repo: &Path) -> PathBuf {
        repo.join(&self.paths.context_root)
    }

    /// Absolute plans directory for a repository.
    pub fn plans_dir(&self, repo: &Path) -> PathBuf {
        self.context_root(repo).join(&self.paths.plans_dir)
    }

    /// Absolute workflow directory (status document, archive).
    pub fn workflow_dir(&self, repo: &Path) -> PathBuf {
        self.context_root(repo).join("workflow")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { context_root: PathBuf::from(".context"), plans_dir: PathBuf::from("plans") }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self { autonomous_mode: false, require_plan: true }
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self { quick_max_files: 3, small_max_files: 10, large_min_files: 30 }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { recent_handoffs: 5 }
    }
}
