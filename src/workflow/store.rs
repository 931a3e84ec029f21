//! Durable storage for the workflow status document.
//!
//! One YAML document per repository. Writes go to a temp file that is then
//! renamed over the original, so an interrupted write leaves the previous
//! document in place. Concurrent writers are not merged: the last rename wins.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::error::{WorkflowError, WorkflowResult};
use super::types::WorkflowStatus;

/// File name of the status document inside the workflow directory.
pub const STATUS_FILE: &str = "status.yaml";

/// Read/modify/write access to `status.yaml`.
#[derive(Debug, Clone)]
pub struct StatusStore {
    /// Workflow directory (`<context_root>/workflow`)
    dir: PathBuf,
}

impl StatusStore {
    /// Create a store rooted at a workflow directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the status document.
    pub fn path(&self) -> PathBuf {
        self.dir.join(STATUS_FILE)
    }

    /// Directory archived documents are moved to.
    pub fn archive_dir(&self) -> PathBuf {
        self.dir.join("archive")
    }

    /// Whether a status document exists.
    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Load the status document, or `None` if there is none.
    ///
    /// A document that exists but fails to parse is an error; it is never
    /// replaced by defaults.
    pub fn load(&self) -> WorkflowResult<Option<WorkflowStatus>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&path).map_err(|source| WorkflowError::Io { path: path.clone(), source })?;
        let status: WorkflowStatus = serde_yaml::from_str(&content)
            .map_err(|source| WorkflowError::Corrupt { path: path.clone(), source })?;

        tracing::debug!(path = %path.display(), phase = %status.project.current_phase, "Loaded workflow status");
        Ok(Some(status))
    }

    /// Load the status document, failing with `NoWorkflow` if absent.
    pub fn load_required(&self, repo: &Path) -> WorkflowResult<WorkflowStatus> {
        self.load()?.ok_or_else(|| WorkflowError::NoWorkflow(repo.to_path_buf()))
    }

    /// Persist the status document atomically.
    pub fn save(&self, status: &WorkflowStatus) -> WorkflowResult<()> {
        let path = self.path();
        let content = serde_yaml::to_string(status)
            .map_err(|source| WorkflowError::Corrupt { path: path.clone(), source })?;

        fs::create_dir_all(&self.dir)
            .map_err(|source| WorkflowError::Io { path: self.dir.clone(), source })?;
        write_file_atomic(&path, &content)?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "Saved workflow status");
        Ok(())
    }

    /// Move the current document into the archive directory.
    ///
    /// Returns the archive path, or `None` if there was nothing to archive.
    pub fn archive(&self) -> WorkflowResult<Option<PathBuf>> {
        let Some(status) = self.load()? else {
            return Ok(None);
        };

        let archive_dir = self.archive_dir();
        fs::create_dir_all(&archive_dir)
            .map_err(|source| WorkflowError::Io { path: archive_dir.clone(), source })?;

        let stamp = Utc::now().format("%Y%m%d-%H%M%S%3f");
        let target = archive_dir.join(format!("{}-{stamp}.yaml", slugify(&status.project.name)));
        let source_path = self.path();
        fs::rename(&source_path, &target)
            .map_err(|source| WorkflowError::Io { path: source_path.clone(), source })?;

        tracing::info!(archive = %target.display(), project = %status.project.name, "Archived workflow");
        Ok(Some(target))
    }
}

/// Write a file atomically (write to temp, then rename).
fn write_file_atomic(path: &Path, content: &str) -> WorkflowResult<()> {
    let temp_path = path.with_extension("yaml.tmp");

    fs::write(&temp_path, content)
        .map_err(|source| WorkflowError::Io { path: temp_path.clone(), source })?;

    // Rename to final location (atomic on most systems)
    fs::rename(&temp_path, path).map_err(|source| WorkflowError::Io { path: path.to_path_buf(), source })
}

pub(crate) fn slugify(s: &str) -> String {
    let slug = s
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "workflow".to_string()
    } else {
        slug
    }
}
