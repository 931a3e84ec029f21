//! Workflow error types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::gates::GateFailure;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Operation requires a workflow but none was initialized.
    #[error("No workflow initialized at {0}")]
    NoWorkflow(PathBuf),

    /// `init` called while a workflow already exists.
    #[error("Workflow '{0}' already exists; archive it to start a new one")]
    AlreadyInitialized(String),

    /// Unrecognized scale token.
    #[error("Invalid scale '{0}' (expected QUICK, SMALL, MEDIUM, LARGE or ENTERPRISE)")]
    InvalidScale(String),

    /// No scaffolded plan matches the requested slug.
    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    /// A gate blocked the phase transition.
    #[error("{0}")]
    WorkflowGate(GateFailure),

    /// Malformed caller input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Status document could not be read or written.
    #[error("Failed to access workflow status at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Status document exists but does not parse.
    #[error("Workflow status at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Configuration file could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NoWorkflow,
    AlreadyInitialized,
    InvalidScale,
    PlanNotFound,
    WorkflowGateError,
    InvalidArgument,
    PersistenceError,
    ConfigError,
}

impl WorkflowError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoWorkflow(_) => ErrorKind::NoWorkflow,
            Self::AlreadyInitialized(_) => ErrorKind::AlreadyInitialized,
            Self::InvalidScale(_) => ErrorKind::InvalidScale,
            Self::PlanNotFound(_) => ErrorKind::PlanNotFound,
            Self::WorkflowGate(_) => ErrorKind::WorkflowGateError,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Io { .. } | Self::Corrupt { .. } => ErrorKind::PersistenceError,
            Self::Config(_) => ErrorKind::ConfigError,
        }
    }

    /// Whether callers should render this as a structured failure rather
    /// than abort.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::PersistenceError | ErrorKind::ConfigError)
    }

    /// Remediation hint for the caller.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NoWorkflow(_) => Some("Run `workflow init <name>` first".to_string()),
            Self::AlreadyInitialized(_) => {
                Some("Re-run init with archive_previous to archive the current workflow".to_string())
            }
            Self::InvalidScale(_) => {
                Some("Use one of QUICK, SMALL, MEDIUM, LARGE, ENTERPRISE or omit the scale".to_string())
            }
            Self::PlanNotFound(slug) => {
                Some(format!("Scaffold the plan '{slug}' under the plans directory, then link it"))
            }
            Self::WorkflowGate(failure) => Some(failure.hint.clone()),
            Self::InvalidArgument(_) | Self::Io { .. } | Self::Corrupt { .. } | Self::Config(_) => {
                None
            }
        }
    }
}
