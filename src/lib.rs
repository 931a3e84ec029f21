//! # prevc
//!
//! Phase-gated workflow engine for structured development.
//!
//! A workflow walks a project through Plan, Review, Execute, Validate and
//! Confirm. The phases a project must visit depend on its scale, and gates
//! stop the workflow from leaving planning without a plan or review without
//! an approval.
//!
//! ## Features
//!
//! - **Scale Routing**: QUICK fixes skip straight to execution, ENTERPRISE work gets every phase
//! - **Gates**: Machine-readable failures with remediation hints
//! - **Handoffs**: Audit trail of work moving between roles and agents
//! - **Plans**: Link markdown plans and track step progress
//! - **Durable State**: One human-editable `status.yaml` per repository
//!
//! ## Quick Start
//!
//! ```bash
//! prevc init "Add login" --description "fix small bug in auth"
//! prevc status
//! prevc advance --outputs src/auth.rs
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::format_push_string)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_panics_doc)]

pub mod core;
pub mod gateway;
pub mod workflow;

// Re-export commonly used types
pub use crate::core::WorkflowConfig;
pub use gateway::{Gateway, GatewayResponse, WorkflowAction};
pub use workflow::{
    AdvanceOutcome, InitOptions, PhaseCode, ProjectScale, WorkflowError, WorkflowResult,
    WorkflowService, WorkflowStatus,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "prevc";
