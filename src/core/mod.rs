//! Core configuration for prevc.
//!
//! Settings shared by every workflow operation: where the context lives,
//! gate defaults, scale thresholds and report limits.

mod config;

pub use config::{
    DefaultsConfig, PathsConfig, ReportConfig, ScaleConfig, WorkflowConfig, CONFIG_ENV,
    LOCAL_CONFIG_FILE,
};
