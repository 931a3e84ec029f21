//! PREVC workflow engine.
//!
//! Drives a project through the Plan, Review, Execute, Validate and Confirm
//! phases, with the route chosen by project scale.
//!
//! ## State
//!
//! - `status.yaml` - The persisted [`WorkflowStatus`] aggregate
//! - `archive/` - Previous workflows, moved aside by `init`
//!
//! ## Components
//!
//! - `ScaleRouter` - Picks the scale and its phase route
//! - `GateEvaluator` - Decides whether a phase transition may proceed
//! - `AgentOrchestrator` - Phase, role and task to agent lookups
//! - `HandoffCoordinator` - Audit trail of responsibility transfers
//! - `PlanLinker` - Binds plan documents and tracks their progress
//! - `WorkflowService` - The façade callers use

mod agents;
mod collaboration;
mod error;
mod gates;
mod handoff;
mod plans;
mod report;
mod scale;
mod service;
mod store;
mod types;

pub use agents::{AgentOrchestrator, AgentType};
pub use collaboration::{
    CollaborationManager, CollaborationSession, CollaborationSynthesis, Contribution,
    SessionSnapshot, SessionStatus,
};
pub use error::{ErrorKind, WorkflowError, WorkflowResult};
pub use gates::{GateDecision, GateEvaluator, GateFailure, GateKind, Transition};
pub use handoff::{HandoffCoordinator, HandoffOutcome};
pub use plans::{parse_plan, DecisionInput, PlanLink, PlanLinker, PlanProgress, PlanUpdate};
pub use report::{formatted_status, recommended_actions, WorkflowSummary};
pub use scale::{scale_route, Complexity, ScaleHints, ScaleRoute, ScaleRouter, Selection};
pub use service::{AdvanceOutcome, GateCheck, InitOptions, WorkflowService};
pub use store::{StatusStore, STATUS_FILE};
pub use types::{
    ApprovalRecord, DecisionRecord, DecisionStatus, HandoffRecord, PhaseCode, PhaseState,
    PhaseStatus, PlanApprovalStatus, PlanItemStatus, PlanPhaseRef, PlanRef, PlanStepRef,
    ProjectInfo, ProjectScale, Role, RoleState, RoleStatus, WorkflowSettings, WorkflowStatus,
};
