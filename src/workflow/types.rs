//! Workflow status document structures.
//!
//! Defines the aggregate persisted in `status.yaml` and the enums it is
//! keyed by. Every enum serializes to a stable string so external tools can
//! read and edit the document by hand.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::WorkflowError;

/// A PREVC phase code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PhaseCode {
    /// Plan
    #[serde(rename = "P")]
    Plan,
    /// Review
    #[serde(rename = "R")]
    Review,
    /// Execute
    #[serde(rename = "E")]
    Execute,
    /// Validate
    #[serde(rename = "V")]
    Validate,
    /// Confirm
    #[serde(rename = "C")]
    Confirm,
}

impl PhaseCode {
    /// All phases in canonical PREVC order.
    pub const ALL: [Self; 5] =
        [Self::Plan, Self::Review, Self::Execute, Self::Validate, Self::Confirm];

    /// Single-letter code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Plan => "P",
            Self::Review => "R",
            Self::Execute => "E",
            Self::Validate => "V",
            Self::Confirm => "C",
        }
    }

    /// Human-readable phase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plan => "Plan",
            Self::Review => "Review",
            Self::Execute => "Execute",
            Self::Validate => "Validate",
            Self::Confirm => "Confirm",
        }
    }

    /// Short description of what happens in the phase.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Plan => "Define requirements, scope and a written plan",
            Self::Review => "Review the plan and architecture before building",
            Self::Execute => "Implement the planned changes",
            Self::Validate => "Test and verify the implementation",
            Self::Confirm => "Document, release and hand over",
        }
    }
}

impl fmt::Display for PhaseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PhaseCode {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "p" | "plan" | "planning" => Ok(Self::Plan),
            "r" | "review" => Ok(Self::Review),
            "e" | "execute" | "execution" => Ok(Self::Execute),
            "v" | "validate" | "validation" => Ok(Self::Validate),
            "c" | "confirm" | "confirmation" => Ok(Self::Confirm),
            _ => Err(WorkflowError::InvalidArgument(format!("unknown phase '{s}'"))),
        }
    }
}

/// Coarse project sizing that determines the mandatory phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectScale {
    Quick,
    Small,
    Medium,
    Large,
    Enterprise,
}

impl ProjectScale {
    /// Every scale, smallest first.
    pub const ALL: [Self; 5] =
        [Self::Quick, Self::Small, Self::Medium, Self::Large, Self::Enterprise];

    /// Upper-case name as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "QUICK",
            Self::Small => "SMALL",
            Self::Medium => "MEDIUM",
            Self::Large => "LARGE",
            Self::Enterprise => "ENTERPRISE",
        }
    }
}

impl fmt::Display for ProjectScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectScale {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "QUICK" => Ok(Self::Quick),
            "SMALL" => Ok(Self::Small),
            "MEDIUM" => Ok(Self::Medium),
            "LARGE" => Ok(Self::Large),
            "ENTERPRISE" => Ok(Self::Enterprise),
            _ => Err(WorkflowError::InvalidScale(s.to_string())),
        }
    }
}

/// A workflow role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Planner,
    Designer,
    Architect,
    Developer,
    Qa,
    Reviewer,
    Documenter,
    SoloDev,
}

impl Role {
    /// Every role.
    pub const ALL: [Self; 8] = [
        Self::Planner,
        Self::Designer,
        Self::Architect,
        Self::Developer,
        Self::Qa,
        Self::Reviewer,
        Self::Documenter,
        Self::SoloDev,
    ];

    /// Kebab-case identifier as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Designer => "designer",
            Self::Architect => "architect",
            Self::Developer => "developer",
            Self::Qa => "qa",
            Self::Reviewer => "reviewer",
            Self::Documenter => "documenter",
            Self::SoloDev => "solo-dev",
        }
    }

    /// Roles that lead a phase.
    pub fn for_phase(phase: PhaseCode) -> &'static [Self] {
        match phase {
            PhaseCode::Plan => &[Self::Planner, Self::Designer],
            PhaseCode::Review => &[Self::Architect, Self::Reviewer],
            PhaseCode::Execute => &[Self::Developer],
            PhaseCode::Validate => &[Self::Qa],
            PhaseCode::Confirm => &[Self::Documenter],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| WorkflowError::InvalidArgument(format!("unknown role '{s}'")))
    }
}

/// Phase status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl Default for PhaseStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Role status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    Idle,
    Active,
    Completed,
}

impl Default for RoleStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// Project header of the status document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Project name
    pub name: String,

    /// Brief description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Active scale
    pub scale: ProjectScale,

    /// Phase the workflow is in (the final phase once complete)
    pub current_phase: PhaseCode,

    /// When `init` ran
    pub created_at: DateTime<Utc>,

    /// Set when the final phase is advanced past
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// State of a single phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    pub code: PhaseCode,

    #[serde(default)]
    pub status: PhaseStatus,

    /// Artifacts produced while the phase was active
    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PhaseState {
    /// Create a phase in the given status.
    pub fn new(code: PhaseCode, status: PhaseStatus) -> Self {
        Self { code, status, outputs: Vec::new(), started_at: None, completed_at: None }
    }
}

/// State of a role or agent taking part in the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleState {
    /// Role or agent identifier
    pub role: String,

    #[serde(default)]
    pub status: RoleStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_handoff_at: Option<DateTime<Utc>>,
}

impl RoleState {
    /// Create an idle role.
    pub fn idle(role: impl Into<String>) -> Self {
        Self { role: role.into(), status: RoleStatus::Idle, last_handoff_at: None }
    }
}

/// Gate-related workflow settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Bypass all gates
    pub autonomous_mode: bool,

    /// Leaving P requires a linked plan
    pub require_plan: bool,

    /// Leaving R requires an approved plan
    pub require_approval: bool,
}

/// Plan creation and approval state.
///
/// `plan_approved` implies `plan_created`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalRecord {
    pub plan_created: bool,

    pub plan_approved: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_notes: Option<String>,
}

/// Approval status of a linked plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanApprovalStatus {
    Pending,
    Approved,
}

impl Default for PlanApprovalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Progress status of a plan phase or step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanItemStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl Default for PlanItemStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl FromStr for PlanItemStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" | "active" => Ok(Self::InProgress),
            "completed" | "done" | "complete" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            _ => Err(WorkflowError::InvalidArgument(format!("unknown status '{s}'"))),
        }
    }
}

/// A step inside a plan phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStepRef {
    /// 1-based position within the phase
    pub index: usize,

    pub description: String,

    #[serde(default)]
    pub status: PlanItemStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A phase of a linked plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanPhaseRef {
    /// Stable identifier (`phase-1`, `phase-2`, ...)
    pub id: String,

    pub name: String,

    /// PREVC phase this plan phase belongs to, if declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prevc: Option<PhaseCode>,

    #[serde(default)]
    pub status: PlanItemStatus,

    #[serde(default)]
    pub steps: Vec<PlanStepRef>,
}

/// A plan document bound to the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRef {
    pub slug: String,

    pub title: String,

    #[serde(default)]
    pub phases: Vec<PlanPhaseRef>,

    #[serde(default)]
    pub approval_status: PlanApprovalStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_at: Option<DateTime<Utc>>,
}

impl PlanRef {
    /// Count of (completed, total) steps across all phases.
    pub fn progress(&self) -> (usize, usize) {
        let steps = self.phases.iter().flat_map(|p| p.steps.iter());
        steps.fold((0, 0), |(done, total), step| {
            let done = done + usize::from(step.status == PlanItemStatus::Completed);
            (done, total + 1)
        })
    }
}

/// Audit entry for a transfer of responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffRecord {
    pub from: String,

    pub to: String,

    #[serde(default)]
    pub artifacts: Vec<String>,

    /// Phase the workflow was in
    pub phase: PhaseCode,

    pub at: DateTime<Utc>,
}

/// Status of an architecture decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Accepted,
}

/// Append-only architecture decision entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Sequential identifier (`ADR-001`)
    pub id: String,

    pub title: String,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<PhaseCode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,

    pub status: DecisionStatus,

    /// Plan that was active when the decision was made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,

    pub decided_at: DateTime<Utc>,
}

/// Root aggregate persisted once per repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub project: ProjectInfo,

    /// All five phases, keyed by code
    pub phases: BTreeMap<PhaseCode, PhaseState>,

    /// Roles and agents, keyed by identifier
    #[serde(default)]
    pub roles: BTreeMap<String, RoleState>,

    #[serde(default)]
    pub settings: WorkflowSettings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalRecord>,

    #[serde(default)]
    pub linked_plans: Vec<PlanRef>,

    /// Slug of the plan that satisfies the planning gate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_plan: Option<String>,

    #[serde(default)]
    pub handoffs: Vec<HandoffRecord>,

    #[serde(default)]
    pub decisions: Vec<DecisionRecord>,
}

impl WorkflowStatus {
    /// Whether the final phase has been advanced past.
    pub fn is_complete(&self) -> bool {
        self.project.completed_at.is_some()
    }

    /// State of a phase.
    pub fn phase(&self, code: PhaseCode) -> Option<&PhaseState> {
        self.phases.get(&code)
    }

    /// State of the current phase.
    pub fn current(&self) -> Option<&PhaseState> {
        self.phases.get(&self.project.current_phase)
    }

    /// Phases that are part of the route, in PREVC order.
    pub fn route(&self) -> Vec<PhaseCode> {
        self.phases
            .values()
            .filter(|p| p.status != PhaseStatus::Skipped)
            .map(|p| p.code)
            .collect()
    }

    /// Next route phase after `phase`, following the persisted phases.
    pub fn next_phase_after(&self, phase: PhaseCode) -> Option<PhaseCode> {
        self.route().into_iter().find(|p| *p > phase)
    }

    /// Approval record, treating a missing record as all-false.
    pub fn approval_or_default(&self) -> ApprovalRecord {
        self.approval.clone().unwrap_or_default()
    }

    /// Whether a plan has been created or linked.
    pub fn plan_created(&self) -> bool {
        self.approval.as_ref().is_some_and(|a| a.plan_created)
    }

    /// Whether the plan has been approved.
    pub fn plan_approved(&self) -> bool {
        self.approval.as_ref().is_some_and(|a| a.plan_approved)
    }

    /// The active linked plan.
    pub fn active_plan(&self) -> Option<&PlanRef> {
        let slug = self.active_plan.as_deref()?;
        self.linked_plans.iter().find(|p| p.slug == slug)
    }

    /// Roles or agents currently active.
    pub fn active_roles(&self) -> Vec<&str> {
        self.roles
            .values()
            .filter(|r| r.status == RoleStatus::Active)
            .map(|r| r.role.as_str())
            .collect()
    }

    /// Number of route phases completed and in the route.
    pub fn progress(&self) -> (usize, usize) {
        let route = self.phases.values().filter(|p| p.status != PhaseStatus::Skipped);
        route.fold((0, 0), |(done, total), phase| {
            (done + usize::from(phase.status == PhaseStatus::Completed), total + 1)
        })
    }
}
