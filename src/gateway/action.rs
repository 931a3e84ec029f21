//! Closed set of gateway actions.

use serde::{Deserialize, Serialize};

use crate::workflow::{DecisionInput, InitOptions, PhaseCode, PlanItemStatus, Role};

/// An operation requested by an agent, tagged by `action`.
///
/// ```json
/// {"action": "handoff", "from": "feature-developer", "to": "test-writer"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorkflowAction {
    Init(InitOptions),
    Status,
    Summary,
    FormattedStatus,
    RecommendedActions,
    CheckGates,
    Advance {
        #[serde(default)]
        outputs: Vec<String>,
        #[serde(default)]
        force: bool,
    },
    Handoff {
        from: String,
        to: String,
        #[serde(default)]
        artifacts: Vec<String>,
    },
    StartCollaboration {
        topic: String,
        #[serde(default)]
        participants: Option<Vec<Role>>,
    },
    Contribute {
        session_id: String,
        role: Role,
        message: String,
    },
    Synthesize {
        session_id: String,
    },
    ApprovePlan {
        #[serde(default)]
        approved_by: Option<String>,
        #[serde(default)]
        notes: Option<String>,
    },
    MarkPlanCreated,
    SetAutonomousMode {
        enabled: bool,
    },
    LinkPlan {
        slug: String,
    },
    UpdatePlanPhase {
        slug: String,
        phase_id: String,
        status: PlanItemStatus,
    },
    UpdatePlanStep {
        slug: String,
        phase_id: String,
        step_index: usize,
        status: PlanItemStatus,
        #[serde(default)]
        notes: Option<String>,
    },
    RecordDecision(DecisionInput),
    PlanProgress {
        slug: String,
    },
    ListPlans,
    AgentsForPhase {
        phase: PhaseCode,
    },
    SelectAgents {
        task: String,
        #[serde(default = "default_include_review")]
        include_review: bool,
    },
}

fn default_include_review() -> bool {
    true
}

/// Name and description of an action, for tool listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Every action the gateway accepts.
pub const ACTIONS: &[ActionSpec] = &[
    ActionSpec { name: "init", description: "Start a workflow (name, description?, scale?, archive_previous?)" },
    ActionSpec { name: "status", description: "Full workflow status document" },
    ActionSpec { name: "summary", description: "Compact progress summary" },
    ActionSpec { name: "formatted_status", description: "Human-readable status text" },
    ActionSpec { name: "recommended_actions", description: "Suggested next steps" },
    ActionSpec { name: "check_gates", description: "Preview whether advance would succeed" },
    ActionSpec { name: "advance", description: "Complete the current phase (outputs?, force?)" },
    ActionSpec { name: "handoff", description: "Transfer work between roles or agents (from, to, artifacts?)" },
    ActionSpec { name: "start_collaboration", description: "Open a discussion session (topic, participants?)" },
    ActionSpec { name: "contribute", description: "Add to a session (session_id, role, message)" },
    ActionSpec { name: "synthesize", description: "Conclude a session (session_id)" },
    ActionSpec { name: "approve_plan", description: "Approve the active plan (approved_by?, notes?)" },
    ActionSpec { name: "mark_plan_created", description: "Record that a plan exists" },
    ActionSpec { name: "set_autonomous_mode", description: "Toggle gate bypass (enabled)" },
    ActionSpec { name: "link_plan", description: "Link a scaffolded plan (slug)" },
    ActionSpec { name: "update_plan_phase", description: "Set a plan phase status (slug, phase_id, status)" },
    ActionSpec {
        name: "update_plan_step",
        description: "Set a plan step status (slug, phase_id, step_index, status, notes?)",
    },
    ActionSpec { name: "record_decision", description: "Append an architecture decision (title, description)" },
    ActionSpec { name: "plan_progress", description: "Step progress of a linked plan (slug)" },
    ActionSpec { name: "list_plans", description: "Scaffolded plan slugs" },
    ActionSpec { name: "agents_for_phase", description: "Agents recommended for a phase (phase)" },
    ActionSpec { name: "select_agents", description: "Agent sequence for a task (task, include_review?)" },
];

impl WorkflowAction {
    /// Snake-case action name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Status => "status",
            Self::Summary => "summary",
            Self::FormattedStatus => "formatted_status",
            Self::RecommendedActions => "recommended_actions",
            Self::CheckGates => "check_gates",
            Self::Advance { .. } => "advance",
            Self::Handoff { .. } => "handoff",
            Self::StartCollaboration { .. } => "start_collaboration",
            Self::Contribute { .. } => "contribute",
            Self::Synthesize { .. } => "synthesize",
            Self::ApprovePlan { .. } => "approve_plan",
            Self::MarkPlanCreated => "mark_plan_created",
            Self::SetAutonomousMode { .. } => "set_autonomous_mode",
            Self::LinkPlan { .. } => "link_plan",
            Self::UpdatePlanPhase { .. } => "update_plan_phase",
            Self::UpdatePlanStep { .. } => "update_plan_step",
            Self::RecordDecision(_) => "record_decision",
            Self::PlanProgress { .. } => "plan_progress",
            Self::ListPlans => "list_plans",
            Self::AgentsForPhase { .. } => "agents_for_phase",
            Self::SelectAgents { .. } => "select_agents",
        }
    }

    /// Whether the action may change the status document.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Init(_)
                | Self::Advance { .. }
                | Self::Handoff { .. }
                | Self::ApprovePlan { .. }
                | Self::MarkPlanCreated
                | Self::SetAutonomousMode { .. }
                | Self::LinkPlan { .. }
                | Self::UpdatePlanPhase { .. }
                | Self::UpdatePlanStep { .. }
                | Self::RecordDecision(_)
        )
    }
}
