//! Read-only views over the workflow status.

use serde::{Deserialize, Serialize};

use super::gates::{GateDecision, GateEvaluator};
use super::handoff::HandoffCoordinator;
use super::plans::{PlanLinker, PlanProgress};
use super::types::{
    HandoffRecord, PhaseCode, PhaseStatus, PlanItemStatus, ProjectScale, Role, WorkflowSettings, WorkflowStatus,
};

/// Compact summary of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub name: String,
    pub scale: ProjectScale,
    pub current_phase: PhaseCode,

    /// Route phases in order
    pub route: Vec<PhaseCode>,

    pub completed_phases: usize,
    pub total_phases: usize,
    pub percentage: u8,
    pub is_complete: bool,

    pub active_roles: Vec<String>,

    /// Newest first
    pub recent_handoffs: Vec<HandoffRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_plan: Option<PlanProgress>,

    pub decisions: usize,
    pub settings: WorkflowSettings,
}

impl WorkflowSummary {
    /// Build a summary listing at most `recent_handoffs` handoffs.
    pub fn from_status(status: &WorkflowStatus, recent_handoffs: usize) -> Self {
        let (completed_phases, total_phases) = status.progress();
        let percentage = if total_phases == 0 { 0 } else { (completed_phases * 100 / total_phases) as u8 };

        Self {
            name: status.project.name.clone(),
            scale: status.project.scale,
            current_phase: status.project.current_phase,
            route: status.route(),
            completed_phases,
            total_phases,
            percentage,
            is_complete: status.is_complete(),
            active_roles: status.active_roles().into_iter().map(str::to_string).collect(),
            recent_handoffs: HandoffCoordinator::recent(status, recent_handoffs).into_iter().cloned().collect(),
            active_plan: status.active_plan.as_deref().and_then(|slug| PlanLinker::progress(status, slug)),
            decisions: status.decisions.len(),
            settings: status.settings.clone(),
        }
    }
}

/// Multi-line human-readable status.
pub fn formatted_status(status: &WorkflowStatus, recent_handoffs: usize) -> String {
    let summary = WorkflowSummary::from_status(status, recent_handoffs);
    let mut out = String::new();

    out.push_str(&format!("Project: {} [{}]\n", summary.name, summary.scale));
    if let Some(description) = &status.project.description {
        out.push_str(&format!("Description: {description}\n"));
    }

    let route = summary
        .route
        .iter()
        .map(|code| match status.phase(*code).map(|p| p.status) {
            Some(PhaseStatus::Completed) => format!("[{code}]"),
            Some(PhaseStatus::InProgress) => format!(">{code}<"),
            _ => code.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" → ");
    out.push_str(&format!("Route: {route}\n"));

    if summary.is_complete {
        out.push_str(&format!("Status: complete ({}/{} phases)\n", summary.completed_phases, summary.total_phases));
    } else {
        out.push_str(&format!(
            "Phase: {} ({}) {}/{} phases, {}%\n",
            summary.current_phase,
            summary.current_phase.name(),
            summary.completed_phases,
            summary.total_phases,
            summary.percentage
        ));
    }

    if !summary.active_roles.is_empty() {
        out.push_str(&format!("Active: {}\n", summary.active_roles.join(", ")));
    }

    if let Some(plan) = &summary.active_plan {
        out.push_str(&format!(
            "Plan: {} ({}/{} steps, {}%)\n",
            plan.slug, plan.completed_steps, plan.total_steps, plan.percentage
        ));
    }

    let approval = status.approval_or_default();
    out.push_str(&format!(
        "Gates: plan {} / approval {}{}\n",
        mark(approval.plan_created, summary.settings.require_plan),
        mark(approval.plan_approved, summary.settings.require_approval),
        if summary.settings.autonomous_mode { " (autonomous)" } else { "" }
    ));

    if !summary.recent_handoffs.is_empty() {
        out.push_str("Recent handoffs:\n");
        for handoff in &summary.recent_handoffs {
            out.push_str(&format!("  {} → {} ({})", handoff.from, handoff.to, handoff.phase));
            if !handoff.artifacts.is_empty() {
                out.push_str(&format!(": {}", handoff.artifacts.join(", ")));
            }
            out.push('\n');
        }
    }

    out
}

fn mark(done: bool, required: bool) -> &'static str {
    match (done, required) {
        (true, _) => "done",
        (false, true) => "pending",
        (false, false) => "not required",
    }
}

/// Next steps for the operator, most urgent first.
pub fn recommended_actions(status: &WorkflowStatus) -> Vec<String> {
    if status.is_complete() {
        return vec!["Workflow complete. Start a new one with `init --archive-previous`".to_string()];
    }

    let current = status.project.current_phase;
    let next = status.next_phase_after(current);
    let mut actions = Vec::new();

    if let GateDecision::Blocked(failure) = GateEvaluator::evaluate(status, current, next, false) {
        actions.push(failure.hint);
    }

    if let Some(plan) = status.active_plan() {
        let pending = plan
            .phases
            .iter()
            .flat_map(|p| p.steps.iter().map(move |s| (p, s)))
            .find(|(_, s)| s.status != PlanItemStatus::Completed);
        if let Some((phase, step)) = pending {
            actions.push(format!(
                "Continue plan '{}': {} step {} ({})",
                plan.slug, phase.id, step.index, step.description
            ));
        }
    } else if current == PhaseCode::Plan && !status.plan_created() {
        actions.push("Write a plan and link it with `link_plan <slug>`".to_string());
    }

    let leads = Role::for_phase(current)
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    actions.push(format!("{} phase: {} (lead: {leads})", current.name(), current.description()));

    match next {
        Some(next) => actions.push(format!("Advance to {} ({}) when the phase is done", next, next.name())),
        None => actions.push("Advance to complete the workflow".to_string()),
    }

    actions
}
