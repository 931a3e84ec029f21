//! Role and agent handoffs.
//!
//! A handoff moves active responsibility from one participant to another and
//! appends an audit record. Roles are never closed for good: a later handoff
//! may reactivate a participant that already completed its part.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::agents::{AgentOrchestrator, AgentType};
use super::error::{WorkflowError, WorkflowResult};
use super::types::{HandoffRecord, Role, RoleState, RoleStatus, WorkflowStatus};

/// Result of a handoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffOutcome {
    pub record: HandoffRecord,

    /// Advisory suggestion for who picks up next; never enforced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_next_agent: Option<AgentType>,
}

/// Records transfers of responsibility on a status aggregate.
pub struct HandoffCoordinator;

impl HandoffCoordinator {
    /// Hand off from `from` to `to` carrying `artifacts`.
    ///
    /// Does not evaluate gates.
    pub fn handoff(
        status: &mut WorkflowStatus,
        from: &str,
        to: &str,
        artifacts: Vec<String>,
    ) -> WorkflowResult<HandoffOutcome> {
        let from = normalize(from, "from")?;
        let to = normalize(to, "to")?;
        if from == to {
            return Err(WorkflowError::InvalidArgument(format!("cannot hand off '{from}' to itself")));
        }

        let now = Utc::now();
        let phase = status.project.current_phase;

        Self::set_role(status, &from, RoleStatus::Completed, now);
        Self::set_role(status, &to, RoleStatus::Active, now);

        let record = HandoffRecord { from, to, artifacts, phase, at: now };
        status.handoffs.push(record.clone());

        let suggested_next_agent = Self::suggest_next(&record.to, phase);
        tracing::info!(
            from = %record.from,
            to = %record.to,
            artifacts = record.artifacts.len(),
            %phase,
            "Recorded handoff"
        );

        Ok(HandoffOutcome { record, suggested_next_agent })
    }

    /// Most recent handoffs, newest first.
    pub fn recent(status: &WorkflowStatus, limit: usize) -> Vec<&HandoffRecord> {
        status.handoffs.iter().rev().take(limit).collect()
    }

    fn set_role(status: &mut WorkflowStatus, id: &str, new_status: RoleStatus, now: chrono::DateTime<Utc>) {
        let state = status.roles.entry(id.to_string()).or_insert_with(|| RoleState::idle(id));
        state.status = new_status;
        state.last_handoff_at = Some(now);
    }

    fn suggest_next(to: &str, phase: super::types::PhaseCode) -> Option<AgentType> {
        if let Ok(agent) = to.parse::<AgentType>() {
            return AgentOrchestrator::next_agent(Some(agent), phase);
        }
        to.parse::<Role>()
            .ok()
            .and_then(|role| AgentOrchestrator::agents_for_role(role).first().copied())
    }
}

fn normalize(id: &str, field: &str) -> WorkflowResult<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(WorkflowError::InvalidArgument(format!("handoff '{field}' must not be empty")));
    }
    Ok(id.to_lowercase())
}
