//! Agent-facing gateway.
//!
//! Wraps [`WorkflowService`] in a closed set of JSON actions. Every
//! recoverable failure comes back as a `success: false` envelope with a
//! machine-readable error, so an autonomous caller can remediate and retry.
//! Persistence and configuration failures are returned as `Err`.

mod action;
mod response;

pub use action::{ActionSpec, WorkflowAction, ACTIONS};
pub use response::{GatewayError, GatewayResponse};

use serde::Serialize;
use serde_json::{json, Value};

use crate::workflow::{
    AdvanceOutcome, AgentOrchestrator, ErrorKind, WorkflowError, WorkflowResult, WorkflowService,
};

/// Dispatches [`WorkflowAction`]s to a service.
#[derive(Debug)]
pub struct Gateway {
    service: WorkflowService,
}

impl Gateway {
    pub fn new(service: WorkflowService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &WorkflowService {
        &self.service
    }

    /// Parse and dispatch a JSON action.
    pub fn dispatch_json(&mut self, input: &str) -> WorkflowResult<GatewayResponse> {
        match serde_json::from_str::<WorkflowAction>(input) {
            Ok(action) => self.dispatch(action),
            Err(e) => Ok(GatewayResponse::failure(GatewayError {
                kind: ErrorKind::InvalidArgument,
                message: format!("invalid action: {e}"),
                gate: None,
                transition: None,
                hint: Some(format!(
                    "Expected {{\"action\": ...}} with one of: {}",
                    ACTIONS.iter().map(|a| a.name).collect::<Vec<_>>().join(", ")
                )),
            })),
        }
    }

    /// Run an action.
    pub fn dispatch(&mut self, action: WorkflowAction) -> WorkflowResult<GatewayResponse> {
        let name = action.name();
        tracing::debug!(action = name, "Dispatching gateway action");

        match self.run(action) {
            Ok(response) => Ok(response),
            Err(err) if err.is_recoverable() => {
                tracing::info!(action = name, kind = ?err.kind(), "Gateway action failed");
                Ok(GatewayResponse::failure(GatewayError::from(&err)))
            }
            Err(err) => Err(err),
        }
    }

    fn run(&mut self, action: WorkflowAction) -> WorkflowResult<GatewayResponse> {
        let service = &mut self.service;
        match action {
            WorkflowAction::Init(options) => ok(service.init(options)?),
            WorkflowAction::Status => ok(service.status()?),
            WorkflowAction::Summary => ok(service.summary()?),
            WorkflowAction::FormattedStatus => ok(json!({ "text": service.formatted_status()? })),
            WorkflowAction::RecommendedActions => ok(json!({ "actions": service.recommended_actions()? })),
            WorkflowAction::CheckGates => ok(service.check_gates()?),
            WorkflowAction::Advance { outputs, force } => advance_response(service.advance(outputs, force)?),
            WorkflowAction::Handoff { from, to, artifacts } => ok(service.handoff(&from, &to, artifacts)?),
            WorkflowAction::StartCollaboration { topic, participants } => {
                ok(service.start_collaboration(&topic, participants)?)
            }
            WorkflowAction::Contribute { session_id, role, message } => {
                ok(service.contribute(&session_id, role, &message)?)
            }
            WorkflowAction::Synthesize { session_id } => ok(service.synthesize(&session_id)?),
            WorkflowAction::ApprovePlan { approved_by, notes } => ok(service.approve_plan(approved_by, notes)?),
            WorkflowAction::MarkPlanCreated => ok(service.mark_plan_created()?),
            WorkflowAction::SetAutonomousMode { enabled } => ok(service.set_autonomous_mode(enabled)?),
            WorkflowAction::LinkPlan { slug } => ok(service.link_plan(&slug)?),
            WorkflowAction::UpdatePlanPhase { slug, phase_id, status } => {
                update_response(service.update_plan_phase(&slug, &phase_id, status)?)
            }
            WorkflowAction::UpdatePlanStep { slug, phase_id, step_index, status, notes } => {
                update_response(service.update_plan_step(&slug, &phase_id, step_index, status, notes)?)
            }
            WorkflowAction::RecordDecision(input) => ok(service.record_decision(input)?),
            WorkflowAction::PlanProgress { slug } => match service.plan_progress(&slug)? {
                Some(progress) => ok(progress),
                None => Err(WorkflowError::PlanNotFound(slug)),
            },
            WorkflowAction::ListPlans => ok(json!({ "plans": service.list_available_plans() })),
            WorkflowAction::AgentsForPhase { phase } => ok(json!({
                "phase": phase,
                "agents": AgentOrchestrator::agents_for_phase(phase),
            })),
            WorkflowAction::SelectAgents { task, include_review } => ok(json!({
                "task": task,
                "agents": AgentOrchestrator::task_agent_sequence(&task, include_review),
            })),
        }
    }
}

fn to_value<T: Serialize>(value: T) -> WorkflowResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| WorkflowError::InvalidArgument(format!("result is not serializable: {e}")))
}

fn ok<T: Serialize>(value: T) -> WorkflowResult<GatewayResponse> {
    Ok(GatewayResponse::success(to_value(value)?))
}

fn advance_response(outcome: AdvanceOutcome) -> WorkflowResult<GatewayResponse> {
    let next_phase = outcome.next_phase().map(|code| json!({ "code": code, "name": code.name() }));
    let workflow_complete = matches!(outcome, AdvanceOutcome::Completed { .. } | AdvanceOutcome::AlreadyComplete);

    if let AdvanceOutcome::Blocked(failure) = outcome {
        return Ok(GatewayResponse::failure(failure.into()));
    }

    let mut data = to_value(&outcome)?;
    if let Value::Object(map) = &mut data {
        map.insert("next_phase".to_string(), next_phase.unwrap_or(Value::Null));
        map.insert("workflow_complete".to_string(), Value::Bool(workflow_complete));
    }
    Ok(GatewayResponse::success(data))
}

fn update_response(update: crate::workflow::PlanUpdate) -> WorkflowResult<GatewayResponse> {
    let data = to_value(&update)?;
    if update.success {
        Ok(GatewayResponse::success(data))
    } else {
        let error = GatewayError {
            kind: ErrorKind::InvalidArgument,
            message: update.message,
            gate: None,
            transition: None,
            hint: Some("Check the plan slug, phase id and step index with plan_progress".to_string()),
        };
        Ok(GatewayResponse::failure_with(error, data))
    }
}
