//! Phase transition gates.
//!
//! Pure decision functions: given the current status, may the workflow move
//! from one phase to the next? Nothing here touches disk.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::types::{PhaseCode, WorkflowStatus};

/// Named precondition on a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// A plan must be created/linked before leaving P
    PlanRequired,
    /// The plan must be approved before leaving R
    ApprovalRequired,
}

impl GateKind {
    /// Every gate, in evaluation order.
    pub const ALL: [Self; 2] = [Self::PlanRequired, Self::ApprovalRequired];

    /// Snake-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanRequired => "plan_required",
            Self::ApprovalRequired => "approval_required",
        }
    }

    /// Phase this gate guards the exit of.
    pub fn guards(&self) -> PhaseCode {
        match self {
            Self::PlanRequired => PhaseCode::Plan,
            Self::ApprovalRequired => PhaseCode::Review,
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Self::PlanRequired => {
                "Create a plan under the plans directory and link it with `link_plan <slug>`, \
                 or retry with force"
            }
            Self::ApprovalRequired => {
                "Approve the linked plan with `approve_plan`, or retry with force"
            }
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase transition, rendered as `P→R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Transition {
    pub from: PhaseCode,
    pub to: PhaseCode,
}

impl Transition {
    pub fn new(from: PhaseCode, to: PhaseCode) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}→{}", self.from, self.to)
    }
}

impl From<Transition> for String {
    fn from(t: Transition) -> Self {
        t.to_string()
    }
}

impl TryFrom<String> for Transition {
    type Error = WorkflowError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let (from, to) = s
            .split_once('→')
            .or_else(|| s.split_once("->"))
            .ok_or_else(|| WorkflowError::InvalidArgument(format!("invalid transition '{s}'")))?;
        Ok(Self { from: from.parse()?, to: to.parse()? })
    }
}

/// Structured description of a blocked transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateFailure {
    pub gate: GateKind,

    pub transition: Transition,

    /// Actionable remediation
    pub hint: String,
}

impl GateFailure {
    fn new(gate: GateKind, transition: Transition) -> Self {
        Self { gate, transition, hint: gate.hint().to_string() }
    }

    /// User-facing remediation message.
    pub fn remediation(&self) -> String {
        format!("Cannot advance {}: gate '{}' is not satisfied. {}", self.transition, self.gate, self.hint)
    }
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.remediation())
    }
}

/// Outcome of evaluating a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Every gate passes
    Allowed,
    /// A gate would block, but autonomous mode or force skips it
    Bypassed(GateFailure),
    /// Blocked by the first failing gate
    Blocked(GateFailure),
}

impl GateDecision {
    /// Whether the transition may proceed.
    pub fn permits(&self) -> bool {
        !matches!(self, Self::Blocked(_))
    }
}

/// Gate evaluation.
pub struct GateEvaluator;

impl GateEvaluator {
    /// First failing gate for `from → to`, ignoring bypass flags.
    pub fn first_failure(status: &WorkflowStatus, transition: Transition) -> Option<GateFailure> {
        GateKind::ALL
            .into_iter()
            .find(|gate| Self::blocks(*gate, status, transition))
            .map(|gate| GateFailure::new(gate, transition))
    }

    /// Decide whether `transition` may proceed.
    ///
    /// `to = None` means advancing past the final phase, which no gate guards.
    pub fn evaluate(status: &WorkflowStatus, from: PhaseCode, to: Option<PhaseCode>, force: bool) -> GateDecision {
        let Some(to) = to else {
            return GateDecision::Allowed;
        };
        let failure = Self::first_failure(status, Transition::new(from, to));
        let bypass = force || status.settings.autonomous_mode;

        match failure {
            None => GateDecision::Allowed,
            Some(failure) if bypass => GateDecision::Bypassed(failure),
            Some(failure) => GateDecision::Blocked(failure),
        }
    }

    fn blocks(gate: GateKind, status: &WorkflowStatus, transition: Transition) -> bool {
        if transition.from != gate.guards() {
            return false;
        }
        match gate {
            GateKind::PlanRequired => status.settings.require_plan && !status.plan_created(),
            GateKind::ApprovalRequired => {
                status.settings.require_approval && !status.plan_approved()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::workflow::types::{
        ApprovalRecord, PhaseState, PhaseStatus, ProjectInfo, ProjectScale, WorkflowSettings,
    };

    fn status(settings: WorkflowSettings, approval: Option<ApprovalRecord>) -> WorkflowStatus {
        let phases = PhaseCode::ALL
            .into_iter()
            .map(|code| (code, PhaseState::new(code, PhaseStatus::Pending)))
            .collect::<BTreeMap<_, _>>();
        WorkflowStatus {
            project: ProjectInfo {
                name: "gates".to_string(),
                description: None,
                scale: ProjectScale::Large,
                current_phase: PhaseCode::Plan,
                created_at: Utc::now(),
                completed_at: None,
            },
            phases,
            roles: BTreeMap::new(),
            settings,
            approval,
            linked_plans: Vec::new(),
            active_plan: None,
            handoffs: Vec::new(),
            decisions: Vec::new(),
        }
    }

    fn strict() -> WorkflowSettings {
        WorkflowSettings { autonomous_mode: false, require_plan: true, require_approval: true }
    }

    #[test]
    fn test_plan_required_blocks_leaving_plan() {
        let s = status(strict(), None);
        let decision = GateEvaluator::evaluate(&s, PhaseCode::Plan, Some(PhaseCode::Review), false);
        let GateDecision::Blocked(failure) = decision else {
            panic!("expected a blocked transition");
        };
        assert_eq!(failure.gate, GateKind::PlanRequired);
        assert_eq!(failure.transition.to_string(), "P→R");
        assert!(!failure.hint.is_empty());
    }

    #[test]
    fn test_approval_required_blocks_leaving_review() {
        let approval = ApprovalRecord { plan_created: true, ..ApprovalRecord::default() };
        let s = status(strict(), Some(approval));

        assert!(GateEvaluator::evaluate(&s, PhaseCode::Plan, Some(PhaseCode::Review), false).permits());
        let decision = GateEvaluator::evaluate(&s, PhaseCode::Review, Some(PhaseCode::Execute), false);
        assert!(matches!(decision, GateDecision::Blocked(ref f) if f.gate == GateKind::ApprovalRequired));
    }

    #[test]
    fn test_other_transitions_are_allowed() {
        let s = status(strict(), None);
        for (from, to) in [
            (PhaseCode::Execute, PhaseCode::Validate),
            (PhaseCode::Validate, PhaseCode::Confirm),
        ] {
            assert_eq!(GateEvaluator::evaluate(&s, from, Some(to), false), GateDecision::Allowed);
        }
        assert_eq!(GateEvaluator::evaluate(&s, PhaseCode::Confirm, None, false), GateDecision::Allowed);
    }

    #[test]
    fn test_settings_disable_gates() {
        let s = status(WorkflowSettings::default(), None);
        assert_eq!(
            GateEvaluator::evaluate(&s, PhaseCode::Plan, Some(PhaseCode::Review), false),
            GateDecision::Allowed
        );
    }

    #[test]
    fn test_force_and_autonomous_bypass() {
        let s = status(strict(), None);
        let forced = GateEvaluator::evaluate(&s, PhaseCode::Plan, Some(PhaseCode::Review), true);
        assert!(matches!(forced, GateDecision::Bypassed(ref f) if f.gate == GateKind::PlanRequired));

        let auto = status(WorkflowSettings { autonomous_mode: true, ..strict() }, None);
        assert!(GateEvaluator::evaluate(&auto, PhaseCode::Review, Some(PhaseCode::Execute), false).permits());
    }

    #[test]
    fn test_bypass_flags_without_failing_gate_are_allowed() {
        let approval = ApprovalRecord { plan_created: true, plan_approved: true, ..ApprovalRecord::default() };
        let auto = status(WorkflowSettings { autonomous_mode: true, ..strict() }, Some(approval));

        for (from, to) in [(PhaseCode::Plan, PhaseCode::Review), (PhaseCode::Execute, PhaseCode::Validate)] {
            assert_eq!(GateEvaluator::evaluate(&auto, from, Some(to), false), GateDecision::Allowed);
            assert_eq!(GateEvaluator::evaluate(&auto, from, Some(to), true), GateDecision::Allowed);
        }
    }

    #[test]
    fn test_transition_string_round_trip() {
        let t = Transition::new(PhaseCode::Review, PhaseCode::Execute);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"R→E\"");
        assert_eq!(serde_json::from_str::<Transition>(&json).unwrap(), t);
        assert_eq!(Transition::try_from("P->R".to_string()).unwrap().to, PhaseCode::Review);
    }

    #[test]
    fn test_remediation_message_carries_hint() {
        let failure = GateFailure::new(GateKind::PlanRequired, Transition::new(PhaseCode::Plan, PhaseCode::Review));
        let message = failure.remediation();
        assert!(message.contains("P→R"));
        assert!(message.contains("plan_required"));
        assert!(message.contains("link_plan"));
    }
}
