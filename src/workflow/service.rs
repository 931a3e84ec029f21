//! Workflow service.
//!
//! The façade every caller goes through. Each operation loads the status
//! document, applies one change, and writes it back at most once.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::collaboration::{
    CollaborationManager, CollaborationSession, CollaborationSynthesis, SessionSnapshot,
};
use super::error::{WorkflowError, WorkflowResult};
use super::gates::{GateDecision, GateEvaluator, GateFailure};
use super::handoff::{HandoffCoordinator, HandoffOutcome};
use super::plans::{DecisionInput, PlanLink, PlanLinker, PlanProgress, PlanUpdate};
use super::report::{self, WorkflowSummary};
use super::scale::{scale_route, ScaleHints, ScaleRouter};
use super::store::StatusStore;
use super::types::{
    ApprovalRecord, DecisionRecord, PhaseCode, PhaseState, PhaseStatus, PlanItemStatus, ProjectInfo, Role,
    RoleState, WorkflowSettings, WorkflowStatus,
};
use crate::core::WorkflowConfig;

/// Options for [`WorkflowService::init`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitOptions {
    pub name: String,

    pub description: Option<String>,

    /// Explicit scale token; inferred when absent
    pub scale: Option<String>,

    pub autonomous: Option<bool>,

    pub require_plan: Option<bool>,

    pub require_approval: Option<bool>,

    /// Archive an existing workflow instead of failing
    pub archive_previous: bool,

    /// Signals for scale inference
    pub hints: Option<ScaleHints>,

    /// Count repository files as the file signal when `hints` has none
    pub detect_files: bool,
}

impl InitOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }
}

/// Result of [`WorkflowService::advance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// Moved to the next route phase
    Advanced {
        from: PhaseCode,
        to: PhaseCode,
        /// Gate that would have blocked, had it not been bypassed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bypassed: Option<GateFailure>,
    },
    /// The final route phase was completed
    Completed { from: PhaseCode },
    /// Nothing to do; the workflow was already complete
    AlreadyComplete,
    /// A gate refused the transition; nothing was written
    Blocked(GateFailure),
}

impl AdvanceOutcome {
    /// Phase the workflow is now in, or `None` when complete or blocked.
    pub fn next_phase(&self) -> Option<PhaseCode> {
        match self {
            Self::Advanced { to, .. } => Some(*to),
            _ => None,
        }
    }

    /// Whether the pointer moved or the workflow completed.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Blocked(_))
    }

    /// Convert a blocked transition into [`WorkflowError::WorkflowGate`].
    pub fn into_result(self) -> WorkflowResult<Option<PhaseCode>> {
        match self {
            Self::Blocked(failure) => Err(WorkflowError::WorkflowGate(failure)),
            other => Ok(other.next_phase()),
        }
    }
}

/// Read-only preview of [`WorkflowService::advance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateCheck {
    pub current: PhaseCode,

    /// `None` when the current phase is the last in the route
    pub next: Option<PhaseCode>,

    pub allowed: bool,

    /// Gates are skipped by autonomous mode
    pub bypassed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<GateFailure>,

    pub is_complete: bool,
}

/// Workflow operations for a single repository.
#[derive(Debug)]
pub struct WorkflowService {
    repo: PathBuf,
    config: WorkflowConfig,
    store: StatusStore,
    router: ScaleRouter,
    plans: PlanLinker,
    collaborations: CollaborationManager,
}

impl WorkflowService {
    /// Open the service for a repository, loading its configuration.
    pub fn open(repo: impl Into<PathBuf>) -> WorkflowResult<Self> {
        let repo = repo.into();
        let config = WorkflowConfig::load(&repo)?;
        Ok(Self::with_config(repo, config))
    }

    /// Open the service with an explicit configuration.
    pub fn with_config(repo: impl Into<PathBuf>, config: WorkflowConfig) -> Self {
        let repo = repo.into();
        Self {
            store: StatusStore::new(config.workflow_dir(&repo)),
            router: ScaleRouter::new(config.scale.clone()),
            plans: PlanLinker::new(config.plans_dir(&repo)),
            collaborations: CollaborationManager::new(),
            repo,
            config,
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Path of the status document.
    pub fn status_path(&self) -> PathBuf {
        self.store.path()
    }

    /// Whether a workflow has been initialized.
    pub fn has_workflow(&self) -> bool {
        self.store.exists()
    }

    /// Start a workflow.
    pub fn init(&self, options: InitOptions) -> WorkflowResult<WorkflowStatus> {
        let name = options.name.trim();
        if name.is_empty() {
            return Err(WorkflowError::InvalidArgument("workflow name must not be empty".to_string()));
        }

        let description = options.description.as_deref().map(str::trim).filter(|d| !d.is_empty());
        let mut hints = options.hints.unwrap_or_default();
        if options.detect_files && hints.file_count.is_none() {
            hints.file_count = ScaleHints::from_repository(&self.repo).file_count;
        }
        let text = match description {
            Some(description) => format!("{name} {description}"),
            None => name.to_string(),
        };
        let scale = self.router.resolve(options.scale.as_deref(), &text, &hints)?;
        let route = scale_route(scale);

        if let Some(existing) = self.store.load()? {
            if !options.archive_previous {
                return Err(WorkflowError::AlreadyInitialized(existing.project.name));
            }
            self.store.archive()?;
        }

        let now = Utc::now();
        let first = route.phases.first().copied().unwrap_or(PhaseCode::Execute);
        let phases: BTreeMap<PhaseCode, PhaseState> = PhaseCode::ALL
            .into_iter()
            .map(|code| {
                let mut state = if !route.includes(code) {
                    PhaseState::new(code, PhaseStatus::Skipped)
                } else if code == first {
                    PhaseState::new(code, PhaseStatus::InProgress)
                } else {
                    PhaseState::new(code, PhaseStatus::Pending)
                };
                if code == first {
                    state.started_at = Some(now);
                }
                (code, state)
            })
            .collect();

        let roles = route
            .role_list()
            .into_iter()
            .map(|role| (role.as_str().to_string(), RoleState::idle(role.as_str())))
            .collect();

        let settings = WorkflowSettings {
            autonomous_mode: options.autonomous.unwrap_or(self.config.defaults.autonomous_mode),
            require_plan: options
                .require_plan
                .unwrap_or(route.includes(PhaseCode::Plan) && self.config.defaults.require_plan),
            require_approval: options
                .require_approval
                .unwrap_or(!route.skip_review && route.includes(PhaseCode::Review)),
        };

        let status = WorkflowStatus {
            project: ProjectInfo {
                name: name.to_string(),
                description: description.map(str::to_string),
                scale,
                current_phase: first,
                created_at: now,
                completed_at: None,
            },
            phases,
            roles,
            settings,
            approval: Some(ApprovalRecord::default()),
            linked_plans: Vec::new(),
            active_plan: None,
            handoffs: Vec::new(),
            decisions: Vec::new(),
        };
        self.store.save(&status)?;

        tracing::info!(
            project = %status.project.name,
            %scale,
            phase = %first,
            require_plan = status.settings.require_plan,
            require_approval = status.settings.require_approval,
            "Initialized workflow"
        );
        Ok(status)
    }

    /// Complete the current phase and move to the next one in the route.
    pub fn advance(&self, outputs: Vec<String>, force: bool) -> WorkflowResult<AdvanceOutcome> {
        let mut status = self.load()?;
        if status.is_complete() {
            tracing::debug!(project = %status.project.name, "Workflow already complete");
            return Ok(AdvanceOutcome::AlreadyComplete);
        }

        let from = status.project.current_phase;
        let next = status.next_phase_after(from);

        let bypassed = match GateEvaluator::evaluate(&status, from, next, force) {
            GateDecision::Allowed => None,
            GateDecision::Bypassed(failure) => {
                tracing::warn!(gate = %failure.gate, transition = %failure.transition, force, "Bypassed gate");
                Some(failure)
            }
            GateDecision::Blocked(failure) => {
                tracing::warn!(gate = %failure.gate, transition = %failure.transition, "Gate blocked advance");
                return Ok(AdvanceOutcome::Blocked(failure));
            }
        };

        let now = Utc::now();
        if let Some(phase) = status.phases.get_mut(&from) {
            phase.status = PhaseStatus::Completed;
            phase.outputs.extend(outputs);
            phase.completed_at = Some(now);
        }

        let outcome = match next {
            Some(to) => {
                if let Some(phase) = status.phases.get_mut(&to) {
                    phase.status = PhaseStatus::InProgress;
                    phase.started_at = Some(now);
                }
                status.project.current_phase = to;
                tracing::info!(%from, phase = %to, "Advanced workflow");
                AdvanceOutcome::Advanced { from, to, bypassed }
            }
            None => {
                status.project.completed_at = Some(now);
                tracing::info!(%from, project = %status.project.name, "Completed workflow");
                AdvanceOutcome::Completed { from }
            }
        };

        self.store.save(&status)?;
        Ok(outcome)
    }

    /// Preview whether [`advance`](Self::advance) would succeed. Never writes.
    pub fn check_gates(&self) -> WorkflowResult<GateCheck> {
        let status = self.load()?;
        let current = status.project.current_phase;
        let next = status.next_phase_after(current);

        if status.is_complete() {
            return Ok(GateCheck {
                current,
                next: None,
                allowed: true,
                bypassed: false,
                failure: None,
                is_complete: true,
            });
        }

        let (allowed, bypassed, failure) = match GateEvaluator::evaluate(&status, current, next, false) {
            GateDecision::Allowed => (true, false, None),
            GateDecision::Bypassed(failure) => (true, true, Some(failure)),
            GateDecision::Blocked(failure) => (false, false, Some(failure)),
        };
        Ok(GateCheck { current, next, allowed, bypassed, failure, is_complete: false })
    }

    /// Record a handoff between roles or agents.
    pub fn handoff(&self, from: &str, to: &str, artifacts: Vec<String>) -> WorkflowResult<HandoffOutcome> {
        let mut status = self.load()?;
        let outcome = HandoffCoordinator::handoff(&mut status, from, to, artifacts)?;
        self.store.save(&status)?;
        Ok(outcome)
    }

    /// Start a collaboration session.
    ///
    /// Without participants, the lead roles of the current phase take part.
    pub fn start_collaboration(
        &mut self,
        topic: &str,
        participants: Option<Vec<Role>>,
    ) -> WorkflowResult<SessionSnapshot> {
        let status = self.load()?;
        let participants = match participants {
            Some(participants) if !participants.is_empty() => participants,
            _ => CollaborationSession::default_participants(
                status.project.current_phase,
                scale_route(status.project.scale),
            ),
        };

        let session = CollaborationSession::start(topic, participants)?;
        let snapshot = session.status();
        self.collaborations.insert(session);

        tracing::info!(
            session = %snapshot.id,
            topic = %snapshot.topic,
            participants = snapshot.participants.len(),
            "Started collaboration"
        );
        Ok(snapshot)
    }

    /// Add a contribution to a session.
    pub fn contribute(
        &mut self,
        session_id: &str,
        role: Role,
        message: &str,
    ) -> WorkflowResult<SessionSnapshot> {
        let session = self.collaborations.get_mut(session_id)?;
        session.contribute(role, message)?;
        Ok(session.status())
    }

    /// Conclude a session.
    pub fn synthesize(&mut self, session_id: &str) -> WorkflowResult<CollaborationSynthesis> {
        Ok(self.collaborations.get_mut(session_id)?.synthesize())
    }

    /// Snapshot of a session.
    pub fn collaboration(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.collaborations.get(session_id).map(CollaborationSession::status)
    }

    /// Approve the active plan.
    pub fn approve_plan(
        &self,
        approved_by: Option<String>,
        notes: Option<String>,
    ) -> WorkflowResult<ApprovalRecord> {
        let mut status = self.load()?;
        let approval = PlanLinker::approve(&mut status, approved_by, notes)?;
        self.store.save(&status)?;
        Ok(approval)
    }

    /// Record that a plan exists without linking a document.
    pub fn mark_plan_created(&self) -> WorkflowResult<ApprovalRecord> {
        let mut status = self.load()?;
        PlanLinker::mark_created(&mut status);
        self.store.save(&status)?;
        Ok(status.approval_or_default())
    }

    /// Enable or disable autonomous mode.
    pub fn set_autonomous_mode(&self, enabled: bool) -> WorkflowResult<WorkflowSettings> {
        let mut status = self.load()?;
        status.settings.autonomous_mode = enabled;
        self.store.save(&status)?;
        tracing::info!(enabled, "Set autonomous mode");
        Ok(status.settings)
    }

    /// Link a scaffolded plan. Works without a workflow, in which case
    /// nothing is persisted.
    pub fn link_plan(&self, slug: &str) -> WorkflowResult<PlanLink> {
        let mut status = self.store.load()?;
        let link = self.plans.link(status.as_mut(), slug)?;
        if let Some(status) = &status {
            self.store.save(status)?;
        }
        Ok(link)
    }

    /// Set the status of a plan phase.
    pub fn update_plan_phase(
        &self,
        slug: &str,
        phase_id: &str,
        new_status: PlanItemStatus,
    ) -> WorkflowResult<PlanUpdate> {
        let mut status = self.load()?;
        let update = PlanLinker::update_phase(&mut status, slug, phase_id, new_status);
        if update.changed {
            self.store.save(&status)?;
        }
        Ok(update)
    }

    /// Set the status of a plan step.
    pub fn update_plan_step(
        &self,
        slug: &str,
        phase_id: &str,
        step_index: usize,
        new_status: PlanItemStatus,
        notes: Option<String>,
    ) -> WorkflowResult<PlanUpdate> {
        let mut status = self.load()?;
        let update = PlanLinker::update_step(&mut status, slug, phase_id, step_index, new_status, notes);
        if update.changed {
            self.store.save(&status)?;
        }
        Ok(update)
    }

    /// Append an architecture decision.
    pub fn record_decision(&self, input: DecisionInput) -> WorkflowResult<DecisionRecord> {
        let mut status = self.load()?;
        let record = PlanLinker::record_decision(&mut status, input)?;
        self.store.save(&status)?;
        Ok(record)
    }

    /// Step progress of a linked plan.
    pub fn plan_progress(&self, slug: &str) -> WorkflowResult<Option<PlanProgress>> {
        Ok(PlanLinker::progress(&self.load()?, slug))
    }

    /// Slugs of scaffolded plans.
    pub fn list_available_plans(&self) -> Vec<String> {
        self.plans.list_available()
    }

    /// Full status document.
    pub fn status(&self) -> WorkflowResult<WorkflowStatus> {
        self.load()
    }

    pub fn summary(&self) -> WorkflowResult<WorkflowSummary> {
        Ok(WorkflowSummary::from_status(&self.load()?, self.config.report.recent_handoffs))
    }

    pub fn formatted_status(&self) -> WorkflowResult<String> {
        Ok(report::formatted_status(&self.load()?, self.config.report.recent_handoffs))
    }

    pub fn recommended_actions(&self) -> WorkflowResult<Vec<String>> {
        Ok(report::recommended_actions(&self.load()?))
    }

    fn load(&self) -> WorkflowResult<WorkflowStatus> {
        self.store.load_required(&self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::gates::GateKind;
    use crate::workflow::types::ProjectScale;
    use tempfile::TempDir;

    fn service() -> (TempDir, WorkflowService) {
        let dir = TempDir::new().unwrap();
        let service = WorkflowService::with_config(dir.path(), WorkflowConfig::default());
        (dir, service)
    }

    fn init(service: &WorkflowService, scale: &str) -> WorkflowStatus {
        let options = InitOptions { scale: Some(scale.to_string()), ..InitOptions::new("svc") };
        service.init(options).unwrap()
    }

    #[test]
    fn test_mutations_before_init_fail_with_no_workflow() {
        let (_dir, service) = service();
        assert!(!service.has_workflow());
        assert!(matches!(service.advance(Vec::new(), false), Err(WorkflowError::NoWorkflow(_))));
        assert!(matches!(service.handoff("a", "b", Vec::new()), Err(WorkflowError::NoWorkflow(_))));
        assert!(matches!(service.set_autonomous_mode(true), Err(WorkflowError::NoWorkflow(_))));
    }

    #[test]
    fn test_init_builds_route() {
        let (_dir, service) = service();
        let status = init(&service, "quick");

        assert_eq!(status.project.scale, ProjectScale::Quick);
        assert_eq!(status.project.current_phase, PhaseCode::Execute);
        assert_eq!(status.route(), vec![PhaseCode::Execute, PhaseCode::Validate]);
        assert_eq!(status.phases[&PhaseCode::Plan].status, PhaseStatus::Skipped);
        assert!(!status.settings.require_plan);
        assert!(status.roles.contains_key("developer"));
    }

    #[test]
    fn test_init_defaults_follow_route() {
        let (_dir, service) = service();
        let medium = init(&service, "MEDIUM");
        assert!(medium.settings.require_plan && medium.settings.require_approval);

        let options = InitOptions {
            scale: Some("small".to_string()),
            archive_previous: true,
            ..InitOptions::new("small")
        };
        let small = service.init(options).unwrap();
        assert!(small.settings.require_plan);
        assert!(!small.settings.require_approval);
    }

    #[test]
    fn test_init_twice_requires_archive() {
        let (_dir, service) = service();
        init(&service, "quick");
        assert!(matches!(
            service.init(InitOptions::new("again")),
            Err(WorkflowError::AlreadyInitialized(ref name)) if name == "svc"
        ));
    }

    #[test]
    fn test_invalid_scale_is_rejected() {
        let (_dir, service) = service();
        let options = InitOptions { scale: Some("huge".to_string()), ..InitOptions::new("svc") };
        assert!(matches!(service.init(options), Err(WorkflowError::InvalidScale(_))));
        assert!(!service.has_workflow());
    }

    #[test]
    fn test_advance_records_outputs_and_completes() {
        let (_dir, service) = service();
        init(&service, "quick");

        let outcome = service.advance(vec!["src/lib.rs".to_string()], false).unwrap();
        assert_eq!(outcome.next_phase(), Some(PhaseCode::Validate));

        let status = service.status().unwrap();
        assert_eq!(status.phases[&PhaseCode::Execute].outputs, vec!["src/lib.rs"]);
        assert_eq!(status.phases[&PhaseCode::Execute].status, PhaseStatus::Completed);

        assert_eq!(
            service.advance(Vec::new(), false).unwrap(),
            AdvanceOutcome::Completed { from: PhaseCode::Validate }
        );
        assert!(service.status().unwrap().is_complete());
        assert_eq!(service.advance(Vec::new(), false).unwrap(), AdvanceOutcome::AlreadyComplete);
    }

    #[test]
    fn test_blocked_advance_does_not_write() {
        let (_dir, service) = service();
        init(&service, "medium");
        let before = std::fs::read(service.status_path()).unwrap();

        let outcome = service.advance(vec!["notes.md".to_string()], false).unwrap();
        assert!(!outcome.is_success());
        assert!(matches!(outcome.into_result(), Err(WorkflowError::WorkflowGate(_))));
        assert_eq!(std::fs::read(service.status_path()).unwrap(), before);
    }

    #[test]
    fn test_force_bypasses_gates() {
        let (_dir, service) = service();
        init(&service, "medium");
        let outcome = service.advance(Vec::new(), true).unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Advanced { to: PhaseCode::Review, bypassed: Some(_), .. }));
    }

    #[test]
    fn test_approve_requires_created_plan() {
        let (_dir, service) = service();
        init(&service, "medium");
        assert!(matches!(service.approve_plan(None, None), Err(WorkflowError::PlanNotFound(_))));

        service.mark_plan_created().unwrap();
        let approval = service.approve_plan(Some("lead".to_string()), Some("ok".to_string())).unwrap();
        assert!(approval.plan_approved);
        assert_eq!(approval.approved_by.as_deref(), Some("lead"));
    }

    #[test]
    fn test_collaboration_defaults_to_phase_leads() {
        let (_dir, mut service) = service();
        init(&service, "large");

        let snapshot = service.start_collaboration("API design", None).unwrap();
        assert_eq!(snapshot.participants, vec![Role::Planner, Role::Designer]);

        service.contribute(&snapshot.id, Role::Planner, "Start with REST").unwrap();
        let synthesis = service.synthesize(&snapshot.id).unwrap();
        assert_eq!(synthesis.silent, vec![Role::Designer]);
        assert!(service.contribute(&snapshot.id, Role::Planner, "late").is_err());
    }

    #[test]
    fn test_check_gates_reports_blocking_gate() {
        let (_dir, service) = service();
        init(&service, "large");
        let check = service.check_gates().unwrap();
        assert!(!check.allowed);
        assert_eq!(check.next, Some(PhaseCode::Review));
        assert_eq!(check.failure.unwrap().transition.to_string(), "P→R");
    }

    #[test]
    fn test_autonomous_check_reports_bypass_only_for_failing_gate() {
        let (_large_dir, large) = service();
        init(&large, "large");
        large.set_autonomous_mode(true).unwrap();

        let check = large.check_gates().unwrap();
        assert!(check.allowed && check.bypassed);
        assert_eq!(check.failure.unwrap().gate, GateKind::PlanRequired);

        let (_quick_dir, quick) = service();
        init(&quick, "quick");
        quick.set_autonomous_mode(true).unwrap();

        let check = quick.check_gates().unwrap();
        assert!(check.allowed);
        assert!(!check.bypassed);
        assert!(check.failure.is_none());
    }
}
