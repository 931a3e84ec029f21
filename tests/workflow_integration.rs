//! Workflow Integration Tests
//!
//! Drives `WorkflowService` end-to-end against a temporary repository.

use std::fs;
use std::path::Path;

use prevc::workflow::{
    scale_route, AdvanceOutcome, DecisionInput, GateKind, InitOptions, PhaseCode, PhaseStatus,
    PlanItemStatus, ProjectScale, RoleStatus, StatusStore, WorkflowError, WorkflowService,
};
use prevc::WorkflowConfig;
use tempfile::TempDir;

const PLAN: &str = "# My Plan\n\n## Phase 1: Design\n\n**PREVC:** P\n\n- Draft schema\n- Review schema\n\n## Phase 2: Build\n\n- Implement\n";

fn service(dir: &TempDir) -> WorkflowService {
    WorkflowService::with_config(dir.path(), WorkflowConfig::default())
}

fn scaffold_plan(repo: &Path, slug: &str) {
    let plans = WorkflowConfig::default().plans_dir(repo);
    fs::create_dir_all(&plans).unwrap();
    fs::write(plans.join(format!("{slug}.md")), PLAN).unwrap();
}

fn with_scale(name: &str, scale: &str) -> InitOptions {
    InitOptions { scale: Some(scale.to_string()), ..InitOptions::new(name) }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_bug_fix_description_starts_quick_workflow() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let options = InitOptions {
        description: Some("fix small bug in auth".to_string()),
        ..InitOptions::new("Add login")
    };
    let status = service.init(options).unwrap();

    assert_eq!(status.project.scale, ProjectScale::Quick);
    assert_eq!(status.route(), vec![PhaseCode::Execute, PhaseCode::Validate]);
    assert_eq!(status.project.current_phase, PhaseCode::Execute);
}

#[test]
fn test_compliance_description_starts_enterprise_workflow() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let options =
        InitOptions { description: Some("PCI compliance audit".to_string()), ..InitOptions::new("payments") };
    let status = service.init(options).unwrap();

    assert_eq!(status.project.scale, ProjectScale::Enterprise);
    assert_eq!(status.route(), PhaseCode::ALL.to_vec());
}

#[test]
fn test_plan_gate_blocks_until_plan_is_linked() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    scaffold_plan(dir.path(), "my-plan");

    let options = InitOptions { require_plan: Some(true), ..with_scale("small", "SMALL") };
    service.init(options).unwrap();

    let AdvanceOutcome::Blocked(failure) = service.advance(Vec::new(), false).unwrap() else {
        panic!("advance should be blocked without a plan");
    };
    assert_eq!(failure.gate, GateKind::PlanRequired);
    assert_eq!(failure.transition.to_string(), "P→R");
    assert!(!failure.hint.is_empty());
    assert_eq!(service.status().unwrap().project.current_phase, PhaseCode::Plan);

    let link = service.link_plan("my-plan").unwrap();
    assert!(link.workflow_updated);

    let outcome = service.advance(Vec::new(), false).unwrap();
    assert_eq!(outcome.next_phase(), Some(PhaseCode::Review));
}

#[test]
fn test_handoff_shows_in_summary() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service.init(with_scale("auth", "MEDIUM")).unwrap();

    service
        .handoff("feature-developer", "test-writer", vec!["src/auth.ts".to_string()])
        .unwrap();

    let summary = service.summary().unwrap();
    assert!(summary.active_roles.contains(&"test-writer".to_string()));
    let handoff = &summary.recent_handoffs[0];
    assert_eq!(handoff.to, "test-writer");
    assert_eq!(handoff.artifacts, vec!["src/auth.ts"]);

    let status = service.status().unwrap();
    assert_eq!(status.roles["feature-developer"].status, RoleStatus::Completed);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_every_route_is_ordered_subsequence() {
    for scale in ProjectScale::ALL {
        let phases = scale_route(scale).phases;
        assert!(!phases.is_empty());
        let mut canonical = PhaseCode::ALL.iter();
        for phase in phases {
            assert!(canonical.any(|p| p == phase), "{scale}: {phase} out of order");
        }
    }
}

#[test]
fn test_autonomous_mode_always_advances_and_records_outputs() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let options = InitOptions { autonomous: Some(true), ..with_scale("auto", "ENTERPRISE") };
    let status = service.init(options).unwrap();
    assert!(status.settings.require_plan && status.settings.require_approval);

    for code in PhaseCode::ALL {
        let outcome = service.advance(vec![format!("{code}.md")], false).unwrap();
        assert!(outcome.is_success(), "{code}: {outcome:?}");
    }

    let status = service.status().unwrap();
    assert!(status.is_complete());
    for code in PhaseCode::ALL {
        assert_eq!(status.phases[&code].status, PhaseStatus::Completed);
        assert_eq!(status.phases[&code].outputs, vec![format!("{code}.md")]);
    }
}

#[test]
fn test_check_gates_never_writes() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service.init(with_scale("gates", "LARGE")).unwrap();
    let before = fs::read(service.status_path()).unwrap();

    let check = service.check_gates().unwrap();
    assert!(!check.allowed);
    let _ = service.check_gates().unwrap();

    assert_eq!(fs::read(service.status_path()).unwrap(), before);
}

#[test]
fn test_status_round_trips_field_for_field() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    scaffold_plan(dir.path(), "round-trip");
    service.init(with_scale("round trip", "MEDIUM")).unwrap();
    service.link_plan("round-trip").unwrap();
    service.handoff("planner", "architect", vec!["plan.md".to_string()]).unwrap();
    service
        .record_decision(DecisionInput {
            title: "Use YAML".to_string(),
            description: "Human-editable state".to_string(),
            ..DecisionInput::default()
        })
        .unwrap();
    let status = service.status().unwrap();

    let store = StatusStore::new(dir.path().join("copy"));
    store.save(&status).unwrap();
    assert_eq!(store.load().unwrap().unwrap(), status);
}

#[test]
fn test_final_advance_completes_then_noops() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service.init(with_scale("done", "QUICK")).unwrap();

    assert_eq!(service.advance(Vec::new(), false).unwrap().next_phase(), Some(PhaseCode::Validate));
    let last = service.advance(Vec::new(), false).unwrap();
    assert_eq!(last.next_phase(), None);
    assert!(service.status().unwrap().is_complete());

    let before = fs::read(service.status_path()).unwrap();
    assert_eq!(service.advance(Vec::new(), false).unwrap(), AdvanceOutcome::AlreadyComplete);
    assert_eq!(fs::read(service.status_path()).unwrap(), before);
}

// ============================================================================
// Plans, approval and archive
// ============================================================================

#[test]
fn test_full_medium_workflow_with_approval() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    scaffold_plan(dir.path(), "feature");
    service.init(with_scale("feature", "MEDIUM")).unwrap();

    service.link_plan("feature").unwrap();
    assert_eq!(service.advance(Vec::new(), false).unwrap().next_phase(), Some(PhaseCode::Review));

    let AdvanceOutcome::Blocked(failure) = service.advance(Vec::new(), false).unwrap() else {
        panic!("review should require approval");
    };
    assert_eq!(failure.gate, GateKind::ApprovalRequired);
    assert!(matches!(
        AdvanceOutcome::Blocked(failure).into_result(),
        Err(WorkflowError::WorkflowGate(_))
    ));

    service.approve_plan(Some("lead".to_string()), None).unwrap();
    assert_eq!(service.advance(Vec::new(), false).unwrap().next_phase(), Some(PhaseCode::Execute));

    let update =
        service.update_plan_step("feature", "phase-2", 1, PlanItemStatus::Completed, None).unwrap();
    assert!(update.success);
    let progress = service.plan_progress("feature").unwrap().unwrap();
    assert_eq!((progress.completed_steps, progress.total_steps), (1, 3));

    let missing = service.update_plan_step("feature", "phase-7", 1, PlanItemStatus::Completed, None).unwrap();
    assert!(!missing.success);
}

#[test]
fn test_phase_roll_up_is_persisted() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    scaffold_plan(dir.path(), "feature");
    service.init(with_scale("feature", "MEDIUM")).unwrap();
    service.link_plan("feature").unwrap();

    service.update_plan_step("feature", "phase-2", 1, PlanItemStatus::Completed, None).unwrap();
    service.update_plan_phase("feature", "phase-2", PlanItemStatus::InProgress).unwrap();

    let update = service.update_plan_step("feature", "phase-2", 1, PlanItemStatus::Completed, None).unwrap();
    assert!(update.changed);
    let status = service.status().unwrap();
    assert_eq!(status.linked_plans[0].phases[1].status, PlanItemStatus::Completed);
}

#[test]
fn test_link_unknown_plan_fails() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service.init(with_scale("x", "MEDIUM")).unwrap();

    assert!(matches!(service.link_plan("ghost"), Err(WorkflowError::PlanNotFound(_))));
    assert!(!service.status().unwrap().plan_created());
}

#[test]
fn test_link_plan_without_workflow_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    scaffold_plan(dir.path(), "early");

    let link = service.link_plan("early").unwrap();
    assert!(!link.workflow_updated);
    assert!(!service.has_workflow());
}

#[test]
fn test_archive_previous_starts_fresh_workflow() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service.init(with_scale("First Project", "QUICK")).unwrap();

    assert!(matches!(service.init(InitOptions::new("second")), Err(WorkflowError::AlreadyInitialized(_))));

    let options = InitOptions { archive_previous: true, ..with_scale("second", "LARGE") };
    let status = service.init(options).unwrap();
    assert_eq!(status.project.name, "second");

    let archive = WorkflowConfig::default().workflow_dir(dir.path()).join("archive");
    let archived: Vec<_> = fs::read_dir(archive).unwrap().filter_map(Result::ok).collect();
    assert_eq!(archived.len(), 1);
    let file_name = archived[0].file_name().to_string_lossy().to_string();
    assert!(file_name.starts_with("first-project-"), "{file_name}");
}

#[test]
fn test_corrupt_status_is_a_hard_failure() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service.init(with_scale("corrupt", "QUICK")).unwrap();
    fs::write(service.status_path(), "phases: {{{").unwrap();

    let err = service.advance(Vec::new(), false).unwrap_err();
    assert!(!err.is_recoverable());
    // The damaged document is left for the operator to repair.
    assert_eq!(fs::read_to_string(service.status_path()).unwrap(), "phases: {{{");
}

#[test]
fn test_status_document_is_human_readable() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service.init(with_scale("yaml", "SMALL")).unwrap();

    let yaml = fs::read_to_string(service.status_path()).unwrap();
    assert!(yaml.contains("scale: SMALL"));
    assert!(yaml.contains("current_phase: P"));
    assert!(yaml.contains("status: in_progress"));
}

#[test]
fn test_configured_context_root_is_used() {
    let dir = TempDir::new().unwrap();
    let mut config = WorkflowConfig::default();
    config.paths.context_root = "ops".into();
    let service = WorkflowService::with_config(dir.path(), config);

    service.init(with_scale("custom", "QUICK")).unwrap();
    assert!(dir.path().join("ops/workflow/status.yaml").exists());
}
