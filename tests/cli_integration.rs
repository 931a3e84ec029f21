//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Get the binary to test, pointed at a repository.
fn prevc(repo: &assert_fs::TempDir) -> Command {
    // A local config file shadows any global one on the machine.
    repo.child(".prevc.toml").touch().unwrap();

    let mut cmd = Command::cargo_bin("prevc").unwrap();
    cmd.env_remove("PREVC_CONFIG").env_remove("PREVC_REPO").arg("--repo").arg(repo.path());
    cmd
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    Command::cargo_bin("prevc")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Phase-gated development workflow"));
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("prevc")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// Workflow Tests
// ============================================================================

#[test]
fn test_status_before_init_fails_with_hint() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No workflow initialized"))
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn test_init_quick_workflow() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo)
        .args(["init", "Add login", "--description", "fix small bug in auth"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[QUICK]"))
        .stdout(predicate::str::contains("Route: E → V"));

    repo.child(".context/workflow/status.yaml").assert(predicate::path::exists());
}

#[test]
fn test_init_rejects_unknown_scale() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo)
        .args(["init", "demo", "--scale", "huge"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid scale"));
}

#[test]
fn test_gate_blocks_then_plan_unblocks() {
    let repo = assert_fs::TempDir::new().unwrap();
    repo.child(".context/plans/my-plan.md")
        .write_str("# My Plan\n\n## Phase 1: Design\n\n- Sketch\n")
        .unwrap();

    prevc(&repo).args(["init", "demo", "--scale", "small", "--require-plan"]).assert().success();

    prevc(&repo)
        .arg("advance")
        .assert()
        .failure()
        .stderr(predicate::str::contains("plan_required"))
        .stderr(predicate::str::contains("P→R"));

    prevc(&repo).args(["link-plan", "my-plan"]).assert().success().stdout(predicate::str::contains("My Plan"));

    prevc(&repo).arg("advance").assert().success().stdout(predicate::str::contains("P → R"));
}

#[test]
fn test_force_advance_bypasses_gate() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo).args(["init", "demo", "--scale", "large"]).assert().success();

    prevc(&repo)
        .args(["advance", "--force", "--outputs", "notes.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bypassed gate 'plan_required'"));
}

#[test]
fn test_gates_command_reports_block() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo).args(["init", "demo", "--scale", "medium"]).assert().success();

    prevc(&repo)
        .arg("gates")
        .assert()
        .success()
        .stdout(predicate::str::contains("blocked by 'plan_required'"));
}

#[test]
fn test_handoff_and_status() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo).args(["init", "demo", "--scale", "quick"]).assert().success();

    prevc(&repo)
        .args(["handoff", "feature-developer", "test-writer", "--artifacts", "src/auth.ts"])
        .assert()
        .success();

    prevc(&repo)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Active: test-writer"))
        .stdout(predicate::str::contains("src/auth.ts"));
}

#[test]
fn test_status_json() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo).args(["init", "demo", "--scale", "enterprise"]).assert().success();

    let output = prevc(&repo).args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["project"]["scale"], "ENTERPRISE");
    assert_eq!(status["project"]["current_phase"], "P");
}

#[test]
fn test_collaborate_synthesizes_contributions() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo).args(["init", "demo", "--scale", "large"]).assert().success();

    prevc(&repo)
        .args(["collaborate", "API shape", "--participants", "architect,developer"])
        .args(["--contribute", "architect=Keep it RESTful"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Participants: architect, developer"))
        .stdout(predicate::str::contains("architect: Keep it RESTful"));
}

#[test]
fn test_agents_for_phase() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo)
        .args(["agents", "V"])
        .assert()
        .success()
        .stdout(predicate::str::contains("test-writer"));
}

#[test]
fn test_call_gateway_action() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo).args(["init", "demo", "--scale", "medium"]).assert().success();

    prevc(&repo)
        .args(["call", r#"{"action":"check_gates"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""success":true"#))
        .stdout(predicate::str::contains("plan_required"));
}

#[test]
fn test_call_reads_stdin() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo)
        .arg("call")
        .write_stdin(r#"{"action":"status"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""kind":"NoWorkflow""#));
}

#[test]
fn test_config_shows_defaults() {
    let repo = assert_fs::TempDir::new().unwrap();
    prevc(&repo)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("context_root = \".context\""));
}

#[test]
fn test_config_path_reports_env_override() {
    let repo = assert_fs::TempDir::new().unwrap();
    let custom = repo.child("custom.toml");
    custom.write_str("[report]\nrecent_handoffs = 2\n").unwrap();

    prevc(&repo)
        .env("PREVC_CONFIG", custom.path())
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"))
        .stdout(predicate::str::contains(".prevc.toml").not());
}
