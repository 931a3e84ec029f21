//! Gateway Integration Tests
//!
//! An agent driving the workflow purely through JSON actions.

use std::fs;

use prevc::gateway::{Gateway, GatewayResponse};
use prevc::{WorkflowConfig, WorkflowService};
use serde_json::Value;
use tempfile::TempDir;

fn gateway(dir: &TempDir) -> Gateway {
    Gateway::new(WorkflowService::with_config(dir.path(), WorkflowConfig::default()))
}

fn call(gateway: &mut Gateway, json: &str) -> GatewayResponse {
    gateway.dispatch_json(json).unwrap()
}

fn data(response: GatewayResponse) -> Value {
    assert!(response.success, "{response:?}");
    response.data.unwrap()
}

#[test]
fn test_agent_remediates_blocked_gates() {
    let dir = TempDir::new().unwrap();
    let mut gateway = gateway(&dir);

    data(call(&mut gateway, r#"{"action":"init","name":"checkout","scale":"medium"}"#));

    // Blocked: the agent reads the gate and creates a plan.
    let blocked = call(&mut gateway, r#"{"action":"advance"}"#);
    assert!(!blocked.success);
    let error = blocked.error.unwrap();
    assert_eq!(serde_json::to_value(error.gate).unwrap(), "plan_required");
    assert!(error.hint.unwrap().contains("link_plan"));

    let plans = WorkflowConfig::default().plans_dir(dir.path());
    fs::create_dir_all(&plans).unwrap();
    fs::write(plans.join("checkout.md"), "# Checkout\n\n## Phase 1: Build\n\n- Cart\n- Payment\n").unwrap();

    data(call(&mut gateway, r#"{"action":"link_plan","slug":"checkout"}"#));
    let advanced = data(call(&mut gateway, r#"{"action":"advance","outputs":["plan.md"]}"#));
    assert_eq!(advanced["next_phase"]["code"], "R");

    // Blocked again on approval.
    let blocked = call(&mut gateway, r#"{"action":"advance"}"#);
    assert_eq!(serde_json::to_value(blocked.error.unwrap().transition).unwrap(), "R→E");

    data(call(&mut gateway, r#"{"action":"approve_plan","approved_by":"agent"}"#));
    let advanced = data(call(&mut gateway, r#"{"action":"advance"}"#));
    assert_eq!(advanced["next_phase"]["code"], "E");

    let step = data(call(
        &mut gateway,
        r#"{"action":"update_plan_step","slug":"checkout","phase_id":"phase-1","step_index":1,"status":"completed"}"#,
    ));
    assert_eq!(step["changed"], true);

    let progress = data(call(&mut gateway, r#"{"action":"plan_progress","slug":"checkout"}"#));
    assert_eq!(progress["percentage"], 50);

    let summary = data(call(&mut gateway, r#"{"action":"summary"}"#));
    assert_eq!(summary["current_phase"], "E");
}

#[test]
fn test_collaboration_through_gateway() {
    let dir = TempDir::new().unwrap();
    let mut gateway = gateway(&dir);
    data(call(&mut gateway, r#"{"action":"init","name":"design","scale":"large"}"#));

    let session = data(call(&mut gateway, r#"{"action":"start_collaboration","topic":"Data model"}"#));
    let id = session["id"].as_str().unwrap().to_string();
    assert_eq!(session["participants"], serde_json::json!(["planner", "designer"]));

    let contribute = format!(r#"{{"action":"contribute","session_id":"{id}","role":"planner","message":"Normalize"}}"#);
    data(call(&mut gateway, &contribute));

    let synthesis = data(call(&mut gateway, &format!(r#"{{"action":"synthesize","session_id":"{id}"}}"#)));
    assert_eq!(synthesis["silent"], serde_json::json!(["designer"]));

    let unknown = call(&mut gateway, r#"{"action":"synthesize","session_id":"nope"}"#);
    assert!(!unknown.success);
}

#[test]
fn test_decisions_and_autonomous_mode() {
    let dir = TempDir::new().unwrap();
    let mut gateway = gateway(&dir);
    data(call(&mut gateway, r#"{"action":"init","name":"auto","scale":"enterprise"}"#));

    let decision = data(call(
        &mut gateway,
        r#"{"action":"record_decision","title":"Use Postgres","description":"Relational data","alternatives":["SQLite"]}"#,
    ));
    assert_eq!(decision["id"], "ADR-001");
    assert_eq!(decision["status"], "accepted");

    data(call(&mut gateway, r#"{"action":"set_autonomous_mode","enabled":true}"#));
    for _ in 0..5 {
        data(call(&mut gateway, r#"{"action":"advance"}"#));
    }
    let done = data(call(&mut gateway, r#"{"action":"advance"}"#));
    assert_eq!(done["outcome"], "already_complete");
    assert_eq!(done["workflow_complete"], true);
}
