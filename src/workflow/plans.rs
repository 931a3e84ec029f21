//! Plan linking.
//!
//! Plans are markdown documents scaffolded under the plans directory:
//!
//! ```markdown
//! # Authentication Plan
//!
//! ## Phase 1: Design
//!
//! **PREVC:** P
//!
//! - Sketch the token flow
//! - Agree on session storage
//! ```
//!
//! Linking a plan binds it to the workflow and satisfies the `plan_required`
//! gate. Progress and architecture decisions are then tracked in the status
//! document.

use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{WorkflowError, WorkflowResult};
use super::types::{
    ApprovalRecord, DecisionRecord, DecisionStatus, PhaseCode, PlanApprovalStatus, PlanItemStatus,
    PlanPhaseRef, PlanRef, PlanStepRef, WorkflowStatus,
};

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap());

/// `## Phase N: Name` (also `Fase`, with `-` or `—` as separator)
static PHASE_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:phase|fase)\s+(\d+)\s*(?:[:\-–—]\s*(.*))?$").unwrap());

/// Result of linking a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanLink {
    pub plan: PlanRef,

    /// Whether an active workflow was updated
    pub workflow_updated: bool,
}

/// Result of an idempotent plan update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanUpdate {
    pub success: bool,

    /// Whether anything changed
    pub changed: bool,

    pub message: String,
}

impl PlanUpdate {
    fn missing(message: String) -> Self {
        Self { success: false, changed: false, message }
    }

    fn applied(changed: bool, message: String) -> Self {
        Self { success: true, changed, message }
    }
}

/// New architecture decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub phase: Option<PhaseCode>,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

/// Progress of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanProgress {
    pub slug: String,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub percentage: u8,
}

/// Binds plan documents to the workflow.
#[derive(Debug, Clone)]
pub struct PlanLinker {
    plans_dir: PathBuf,
}

impl PlanLinker {
    /// Create a linker over a plans directory.
    pub fn new(plans_dir: impl Into<PathBuf>) -> Self {
        Self { plans_dir: plans_dir.into() }
    }

    /// Path a plan with this slug would be scaffolded at.
    pub fn plan_path(&self, slug: &str) -> PathBuf {
        self.plans_dir.join(format!("{slug}.md"))
    }

    /// Slugs of every scaffolded plan, sorted.
    pub fn list_available(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.plans_dir) else {
            return Vec::new();
        };
        let mut slugs: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .filter(|slug| SLUG_RE.is_match(slug))
            .collect();
        slugs.sort();
        slugs
    }

    /// Load and parse a scaffolded plan.
    pub fn load(&self, slug: &str) -> WorkflowResult<PlanRef> {
        let slug = slug.trim();
        if !SLUG_RE.is_match(slug) {
            return Err(WorkflowError::PlanNotFound(slug.to_string()));
        }

        let path = self.plan_path(slug);
        if !path.is_file() {
            return Err(WorkflowError::PlanNotFound(slug.to_string()));
        }
        let content = std::fs::read_to_string(&path).map_err(|source| WorkflowError::Io { path, source })?;
        Ok(parse_plan(slug, &content))
    }

    /// Link a plan. With an active workflow the plan becomes the active plan
    /// and `plan_created` is set.
    ///
    /// Re-linking keeps the progress already recorded for the plan.
    pub fn link(&self, status: Option<&mut WorkflowStatus>, slug: &str) -> WorkflowResult<PlanLink> {
        let mut plan = self.load(slug)?;

        let Some(status) = status else {
            return Ok(PlanLink { plan, workflow_updated: false });
        };

        if let Some(existing) = status.linked_plans.iter().find(|p| p.slug == plan.slug) {
            plan = existing.clone();
        } else {
            plan.linked_at = Some(Utc::now());
            status.linked_plans.push(plan.clone());
        }
        status.active_plan = Some(plan.slug.clone());
        Self::mark_created(status);

        tracing::info!(plan = %plan.slug, phases = plan.phases.len(), "Linked plan");
        Ok(PlanLink { plan, workflow_updated: true })
    }

    /// Set `plan_created` without linking a document.
    pub fn mark_created(status: &mut WorkflowStatus) {
        status.approval.get_or_insert_with(ApprovalRecord::default).plan_created = true;
    }

    /// Approve the active plan.
    ///
    /// Fails with `PlanNotFound` when no plan has been created.
    pub fn approve(
        status: &mut WorkflowStatus,
        approved_by: Option<String>,
        notes: Option<String>,
    ) -> WorkflowResult<ApprovalRecord> {
        if !status.plan_created() {
            return Err(WorkflowError::PlanNotFound("no plan has been created or linked".to_string()));
        }

        let approval = status.approval.get_or_insert_with(ApprovalRecord::default);
        approval.plan_approved = true;
        approval.approved_by = approved_by;
        approval.approved_at = Some(Utc::now());
        approval.approval_notes = notes;
        let approval = approval.clone();

        if let Some(slug) = status.active_plan.clone() {
            if let Some(plan) = status.linked_plans.iter_mut().find(|p| p.slug == slug) {
                plan.approval_status = PlanApprovalStatus::Approved;
            }
        }

        tracing::info!(approved_by = ?approval.approved_by, "Approved plan");
        Ok(approval)
    }

    /// Set the status of a plan phase. Unknown targets report `success=false`.
    pub fn update_phase(
        status: &mut WorkflowStatus,
        slug: &str,
        phase_id: &str,
        new_status: PlanItemStatus,
    ) -> PlanUpdate {
        let Some(phase) = find_phase(status, slug, phase_id) else {
            return PlanUpdate::missing(format!("plan phase '{slug}/{phase_id}' not found"));
        };

        let changed = phase.status != new_status;
        phase.status = new_status;
        PlanUpdate::applied(changed, format!("{slug}/{phase_id} is {new_status:?}"))
    }

    /// Set the status of a plan step (1-based index). Unknown targets report
    /// `success=false`.
    pub fn update_step(
        status: &mut WorkflowStatus,
        slug: &str,
        phase_id: &str,
        step_index: usize,
        new_status: PlanItemStatus,
        notes: Option<String>,
    ) -> PlanUpdate {
        let Some(phase) = find_phase(status, slug, phase_id) else {
            return PlanUpdate::missing(format!("plan phase '{slug}/{phase_id}' not found"));
        };
        let Some(step) = phase.steps.iter_mut().find(|s| s.index == step_index) else {
            return PlanUpdate::missing(format!("step {step_index} not found in '{slug}/{phase_id}'"));
        };

        let mut changed = step.status != new_status;
        step.status = new_status;
        if new_status == PlanItemStatus::Completed {
            if step.completed_at.is_none() {
                step.completed_at = Some(Utc::now());
                changed = true;
            }
        } else if step.completed_at.take().is_some() {
            changed = true;
        }
        if notes.is_some() && step.notes != notes {
            step.notes = notes;
            changed = true;
        }

        let before = phase.status;
        roll_up(phase);
        changed |= phase.status != before;

        PlanUpdate::applied(changed, format!("{slug}/{phase_id} step {step_index} is {new_status:?}"))
    }

    /// Append an accepted architecture decision. Entries are never edited.
    pub fn record_decision(status: &mut WorkflowStatus, input: DecisionInput) -> WorkflowResult<DecisionRecord> {
        if input.title.trim().is_empty() {
            return Err(WorkflowError::InvalidArgument("decision title must not be empty".to_string()));
        }

        let record = DecisionRecord {
            id: format!("ADR-{:03}", status.decisions.len() + 1),
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            phase: input.phase.or(Some(status.project.current_phase)),
            alternatives: input.alternatives,
            status: DecisionStatus::Accepted,
            plan: status.active_plan.clone(),
            decided_at: Utc::now(),
        };
        status.decisions.push(record.clone());

        tracing::info!(id = %record.id, title = %record.title, "Recorded decision");
        Ok(record)
    }

    /// Step progress of a linked plan.
    pub fn progress(status: &WorkflowStatus, slug: &str) -> Option<PlanProgress> {
        let plan = status.linked_plans.iter().find(|p| p.slug == slug)?;
        let (completed_steps, total_steps) = plan.progress();
        let percentage = if total_steps == 0 { 0 } else { (completed_steps * 100 / total_steps) as u8 };
        Some(PlanProgress { slug: plan.slug.clone(), completed_steps, total_steps, percentage })
    }

    /// Plans directory.
    pub fn plans_dir(&self) -> &Path {
        &self.plans_dir
    }
}

/// Derive a phase's status from its steps. A phase with only pending steps
/// keeps its explicit status unless it claims to be completed.
fn roll_up(phase: &mut PlanPhaseRef) {
    if phase.steps.is_empty() {
        return;
    }
    if phase.steps.iter().all(|s| s.status == PlanItemStatus::Completed) {
        phase.status = PlanItemStatus::Completed;
    } else if phase.steps.iter().any(|s| s.status != PlanItemStatus::Pending) {
        phase.status = PlanItemStatus::InProgress;
    } else if phase.status == PlanItemStatus::Completed {
        phase.status = PlanItemStatus::Pending;
    }
}

fn find_phase<'a>(status: &'a mut WorkflowStatus, slug: &str, phase_id: &str) -> Option<&'a mut PlanPhaseRef> {
    status
        .linked_plans
        .iter_mut()
        .find(|p| p.slug == slug)?
        .phases
        .iter_mut()
        .find(|p| p.id == phase_id)
}

/// Parse plan markdown.
pub fn parse_plan(slug: &str, content: &str) -> PlanRef {
    let mut title = String::new();
    let mut phases: Vec<PlanPhaseRef> = Vec::new();
    let mut current: Option<PlanPhaseRef> = None;

    for line in content.lines() {
        let line = line.trim();

        if line.starts_with("# ") && title.is_empty() {
            title = line.trim_start_matches("# ").trim().to_string();
            continue;
        }

        // Any `##` heading closes the open phase; only `Phase N` headings
        // open a new one.
        if let Some(header) = line.strip_prefix("## ") {
            if let Some(phase) = current.take() {
                phases.push(phase);
            }
            let Some(caps) = PHASE_HEADING_RE.captures(header.trim()) else {
                continue;
            };
            let id = format!("phase-{}", &caps[1]);
            if phases.iter().any(|p| p.id == id) {
                tracing::warn!(plan = %slug, phase = %id, "Ignoring duplicate plan phase");
                continue;
            }

            current = Some(PlanPhaseRef {
                id,
                name: caps.get(2).map_or("", |m| m.as_str()).trim().to_string(),
                prevc: None,
                status: PlanItemStatus::Pending,
                steps: Vec::new(),
            });
            continue;
        }

        let Some(phase) = current.as_mut() else {
            continue;
        };

        if line.contains("PREVC:") {
            phase.prevc = extract_value(line).parse().ok();
        } else if let Some(item) = parse_list_item(line) {
            let (status, description) = match item.strip_prefix("[x] ").or_else(|| item.strip_prefix("[X] ")) {
                Some(rest) => (PlanItemStatus::Completed, rest.to_string()),
                None => (PlanItemStatus::Pending, item.trim_start_matches("[ ] ").to_string()),
            };
            phase.steps.push(PlanStepRef {
                index: phase.steps.len() + 1,
                description,
                status,
                completed_at: None,
                notes: None,
            });
        }
    }

    if let Some(phase) = current {
        phases.push(phase);
    }
    if title.is_empty() {
        title = slug.to_string();
    }

    PlanRef {
        slug: slug.to_string(),
        title,
        phases,
        approval_status: PlanApprovalStatus::Pending,
        linked_at: None,
    }
}

fn parse_list_item(line: &str) -> Option<String> {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        Some(rest.trim().to_string())
    } else if line.chars().next().is_some_and(|c| c.is_ascii_digit()) && line.contains(". ") {
        line.split_once(". ").map(|(_, rest)| rest.trim().to_string())
    } else {
        None
    }
}

/// Extract value after a colon, stripping markdown bold markers.
fn extract_value(line: &str) -> String {
    line.split_once(':')
        .map_or("", |(_, v)| v)
        .trim()
        .trim_start_matches("**")
        .trim_end_matches("**")
        .trim()
        .to_string()
}
