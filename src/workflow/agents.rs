//! Agent orchestration tables.
//!
//! Static lookups from phase, role or free-text task to an ordered sequence
//! of recommended agents. Every identifier returned comes from [`AgentType`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::types::{PhaseCode, Role};

/// Specialist agent types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    CodeReviewer,
    BugFixer,
    FeatureDeveloper,
    RefactoringSpecialist,
    TestWriter,
    DocumentationWriter,
    PerformanceOptimizer,
    SecurityAuditor,
    BackendSpecialist,
    FrontendSpecialist,
    ArchitectSpecialist,
    DevopsSpecialist,
    DatabaseSpecialist,
    MobileSpecialist,
}

impl AgentType {
    /// Every agent type.
    pub const ALL: [Self; 14] = [
        Self::CodeReviewer,
        Self::BugFixer,
        Self::FeatureDeveloper,
        Self::RefactoringSpecialist,
        Self::TestWriter,
        Self::DocumentationWriter,
        Self::PerformanceOptimizer,
        Self::SecurityAuditor,
        Self::BackendSpecialist,
        Self::FrontendSpecialist,
        Self::ArchitectSpecialist,
        Self::DevopsSpecialist,
        Self::DatabaseSpecialist,
        Self::MobileSpecialist,
    ];

    /// Kebab-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeReviewer => "code-reviewer",
            Self::BugFixer => "bug-fixer",
            Self::FeatureDeveloper => "feature-developer",
            Self::RefactoringSpecialist => "refactoring-specialist",
            Self::TestWriter => "test-writer",
            Self::DocumentationWriter => "documentation-writer",
            Self::PerformanceOptimizer => "performance-optimizer",
            Self::SecurityAuditor => "security-auditor",
            Self::BackendSpecialist => "backend-specialist",
            Self::FrontendSpecialist => "frontend-specialist",
            Self::ArchitectSpecialist => "architect-specialist",
            Self::DevopsSpecialist => "devops-specialist",
            Self::DatabaseSpecialist => "database-specialist",
            Self::MobileSpecialist => "mobile-specialist",
        }
    }

    /// One-line description of the agent's focus.
    pub fn description(&self) -> &'static str {
        match self {
            Self::CodeReviewer => "Reviews code changes for quality, style and correctness",
            Self::BugFixer => "Diagnoses and fixes defects with minimal, targeted changes",
            Self::FeatureDeveloper => "Implements new features from the approved plan",
            Self::RefactoringSpecialist => "Restructures code without changing behavior",
            Self::TestWriter => "Writes unit and integration tests and raises coverage",
            Self::DocumentationWriter => "Writes and updates project documentation",
            Self::PerformanceOptimizer => "Profiles hot paths and removes bottlenecks",
            Self::SecurityAuditor => "Audits for vulnerabilities and compliance issues",
            Self::BackendSpecialist => "Builds server-side services and APIs",
            Self::FrontendSpecialist => "Builds user interfaces and client-side logic",
            Self::ArchitectSpecialist => "Designs system architecture and technical direction",
            Self::DevopsSpecialist => "Owns CI/CD, deployment and infrastructure",
            Self::DatabaseSpecialist => "Designs schemas, queries and data migrations",
            Self::MobileSpecialist => "Builds native and cross-platform mobile apps",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|agent| agent.as_str() == wanted)
            .ok_or_else(|| WorkflowError::InvalidArgument(format!("unknown agent '{s}'")))
    }
}

static PHASE_AGENTS: Lazy<HashMap<PhaseCode, Vec<AgentType>>> = Lazy::new(|| {
    use AgentType::*;

    HashMap::from([
        (PhaseCode::Plan, vec![ArchitectSpecialist, DocumentationWriter]),
        (PhaseCode::Review, vec![CodeReviewer, SecurityAuditor, ArchitectSpecialist]),
        (
            PhaseCode::Execute,
            vec![FeatureDeveloper, BackendSpecialist, FrontendSpecialist, DatabaseSpecialist],
        ),
        (PhaseCode::Validate, vec![TestWriter, CodeReviewer, SecurityAuditor, PerformanceOptimizer]),
        (PhaseCode::Confirm, vec![DocumentationWriter, DevopsSpecialist]),
    ])
});

static ROLE_AGENTS: Lazy<HashMap<Role, Vec<AgentType>>> = Lazy::new(|| {
    use AgentType::*;

    HashMap::from([
        (Role::Planner, vec![ArchitectSpecialist, DocumentationWriter]),
        (Role::Designer, vec![FrontendSpecialist, ArchitectSpecialist]),
        (Role::Architect, vec![ArchitectSpecialist, BackendSpecialist, DatabaseSpecialist]),
        (
            Role::Developer,
            vec![
                FeatureDeveloper,
                BugFixer,
                BackendSpecialist,
                FrontendSpecialist,
                RefactoringSpecialist,
                MobileSpecialist,
            ],
        ),
        (Role::Qa, vec![TestWriter, PerformanceOptimizer]),
        (Role::Reviewer, vec![CodeReviewer, SecurityAuditor]),
        (Role::Documenter, vec![DocumentationWriter, DevopsSpecialist]),
        (Role::SoloDev, vec![FeatureDeveloper, BugFixer, TestWriter, CodeReviewer]),
    ])
});

/// Keyword bucket for task classification.
struct TaskBucket {
    keywords: &'static [&'static str],
    agents: &'static [AgentType],
}

/// Ordered buckets; earlier buckets rank first in the result.
static TASK_BUCKETS: &[TaskBucket] = &[
    TaskBucket {
        keywords: &["bug", "fix", "crash", "broken", "regression", "corrigir", "erro", "falha"],
        agents: &[AgentType::BugFixer],
    },
    TaskBucket {
        keywords: &["security", "vulnerab", "auth", "permission", "segurança", "seguranca"],
        agents: &[AgentType::SecurityAuditor],
    },
    TaskBucket {
        keywords: &["architecture", "design system", "arquitetura"],
        agents: &[AgentType::ArchitectSpecialist],
    },
    TaskBucket {
        keywords: &["refactor", "cleanup", "clean up", "restructure", "refatorar"],
        agents: &[AgentType::RefactoringSpecialist],
    },
    TaskBucket {
        keywords: &["feature", "implement", "add ", "create", "build", "implementar", "criar"],
        agents: &[AgentType::FeatureDeveloper],
    },
    TaskBucket {
        keywords: &["frontend", "user interface", "component", "css", "react", "página", "tela"],
        agents: &[AgentType::FrontendSpecialist],
    },
    TaskBucket {
        keywords: &["api", "backend", "server", "endpoint", "servidor"],
        agents: &[AgentType::BackendSpecialist],
    },
    TaskBucket {
        keywords: &["database", "sql", "schema", "migration", "query", "banco de dados"],
        agents: &[AgentType::DatabaseSpecialist],
    },
    TaskBucket {
        keywords: &["mobile", "ios", "android", "flutter"],
        agents: &[AgentType::MobileSpecialist],
    },
    TaskBucket {
        keywords: &["performance", "optimi", "slow", "latency", "desempenho", "lento"],
        agents: &[AgentType::PerformanceOptimizer],
    },
    TaskBucket {
        keywords: &["deploy", "ci/cd", "pipeline", "docker", "kubernetes", "infra"],
        agents: &[AgentType::DevopsSpecialist],
    },
    TaskBucket {
        keywords: &["test", "coverage", "teste", "cobertura"],
        agents: &[AgentType::TestWriter],
    },
    TaskBucket {
        keywords: &["document", "readme", "docs", "documentar", "documentação"],
        agents: &[AgentType::DocumentationWriter],
    },
    TaskBucket {
        keywords: &["review", "revisar", "revisão"],
        agents: &[AgentType::CodeReviewer],
    },
];

/// Query interface over the static agent tables.
pub struct AgentOrchestrator;

impl AgentOrchestrator {
    /// Recommended agents for a phase.
    pub fn agents_for_phase(phase: PhaseCode) -> &'static [AgentType] {
        PHASE_AGENTS.get(&phase).map_or(&[], Vec::as_slice)
    }

    /// Agents a role typically delegates to.
    pub fn agents_for_role(role: Role) -> &'static [AgentType] {
        ROLE_AGENTS.get(&role).map_or(&[], Vec::as_slice)
    }

    /// Phases an agent is recommended for, in PREVC order.
    pub fn phases_for_agent(agent: AgentType) -> Vec<PhaseCode> {
        PhaseCode::ALL
            .into_iter()
            .filter(|phase| Self::agents_for_phase(*phase).contains(&agent))
            .collect()
    }

    /// Roles that delegate to an agent.
    pub fn roles_for_agent(agent: AgentType) -> Vec<Role> {
        Role::ALL.into_iter().filter(|role| Self::agents_for_role(*role).contains(&agent)).collect()
    }

    /// Classify a free-text task into agents, in bucket priority order.
    ///
    /// Falls back to `feature-developer` when no bucket matches.
    pub fn select_agents_by_task(task: &str) -> Vec<AgentType> {
        let text = task.to_lowercase();
        let mut selected: Vec<AgentType> = Vec::new();

        for bucket in TASK_BUCKETS {
            if bucket.keywords.iter().any(|kw| text.contains(kw)) {
                for agent in bucket.agents {
                    if !selected.contains(agent) {
                        selected.push(*agent);
                    }
                }
            }
        }

        if selected.is_empty() {
            selected.push(AgentType::FeatureDeveloper);
        }
        selected
    }

    /// Agents across an ordered set of phases, collapsing consecutive repeats.
    pub fn agent_handoff_sequence(phases: &[PhaseCode]) -> Vec<AgentType> {
        let mut sequence: Vec<AgentType> =
            phases.iter().flat_map(|phase| Self::agents_for_phase(*phase).iter().copied()).collect();
        sequence.dedup();
        sequence
    }

    /// Agents for a task, followed by a reviewer unless excluded.
    pub fn task_agent_sequence(task: &str, include_review: bool) -> Vec<AgentType> {
        let mut sequence = Self::select_agents_by_task(task);
        if include_review && !sequence.contains(&AgentType::CodeReviewer) {
            sequence.push(AgentType::CodeReviewer);
        }
        sequence
    }

    /// Advisory next agent after `current` within a phase.
    ///
    /// Returns the first agent of the phase when `current` is not part of it,
    /// and `None` at the end of the phase sequence.
    pub fn next_agent(current: Option<AgentType>, phase: PhaseCode) -> Option<AgentType> {
        let agents = Self::agents_for_phase(phase);
        match current.and_then(|c| agents.iter().position(|a| *a == c)) {
            Some(pos) => agents.get(pos + 1).copied(),
            None => agents.first().copied(),
        }
    }
}
