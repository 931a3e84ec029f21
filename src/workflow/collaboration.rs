//! Ad-hoc collaboration sessions.
//!
//! Sessions sit outside the phase pipeline: several roles discuss a topic,
//! contribute, and the session is synthesized into a summary. They live only
//! as long as the process that created them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{WorkflowError, WorkflowResult};
use super::scale::ScaleRoute;
use super::types::{PhaseCode, Role};

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Concluded,
}

/// A single contribution to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub role: Role,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Snapshot returned by [`CollaborationSession::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub topic: String,
    pub participants: Vec<Role>,
    pub status: SessionStatus,
    pub contributions: usize,
}

/// Result of synthesizing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaborationSynthesis {
    pub session_id: String,
    pub topic: String,
    pub participants: Vec<Role>,

    /// Contributions grouped by role, in participant order
    pub perspectives: Vec<(Role, Vec<String>)>,

    /// Participants that never contributed
    pub silent: Vec<Role>,

    pub summary: String,
}

/// A multi-participant discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaborationSession {
    pub id: String,
    pub topic: String,
    pub participants: Vec<Role>,
    pub status: SessionStatus,
    pub contributions: Vec<Contribution>,
    pub started_at: DateTime<Utc>,
}

impl CollaborationSession {
    /// Start a session. Fails on an empty topic or participant list.
    pub fn start(topic: &str, participants: Vec<Role>) -> WorkflowResult<Self> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(WorkflowError::InvalidArgument("collaboration topic must not be empty".to_string()));
        }

        let mut unique: Vec<Role> = Vec::with_capacity(participants.len());
        for role in participants {
            if !unique.contains(&role) {
                unique.push(role);
            }
        }
        if unique.is_empty() {
            return Err(WorkflowError::InvalidArgument("collaboration needs at least one participant".to_string()));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            participants: unique,
            status: SessionStatus::Active,
            contributions: Vec::new(),
            started_at: Utc::now(),
        })
    }

    /// Default participants: lead roles of the phase that the scale includes,
    /// or all lead roles when the scale includes none of them.
    pub fn default_participants(phase: PhaseCode, route: &ScaleRoute) -> Vec<Role> {
        let leads = Role::for_phase(phase);
        let in_scale: Vec<Role> = leads.iter().copied().filter(|r| route.roles.contains(r)).collect();
        if in_scale.is_empty() {
            leads.to_vec()
        } else {
            in_scale
        }
    }

    /// Identifier, topic and participants.
    pub fn status(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            topic: self.topic.clone(),
            participants: self.participants.clone(),
            status: self.status,
            contributions: self.contributions.len(),
        }
    }

    /// Add a contribution from a participant.
    pub fn contribute(&mut self, role: Role, message: &str) -> WorkflowResult<()> {
        if self.status != SessionStatus::Active {
            return Err(WorkflowError::InvalidArgument(format!("session {} is concluded", self.id)));
        }
        if !self.participants.contains(&role) {
            return Err(WorkflowError::InvalidArgument(format!(
                "{role} is not a participant of session {}",
                self.id
            )));
        }
        self.contributions.push(Contribution { role, message: message.trim().to_string(), at: Utc::now() });
        Ok(())
    }

    /// Conclude the session and summarize the contributions.
    pub fn synthesize(&mut self) -> CollaborationSynthesis {
        self.status = SessionStatus::Concluded;

        let perspectives: Vec<(Role, Vec<String>)> = self
            .participants
            .iter()
            .map(|role| {
                let messages = self
                    .contributions
                    .iter()
                    .filter(|c| c.role == *role)
                    .map(|c| c.message.clone())
                    .collect();
                (*role, messages)
            })
            .collect();
        let silent =
            perspectives.iter().filter(|(_, m)| m.is_empty()).map(|(role, _)| *role).collect();

        let mut summary = format!("Collaboration on '{}'\n", self.topic);
        for (role, messages) in perspectives.iter().filter(|(_, m)| !m.is_empty()) {
            summary.push_str(&format!("- {role}: {}\n", messages.join("; ")));
        }

        tracing::info!(session = %self.id, contributions = self.contributions.len(), "Synthesized collaboration");
        CollaborationSynthesis {
            session_id: self.id.clone(),
            topic: self.topic.clone(),
            participants: self.participants.clone(),
            perspectives,
            silent,
            summary,
        }
    }
}

/// In-process registry of sessions, addressable by id.
#[derive(Debug, Default)]
pub struct CollaborationManager {
    sessions: HashMap<String, CollaborationSession>,
}

impl CollaborationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return its id.
    pub fn insert(&mut self, session: CollaborationSession) -> String {
        let id = session.id.clone();
        self.sessions.insert(id.clone(), session);
        id
    }

    pub fn get(&self, id: &str) -> Option<&CollaborationSession> {
        self.sessions.get(id)
    }

    /// Mutable access, failing with `InvalidArgument` on an unknown id.
    pub fn get_mut(&mut self, id: &str) -> WorkflowResult<&mut CollaborationSession> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| WorkflowError::InvalidArgument(format!("unknown collaboration session '{id}'")))
    }

    /// Sessions that are still active.
    pub fn active(&self) -> impl Iterator<Item = &CollaborationSession> {
        self.sessions.values().filter(|s| s.status == SessionStatus::Active)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
