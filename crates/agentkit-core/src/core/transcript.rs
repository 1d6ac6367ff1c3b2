//! Locally owned conversation history for the chat and responses modes.
//!
//! The transcript only grows. There is no way to remove, reorder or insert
//! entries, so a system entry can only ever be the first one.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub role: Role,
    pub content: String,
}

impl Utterance {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<Utterance>,
}

impl Transcript {
    /// Starts a transcript, seeded with a system entry when `system` has
    /// visible text.
    pub fn new(system: Option<&str>) -> Self {
        let entries = system
            .filter(|s| !s.trim().is_empty())
            .map(|s| vec![Utterance::new(Role::System, s)])
            .unwrap_or_default();
        Self { entries }
    }

    /// The entries to send for a turn: the history so far plus the new user
    /// utterance, which is not recorded until the turn succeeds.
    pub fn with_pending(&self, user: &str) -> Vec<Utterance> {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend_from_slice(&self.entries);
        entries.push(Utterance::new(Role::User, user));
        entries
    }

    /// Records a completed turn. Both entries go in together so user and
    /// assistant entries always alternate.
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.entries.push(Utterance::new(Role::User, user));
        self.entries.push(Utterance::new(Role::Assistant, assistant));
    }

    pub fn entries(&self) -> &[Utterance] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, role: Role) -> usize {
        self.entries.iter().filter(|u| u.role == role).count()
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.entries
            .first()
            .filter(|u| u.role == Role::System)
            .map(|u| u.content.as_str())
    }
}
