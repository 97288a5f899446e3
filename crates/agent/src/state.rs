//! Conversation state: append-only turn history, accumulated slots, and the
//! session status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::Intent;
use crate::slots::SlotMap;

const EXIT_KEYWORDS: &[&str] = &["exit", "quit", "bye"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }
}

/// One exchange unit. Immutable once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn now(role: Role, text: impl Into<String>) -> Self {
        Self { role, text: text.into(), timestamp: Utc::now() }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    AwaitingClarification,
    Terminated,
}

/// State of one session. Owned exclusively by that session; the turn
/// processor is the only writer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    turns: Vec<Turn>,
    pub current_intent: Option<Intent>,
    pub slots: SlotMap,
    pub status: SessionStatus,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// History is append-only; there is no way to edit or remove a recorded
    /// turn.
    pub fn push_turn(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(Turn::now(role, text));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent `window` turns, oldest first.
    pub fn recent_history(&self, window: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(window);
        &self.turns[start..]
    }

    pub fn is_terminated(&self) -> bool {
        self.status == SessionStatus::Terminated
    }

    /// Intent persistence rule: an `Unknown` classification while the
    /// previous intent still misses its required slot keeps the previous
    /// intent, treating the new utterance as slot-filling.
    pub fn retained_intent(&self, classified: Intent) -> Intent {
        if classified != Intent::Unknown {
            return classified;
        }
        if let Some(previous) = self.current_intent {
            if let Some(slot) = previous.required_slot() {
                if self.slots.get(slot).is_none() {
                    return previous;
                }
            }
        }
        classified
    }
}

/// Exit keywords end the session: exact match or leading token,
/// case-insensitive ("bye", "Quit please").
pub fn is_exit_utterance(text: &str) -> bool {
    let trimmed = text.trim().to_lowercase();
    let leading = trimmed
        .split_whitespace()
        .next()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .unwrap_or("");
    EXIT_KEYWORDS.contains(&trimmed.as_str()) || EXIT_KEYWORDS.contains(&leading)
}
