use crate::evaluation::EvaluationRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who spoke a line of dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    SimulatedPartner,
    User,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::SimulatedPartner => write!(f, "partner"),
            Sender::User => write!(f, "user"),
        }
    }
}

/// One line of dialogue in a session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Present on simulated-partner replies only.
    pub evaluation: Option<EvaluationRecord>,
}

impl Message {
    pub fn from_user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::User,
            text: text.into(),
            created_at: Utc::now(),
            evaluation: None,
        }
    }

    pub fn from_partner(text: impl Into<String>, evaluation: EvaluationRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::SimulatedPartner,
            text: text.into(),
            created_at: Utc::now(),
            evaluation: Some(evaluation),
        }
    }

    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// A role-tagged utterance handed to the evaluation service as history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub sender: Sender,
    pub text: String,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            sender: message.sender,
            text: message.text.clone(),
        }
    }
}
