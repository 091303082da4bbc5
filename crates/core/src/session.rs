//! Turn-based session state machine.
//!
//! A session moves `NotStarted -> Active -> Ended`. Starting (or restarting)
//! never mutates an existing value in place: [`SessionState::start`] builds a
//! fresh active session which replaces whatever the caller held before.
//!
//! A user turn is split into three steps so that a shared session only needs
//! to be locked around state transitions, never across the external call:
//!
//! 1. [`SessionState::begin_turn`] appends the user's message, marks the
//!    session in flight, and snapshots the history.
//! 2. The caller asks the evaluation service for a reply.
//! 3. [`SessionState::complete_turn`] or [`SessionState::fail_turn`] settles
//!    the turn and clears the in-flight flag.

use crate::{
    error::SessionError,
    evaluation::EvaluationRecord,
    message::{HistoryEntry, Message, Sender},
    persona::{self, Mood},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Completed exchanges after which a session ends regardless of the partner.
pub const TURN_CAP: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    NotStarted,
    Active,
    Ended,
}

/// Why a submission was dropped without touching the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    NotStarted,
    Ended,
    TurnInFlight,
    EmptyInput,
}

/// A validated reply from the evaluation service for one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub response_text: String,
    pub evaluation: EvaluationRecord,
    pub is_ending: bool,
}

/// Everything the evaluation service needs to answer an accepted turn.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    /// The message that was just appended on the user's behalf.
    pub user_message: Message,
    /// Conversation before the user's message, oldest first.
    pub history: Vec<HistoryEntry>,
}

impl PendingTurn {
    pub fn user_text(&self) -> &str {
        &self.user_message.text
    }
}

#[derive(Debug)]
pub enum TurnStart {
    Accepted(PendingTurn),
    Ignored(IgnoreReason),
}

/// The whole conversation for one practice run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    phase: SessionPhase,
    turn_count: u32,
    messages: Vec<Message>,
    in_flight: bool,
    /// Kept for parity with stored sessions; nothing reads it yet.
    total_score: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// An unstarted session with an empty transcript.
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::NotStarted,
            turn_count: 0,
            messages: Vec::new(),
            in_flight: false,
            total_score: 0,
        }
    }

    /// A fresh active session seeded with the persona's scripted opening line.
    pub fn start() -> Self {
        Self::start_with(persona::OPENING_LINE)
    }

    /// A fresh active session seeded with `opening` as the partner's first
    /// message, carrying the baseline evaluation.
    pub fn start_with(opening: impl Into<String>) -> Self {
        let opening = Message::from_partner(
            opening,
            EvaluationRecord::baseline(persona::BASELINE_WILLINGNESS),
        );
        info!("Session started");
        Self {
            phase: SessionPhase::Active,
            turn_count: 0,
            messages: vec![opening],
            in_flight: false,
            total_score: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        self.phase != SessionPhase::NotStarted
    }

    pub fn is_ended(&self) -> bool {
        self.phase == SessionPhase::Ended
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a non-empty submission would be accepted right now.
    pub fn accepts_input(&self) -> bool {
        self.phase == SessionPhase::Active && !self.in_flight
    }

    /// Willingness from the latest evaluated partner reply, or the baseline
    /// when nothing has been evaluated.
    pub fn current_willingness(&self) -> u8 {
        self.messages
            .iter()
            .rev()
            .find_map(|m| m.evaluation.as_ref())
            .map(|e| e.willingness_to_change)
            .unwrap_or(persona::BASELINE_WILLINGNESS)
    }

    pub fn mood(&self) -> Mood {
        Mood::from_willingness(self.current_willingness())
    }

    /// Appends the user's message and marks the session in flight, or reports
    /// why the submission is ignored. Ignored submissions leave the session
    /// untouched.
    pub fn begin_turn(&mut self, text: &str) -> TurnStart {
        let reason = match self.phase {
            SessionPhase::NotStarted => Some(IgnoreReason::NotStarted),
            SessionPhase::Ended => Some(IgnoreReason::Ended),
            SessionPhase::Active if self.in_flight => Some(IgnoreReason::TurnInFlight),
            SessionPhase::Active if text.trim().is_empty() => Some(IgnoreReason::EmptyInput),
            SessionPhase::Active => None,
        };
        if let Some(reason) = reason {
            debug!(?reason, "Ignoring user input");
            return TurnStart::Ignored(reason);
        }

        let history = self.messages.iter().map(HistoryEntry::from).collect();
        let user_message = Message::from_user(text);
        self.messages.push(user_message.clone());
        self.in_flight = true;

        TurnStart::Accepted(PendingTurn {
            user_message,
            history,
        })
    }

    /// Records the partner's reply for the turn in flight and returns it.
    ///
    /// The session ends when the partner signals an ending or when this was
    /// the [`TURN_CAP`]th completed turn.
    pub fn complete_turn(&mut self, outcome: TurnOutcome) -> Result<Message, SessionError> {
        if !self.in_flight {
            return Err(SessionError::NoTurnInFlight);
        }

        let reply = Message::from_partner(outcome.response_text, outcome.evaluation);
        self.messages.push(reply.clone());
        self.turn_count += 1;
        self.in_flight = false;

        if outcome.is_ending || self.turn_count >= TURN_CAP {
            self.phase = SessionPhase::Ended;
            info!(
                turn_count = self.turn_count,
                partner_ended = outcome.is_ending,
                "Session ended"
            );
        }

        Ok(reply)
    }

    /// Whether `pending` is the turn this session is waiting on. False once the
    /// turn has been settled or the session has been replaced by a restart.
    pub fn is_awaiting(&self, pending: &PendingTurn) -> bool {
        self.in_flight
            && self
                .messages
                .last()
                .is_some_and(|m| m.id == pending.user_message.id)
    }

    /// Abandons the turn in flight. The user's message stays in the
    /// transcript and the turn count does not move.
    pub fn fail_turn(&mut self) {
        if self.in_flight {
            self.in_flight = false;
            debug!(turn_count = self.turn_count, "Turn failed; session unchanged");
        }
    }

    /// Number of evaluated partner replies after the opening message.
    pub fn evaluated_replies(&self) -> usize {
        self.messages
            .iter()
            .skip(1)
            .filter(|m| m.sender == Sender::SimulatedPartner && m.evaluation.is_some())
            .count()
    }
}
