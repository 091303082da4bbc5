//! Defines the WebSocket message protocol between the browser client and the API server.

use crate::models::{IgnoreReasonView, MessageView, MoodView, ReportView, SessionView};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Attaches the socket to an existing session. This must be the first message.
    Init { session_id: Uuid, user_id: String },
    /// Starts the session, or restarts it with a fresh opening line.
    Start,
    /// A line from the user to the simulated partner.
    UserMessage { text: String },
    /// Asks for the scored report of the session as it stands.
    RequestReport,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the socket is attached and provides the current session.
    Initialized { session: SessionView },
    SessionStarted { session: SessionView },
    /// The user's message was appended; the partner is answering.
    TurnAccepted { message: MessageView },
    TurnCompleted {
        reply: MessageView,
        turn_count: u32,
        ended: bool,
        willingness: u8,
        mood: MoodView,
    },
    /// The partner could not answer. The user's message stays in the transcript.
    TurnFailed { message: String },
    TurnIgnored { reason: IgnoreReasonView },
    Report { report: ReportView },
    /// Reports a protocol or lookup error to the client.
    Error { message: String },
}
