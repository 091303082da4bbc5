//! Coaching practice core: the simulated partner's session state machine, the
//! orchestration of each turn with the evaluation service, and the scoring and
//! report model built from a finished transcript.

pub mod aggregator;
pub mod error;
pub mod evaluation;
pub mod llm_client;
pub mod message;
pub mod orchestrator;
pub mod persona;
pub mod report;
pub mod session;

pub use error::{SessionError, TurnError};
pub use orchestrator::ConversationOrchestrator;
pub use session::SessionState;
