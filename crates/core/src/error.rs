use std::time::Duration;

/// Why a single turn could not be completed.
///
/// Every variant is scoped to the turn that produced it: the session keeps the
/// user's message, clears its in-flight flag, and accepts a resubmission.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Evaluation service call failed: {0:#}")]
    Collaborator(anyhow::Error),
    #[error("Evaluation service returned a malformed reply: {0}")]
    MalformedResponse(String),
    #[error("Evaluation service did not answer within {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No turn is in flight for this session")]
    NoTurnInFlight,
}
