//! Conversation Orchestrator
//!
//! Drives one round-trip with the evaluation service: hand it the history and
//! the user's text, validate what comes back against the reply contract, and
//! settle the session's turn accordingly. Nothing is retried; a failed call is
//! reported to the caller and the user may resubmit.

use crate::{
    error::TurnError,
    evaluation::{EvaluationRecord, checked_score},
    llm_client::EvaluationClient,
    session::{IgnoreReason, PendingTurn, SessionState, TurnOutcome, TurnStart},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

// --- Reply contract ---

// The reply the evaluation service must produce for every turn. Doc comments
// here end up in the schema sent to the model, so serde notes stay out of
// them: no field has a default, and a missing or wrong-typed one fails parsing.
#[derive(Deserialize, JsonSchema, Debug)]
#[serde(rename_all = "camelCase")]
#[schemars(
    deny_unknown_fields,
    description = "The partner's spoken reply, the evaluation of the user's last message, and whether the conversation ends."
)]
pub struct ReplyPayload {
    /// What the partner says next.
    pub response: String,
    pub evaluation: EvaluationPayload,
    /// True only when the partner commits to a concrete change.
    pub is_ending: bool,
}

#[derive(Deserialize, JsonSchema, Debug)]
#[serde(rename_all = "camelCase")]
#[schemars(deny_unknown_fields)]
pub struct EvaluationPayload {
    #[schemars(description = "0-100 score for open questions in the user's last message")]
    pub open_questions: i64,
    #[schemars(description = "0-100 score for neutral language")]
    pub neutral_language: i64,
    #[schemars(description = "0-100 score for clean language")]
    pub clean_language: i64,
    #[schemars(description = "0-100 score for reframing")]
    pub reframing: i64,
    #[schemars(description = "Short overall verdict")]
    pub feedback: String,
    #[schemars(description = "Why these scores were given")]
    pub analysis: String,
    #[schemars(description = "A better coaching phrasing")]
    pub alternative: String,
    #[schemars(description = "0-100, how open the partner now is to change")]
    pub willingness_to_change: i64,
}

impl TryFrom<EvaluationPayload> for EvaluationRecord {
    type Error = String;

    fn try_from(payload: EvaluationPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            open_questions: checked_score("openQuestions", payload.open_questions)?,
            neutral_language: checked_score("neutralLanguage", payload.neutral_language)?,
            clean_language: checked_score("cleanLanguage", payload.clean_language)?,
            reframing: checked_score("reframing", payload.reframing)?,
            feedback: payload.feedback,
            analysis: payload.analysis,
            alternative: payload.alternative,
            willingness_to_change: checked_score(
                "willingnessToChange",
                payload.willingness_to_change,
            )?,
        })
    }
}

/// JSON schema of [`ReplyPayload`], sent along with each request as the
/// structured-output format.
pub fn reply_schema() -> serde_json::Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(ReplyPayload))
        .unwrap_or(serde_json::Value::Null);
    // Structured-output endpoints reject the meta-schema keyword.
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
    }
    schema
}

/// Parses and validates a raw reply body.
pub fn parse_reply(raw: &str) -> Result<TurnOutcome, TurnError> {
    let payload: ReplyPayload =
        serde_json::from_str(raw).map_err(|e| TurnError::MalformedResponse(e.to_string()))?;
    let evaluation =
        EvaluationRecord::try_from(payload.evaluation).map_err(TurnError::MalformedResponse)?;
    Ok(TurnOutcome {
        response_text: payload.response,
        evaluation,
        is_ending: payload.is_ending,
    })
}

// --- Orchestrator ---

/// What happened to a submission handed to [`ConversationOrchestrator::submit_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed { ended: bool },
    Ignored(IgnoreReason),
}

pub struct ConversationOrchestrator {
    client: Arc<dyn EvaluationClient>,
    system_prompt: Arc<String>,
    timeout: Option<Duration>,
}

impl ConversationOrchestrator {
    pub fn new(client: Arc<dyn EvaluationClient>, system_prompt: Arc<String>) -> Self {
        Self {
            client,
            system_prompt,
            timeout: None,
        }
    }

    /// Bounds each evaluation call; an expired call fails the turn.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Calls the evaluation service once for an accepted turn and validates
    /// the reply. Does not touch any session.
    #[instrument(skip_all, fields(history_len = pending.history.len()))]
    pub async fn evaluate(&self, pending: &PendingTurn) -> Result<TurnOutcome, TurnError> {
        let call = self.client.evaluate_turn(
            &self.system_prompt,
            &pending.history,
            pending.user_text(),
        );

        let raw = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| TurnError::TimedOut(limit))?,
            None => call.await,
        }
        .map_err(TurnError::Collaborator)?;

        let outcome = parse_reply(&raw)?;
        info!(
            willingness = outcome.evaluation.willingness_to_change,
            is_ending = outcome.is_ending,
            "Turn evaluated"
        );
        Ok(outcome)
    }

    /// Runs a whole turn against a session the caller owns exclusively.
    ///
    /// Ignored submissions return `Ok(SubmitOutcome::Ignored(..))`. On failure
    /// the turn is abandoned (user message kept, in-flight cleared) and the
    /// error is returned for the caller to report.
    pub async fn submit_turn(
        &self,
        session: &mut SessionState,
        text: &str,
    ) -> Result<SubmitOutcome, TurnError> {
        let pending = match session.begin_turn(text) {
            TurnStart::Accepted(pending) => pending,
            TurnStart::Ignored(reason) => return Ok(SubmitOutcome::Ignored(reason)),
        };

        match self.evaluate(&pending).await {
            Ok(outcome) => {
                // begin_turn just set the in-flight flag, so completion cannot be refused.
                if let Err(e) = session.complete_turn(outcome) {
                    warn!(error = %e, "Turn completion refused");
                }
                Ok(SubmitOutcome::Completed {
                    ended: session.is_ended(),
                })
            }
            Err(e) => {
                warn!(error = %e, "Turn failed");
                session.fail_turn();
                Err(e)
            }
        }
    }
}
