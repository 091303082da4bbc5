//! Drives a user turn against a shared session.
//!
//! The session mutex is taken twice, once to accept the turn and once to
//! settle it, and is released while the evaluation service is working. A
//! second submission arriving in between sees the in-flight flag and is
//! ignored.

use crate::store::SessionSlot;
use coaching_core::{
    ConversationOrchestrator, TurnError,
    message::Message,
    session::{IgnoreReason, PendingTurn, TurnStart},
};
use tracing::{info, warn};

/// A settled turn, read off the session under the same lock that settled it.
#[derive(Debug, Clone)]
pub struct CompletedTurn {
    pub reply: Message,
    pub turn_count: u32,
    pub ended: bool,
    pub willingness: u8,
}

#[derive(Debug)]
pub enum TurnResult {
    Completed(CompletedTurn),
    Ignored(IgnoreReason),
    /// The session was restarted while the turn was in flight; the reply was
    /// dropped.
    Superseded,
}

/// Appends the user's message and marks the session in flight.
pub async fn accept(slot: &SessionSlot, text: &str) -> TurnStart {
    let mut record = slot.lock().await;
    let start = record.state.begin_turn(text);
    if matches!(start, TurnStart::Accepted(_)) {
        record.touch();
    }
    start
}

/// Evaluates an accepted turn and settles it on the session.
pub async fn resolve(
    orchestrator: &ConversationOrchestrator,
    slot: &SessionSlot,
    pending: PendingTurn,
) -> Result<TurnResult, TurnError> {
    let result = orchestrator.evaluate(&pending).await;

    let mut record = slot.lock().await;
    if !record.state.is_awaiting(&pending) {
        warn!(session_id = %record.id, "Dropping reply for a turn that is no longer awaited");
        return Ok(TurnResult::Superseded);
    }
    record.touch();

    match result {
        Ok(outcome) => {
            let reply = record
                .state
                .complete_turn(outcome)
                .map_err(|e| TurnError::Collaborator(e.into()))?;
            let completed = CompletedTurn {
                reply,
                turn_count: record.state.turn_count(),
                ended: record.state.is_ended(),
                willingness: record.state.current_willingness(),
            };
            info!(
                session_id = %record.id,
                turn_count = completed.turn_count,
                ended = completed.ended,
                "Turn completed"
            );
            Ok(TurnResult::Completed(completed))
        }
        Err(e) => {
            record.state.fail_turn();
            warn!(session_id = %record.id, error = %e, "Turn failed");
            Err(e)
        }
    }
}

/// Accepts and resolves a turn in one call.
pub async fn run(
    orchestrator: &ConversationOrchestrator,
    slot: &SessionSlot,
    text: &str,
) -> Result<TurnResult, TurnError> {
    match accept(slot, text).await {
        TurnStart::Accepted(pending) => resolve(orchestrator, slot, pending).await,
        TurnStart::Ignored(reason) => Ok(TurnResult::Ignored(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SessionStore;
    use coaching_core::llm_client::{EvaluationClient, ScriptedEvaluationClient};
    use std::sync::Arc;

    const REPLY: &str = r#"{"response":"Fine. He does it every week.","isEnding":false,"evaluation":{"openQuestions":80,"neutralLanguage":90,"cleanLanguage":70,"reframing":60,"feedback":"Good","analysis":"Open and neutral.","alternative":"What would you like instead?","willingnessToChange":16}}"#;

    async fn started_slot(store: &SessionStore) -> SessionSlot {
        let record = store.create("alice").await;
        let slot = store.get(record.id, "alice").await.unwrap();
        slot.lock().await.restart();
        slot
    }

    fn orchestrator(client: Arc<ScriptedEvaluationClient>) -> ConversationOrchestrator {
        let client: Arc<dyn EvaluationClient> = client;
        ConversationOrchestrator::new(client, Arc::new(String::new()))
    }

    #[tokio::test]
    async fn run_completes_a_turn() {
        let store = SessionStore::new();
        let slot = started_slot(&store).await;
        let client = Arc::new(ScriptedEvaluationClient::new());
        client.push_reply(REPLY);

        let result = run(&orchestrator(client.clone()), &slot, "What happened?").await.unwrap();
        let TurnResult::Completed(completed) = result else {
            panic!("expected a completed turn");
        };
        assert_eq!(completed.reply.text, "Fine. He does it every week.");
        assert_eq!(completed.turn_count, 1);
        assert!(!completed.ended);
        assert_eq!(completed.willingness, 16);

        let record = slot.lock().await;
        assert_eq!(record.state.turn_count(), 1);
        assert_eq!(record.state.messages().len(), 3);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn second_submission_while_in_flight_is_ignored() {
        let store = SessionStore::new();
        let slot = started_slot(&store).await;
        let client = Arc::new(ScriptedEvaluationClient::new());
        client.push_reply(REPLY);
        let orchestrator = orchestrator(client.clone());

        let TurnStart::Accepted(pending) = accept(&slot, "first").await else {
            panic!("first submission should be accepted");
        };
        let second = run(&orchestrator, &slot, "second").await.unwrap();
        assert!(matches!(second, TurnResult::Ignored(IgnoreReason::TurnInFlight)));
        assert_eq!(client.calls(), 0);
        assert_eq!(slot.lock().await.state.messages().len(), 2);

        let first = resolve(&orchestrator, &slot, pending).await.unwrap();
        assert!(matches!(first, TurnResult::Completed(_)));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_user_message() {
        let store = SessionStore::new();
        let slot = started_slot(&store).await;
        let client = Arc::new(ScriptedEvaluationClient::new());
        client.push_failure("upstream unavailable");

        let err = run(&orchestrator(client), &slot, "Why?").await.unwrap_err();
        assert!(matches!(err, TurnError::Collaborator(_)));

        let record = slot.lock().await;
        assert_eq!(record.state.turn_count(), 0);
        assert_eq!(record.state.messages().len(), 2);
        assert!(!record.state.is_in_flight());
    }

    #[tokio::test]
    async fn completed_turn_keeps_counters_from_its_own_session() {
        let store = SessionStore::new();
        let slot = started_slot(&store).await;
        let client = Arc::new(ScriptedEvaluationClient::new());
        client.push_reply(REPLY);

        let result = run(&orchestrator(client), &slot, "What happened?").await.unwrap();
        // A restart landing right after the turn settles must not leak into the result.
        slot.lock().await.restart();

        let TurnResult::Completed(completed) = result else {
            panic!("expected a completed turn");
        };
        assert_eq!(completed.turn_count, 1);
        assert_eq!(completed.willingness, 16);
        assert_eq!(slot.lock().await.state.turn_count(), 0);
    }

    #[tokio::test]
    async fn restart_during_flight_drops_the_reply() {
        let store = SessionStore::new();
        let slot = started_slot(&store).await;
        let client = Arc::new(ScriptedEvaluationClient::new());
        client.push_reply(REPLY);

        let TurnStart::Accepted(pending) = accept(&slot, "first").await else {
            panic!("submission should be accepted");
        };
        slot.lock().await.restart();

        let result = resolve(&orchestrator(client), &slot, pending).await.unwrap();
        assert!(matches!(result, TurnResult::Superseded));

        let record = slot.lock().await;
        assert_eq!(record.state.messages().len(), 1);
        assert_eq!(record.state.turn_count(), 0);
    }
}
