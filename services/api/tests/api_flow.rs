use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use coaching_api::{
    config::{Config, Provider},
    models::{
        ErrorResponse, GuideView, IgnoreReasonView, PhaseView, ReportView, SessionSummary,
        SessionView, TurnDisposition, TurnResponse,
    },
    router::create_router,
    state::AppState,
    store::SessionStore,
};
use coaching_core::{
    ConversationOrchestrator,
    llm_client::{EvaluationClient, ScriptedEvaluationClient},
};
use serde_json::json;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::Level;

const USER: HeaderName = HeaderName::from_static("x-user-id");

fn reply(response: &str, scores: [u8; 4], willingness: u8, is_ending: bool) -> String {
    json!({
        "response": response,
        "isEnding": is_ending,
        "evaluation": {
            "openQuestions": scores[0],
            "neutralLanguage": scores[1],
            "cleanLanguage": scores[2],
            "reframing": scores[3],
            "feedback": "Good turn",
            "analysis": "You stayed curious about Kim's view.",
            "alternative": "What would a good week look like for you?",
            "willingnessToChange": willingness,
        }
    })
    .to_string()
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        provider: Provider::OpenAI,
        openai_api_key: Some("test-key".to_string()),
        gemini_api_key: None,
        chat_model: "test-model".to_string(),
        log_level: Level::INFO,
        prompts_path: PathBuf::from("./prompts"),
        evaluation_timeout: None,
        session_idle_ttl: Duration::from_secs(3600),
    }
}

fn create_test_server(client: Arc<ScriptedEvaluationClient>) -> TestServer {
    let client: Arc<dyn EvaluationClient> = client;
    let state = Arc::new(AppState {
        sessions: Arc::new(SessionStore::new()),
        orchestrator: Arc::new(ConversationOrchestrator::new(
            client,
            Arc::new("test prompt".to_string()),
        )),
        config: Arc::new(test_config()),
    });
    TestServer::new(create_router(state)).unwrap()
}

async fn started_session(server: &TestServer, user: &'static str) -> SessionView {
    let created: SessionView = server
        .post("/sessions")
        .add_header(USER, HeaderValue::from_static(user))
        .await
        .json();
    server
        .post(&format!("/sessions/{}/start", created.id))
        .add_header(USER, HeaderValue::from_static(user))
        .await
        .json()
}

#[tokio::test]
async fn full_session_produces_a_report() {
    let client = Arc::new(ScriptedEvaluationClient::new());
    client
        .push_reply(&reply("Whatever. He never listens.", [80, 70, 60, 50], 16, false))
        .push_reply(&reply("I guess I could ask him first.", [70, 80, 90, 100], 92, true));
    let server = create_test_server(client.clone());

    let created = server
        .post("/sessions")
        .add_header(USER, HeaderValue::from_static("alice"))
        .await;
    created.assert_status(StatusCode::CREATED);
    let created: SessionView = created.json();
    assert_eq!(created.phase, PhaseView::NotStarted);
    assert!(created.messages.is_empty());

    let session = started_session_from(&server, &created).await;
    assert_eq!(session.phase, PhaseView::Active);
    assert_eq!(session.messages.len(), 1);
    assert_eq!(session.partner.willingness, 10);

    let first = server
        .post(&format!("/sessions/{}/turns", created.id))
        .add_header(USER, HeaderValue::from_static("alice"))
        .json(&json!({ "text": "What happened today?" }))
        .await;
    first.assert_status_ok();
    let first: TurnResponse = first.json();
    assert_eq!(first.disposition, TurnDisposition::Completed);
    assert_eq!(first.reply.unwrap().text, "Whatever. He never listens.");
    assert_eq!(first.session.turn_count, 1);
    assert!(!first.session.ended);

    let second: TurnResponse = server
        .post(&format!("/sessions/{}/turns", created.id))
        .add_header(USER, HeaderValue::from_static("alice"))
        .json(&json!({ "text": "What would you like instead?" }))
        .await
        .json();
    assert_eq!(second.disposition, TurnDisposition::Completed);
    assert!(second.session.ended);
    assert_eq!(second.session.partner.willingness, 92);
    assert_eq!(second.session.partner.mood, "committed");

    let report = server
        .get(&format!("/sessions/{}/report", created.id))
        .add_header(USER, HeaderValue::from_static("alice"))
        .await;
    report.assert_status_ok();
    let report: ReportView = report.json();
    // Per-technique means: 75, 75, 75, 75. Overall: 75.
    assert_eq!(report.overall_score, 75);
    assert_eq!(report.rank_title, "Pro Coach");
    assert_eq!(report.chart.len(), 4);
    assert!(report.chart.iter().all(|c| c.value == 75));
    assert_eq!(report.turns.len(), 2);
    assert_eq!(report.turns[0].user_text, "What happened today?");
    assert_eq!(client.calls(), 2);
}

async fn started_session_from(server: &TestServer, created: &SessionView) -> SessionView {
    let response = server
        .post(&format!("/sessions/{}/start", created.id))
        .add_header(USER, HeaderValue::from_static("alice"))
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn upstream_failure_returns_bad_gateway_and_keeps_the_message() {
    let client = Arc::new(ScriptedEvaluationClient::new());
    client.push_failure("service unavailable");
    let server = create_test_server(client);
    let session = started_session(&server, "alice").await;

    let response = server
        .post(&format!("/sessions/{}/turns", session.id))
        .add_header(USER, HeaderValue::from_static("alice"))
        .json(&json!({ "text": "How are you feeling?" }))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: ErrorResponse = response.json();
    assert!(body.message.contains("send your message again"));

    let after: SessionView = server
        .get(&format!("/sessions/{}", session.id))
        .add_header(USER, HeaderValue::from_static("alice"))
        .await
        .json();
    assert_eq!(after.turn_count, 0);
    assert_eq!(after.messages.len(), 2);
    assert!(!after.in_flight);
}

#[tokio::test]
async fn malformed_reply_returns_bad_gateway() {
    let client = Arc::new(ScriptedEvaluationClient::new());
    client.push_reply(r#"{"response":"hm","isEnding":false}"#);
    let server = create_test_server(client);
    let session = started_session(&server, "alice").await;

    server
        .post(&format!("/sessions/{}/turns", session.id))
        .add_header(USER, HeaderValue::from_static("alice"))
        .json(&json!({ "text": "Tell me more?" }))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn submissions_are_ignored_before_start_and_when_empty() {
    let client = Arc::new(ScriptedEvaluationClient::new());
    let server = create_test_server(client.clone());

    let created: SessionView = server
        .post("/sessions")
        .add_header(USER, HeaderValue::from_static("alice"))
        .await
        .json();
    let not_started: TurnResponse = server
        .post(&format!("/sessions/{}/turns", created.id))
        .add_header(USER, HeaderValue::from_static("alice"))
        .json(&json!({ "text": "Hello?" }))
        .await
        .json();
    assert_eq!(not_started.disposition, TurnDisposition::Ignored);
    assert_eq!(not_started.ignored_reason, Some(IgnoreReasonView::NotStarted));
    assert!(not_started.session.messages.is_empty());

    let session = started_session(&server, "bob").await;
    let empty: TurnResponse = server
        .post(&format!("/sessions/{}/turns", session.id))
        .add_header(USER, HeaderValue::from_static("bob"))
        .json(&json!({ "text": "   " }))
        .await
        .json();
    assert_eq!(empty.disposition, TurnDisposition::Ignored);
    assert_eq!(empty.ignored_reason, Some(IgnoreReasonView::EmptyInput));
    assert_eq!(empty.session.messages.len(), 1);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn submissions_after_the_end_are_ignored() {
    let client = Arc::new(ScriptedEvaluationClient::new());
    client.push_reply(&reply("Okay. I'll talk to him tomorrow.", [100, 100, 100, 100], 95, true));
    let server = create_test_server(client.clone());
    let session = started_session(&server, "alice").await;
    let path = format!("/sessions/{}/turns", session.id);

    let ended: TurnResponse = server
        .post(&path)
        .add_header(USER, HeaderValue::from_static("alice"))
        .json(&json!({ "text": "What will you do next?" }))
        .await
        .json();
    assert!(ended.session.ended);

    let late: TurnResponse = server
        .post(&path)
        .add_header(USER, HeaderValue::from_static("alice"))
        .json(&json!({ "text": "Anything else?" }))
        .await
        .json();
    assert_eq!(late.ignored_reason, Some(IgnoreReasonView::Ended));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn restart_resets_the_session() {
    let client = Arc::new(ScriptedEvaluationClient::new());
    client.push_reply(&reply("Fine.", [50, 50, 50, 50], 12, false));
    let server = create_test_server(client);
    let session = started_session(&server, "alice").await;

    server
        .post(&format!("/sessions/{}/turns", session.id))
        .add_header(USER, HeaderValue::from_static("alice"))
        .json(&json!({ "text": "And then?" }))
        .await
        .assert_status_ok();

    let restarted: SessionView = server
        .post(&format!("/sessions/{}/start", session.id))
        .add_header(USER, HeaderValue::from_static("alice"))
        .await
        .json();
    assert_eq!(restarted.turn_count, 0);
    assert_eq!(restarted.messages.len(), 1);
    assert_ne!(restarted.messages[0].id, session.messages[0].id);
}

#[tokio::test]
async fn missing_user_header_is_a_bad_request() {
    let server = create_test_server(Arc::new(ScriptedEvaluationClient::new()));

    server.post("/sessions").await.assert_status_bad_request();
    server.get("/sessions").await.assert_status_bad_request();
}

#[tokio::test]
async fn sessions_are_scoped_to_their_owner() {
    let server = create_test_server(Arc::new(ScriptedEvaluationClient::new()));
    let session = started_session(&server, "alice").await;

    server
        .get(&format!("/sessions/{}", session.id))
        .add_header(USER, HeaderValue::from_static("mallory"))
        .await
        .assert_status_not_found();
    server
        .get(&format!("/sessions/{}/report", session.id))
        .add_header(USER, HeaderValue::from_static("mallory"))
        .await
        .assert_status_not_found();

    let listed: Vec<SessionSummary> = server
        .get("/sessions")
        .add_header(USER, HeaderValue::from_static("mallory"))
        .await
        .json();
    assert!(listed.is_empty());

    let listed: Vec<SessionSummary> = server
        .get("/sessions")
        .add_header(USER, HeaderValue::from_static("alice"))
        .await
        .json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, session.id);
}

#[tokio::test]
async fn delete_removes_the_session() {
    let server = create_test_server(Arc::new(ScriptedEvaluationClient::new()));
    let session = started_session(&server, "alice").await;
    let path = format!("/sessions/{}", session.id);

    server
        .delete(&path)
        .add_header(USER, HeaderValue::from_static("alice"))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get(&path)
        .add_header(USER, HeaderValue::from_static("alice"))
        .await
        .assert_status_not_found();
    server
        .delete(&path)
        .add_header(USER, HeaderValue::from_static("alice"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn report_for_a_fresh_session_is_empty() {
    let server = create_test_server(Arc::new(ScriptedEvaluationClient::new()));
    let session = started_session(&server, "alice").await;

    let report: ReportView = server
        .get(&format!("/sessions/{}/report", session.id))
        .add_header(USER, HeaderValue::from_static("alice"))
        .await
        .json();
    assert_eq!(report.overall_score, 0);
    assert_eq!(report.rank_title, "Advisor Type");
    assert!(report.turns.is_empty());
}

#[tokio::test]
async fn guide_lists_the_core_skills() {
    let server = create_test_server(Arc::new(ScriptedEvaluationClient::new()));

    let response = server.get("/guide").await;
    response.assert_status_ok();
    let guide: GuideView = response.json();
    assert_eq!(guide.persona, "Kim Bulman");
    assert_eq!(guide.skills.len(), 4);
}
