//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ChartEntryView, ErrorResponse, EvaluationView, GuideSkillView, GuideView,
        IgnoreReasonView, MessageView, MoodView, PhaseView, ReportView, SenderView,
        SessionSummary, SessionView, SubmitTurnPayload, TurnDisposition, TurnFeedbackView,
        TurnResponse, TurnScoresView,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session,
        handlers::list_sessions,
        handlers::get_session,
        handlers::start_session,
        handlers::submit_turn,
        handlers::get_report,
        handlers::delete_session,
        handlers::get_guide,
    ),
    components(
        schemas(
            SessionView, SessionSummary, MessageView, EvaluationView, MoodView, PhaseView,
            SenderView, SubmitTurnPayload, TurnResponse, TurnDisposition, IgnoreReasonView,
            ReportView, ChartEntryView, TurnFeedbackView, TurnScoresView, GuideView,
            GuideSkillView, ErrorResponse
        )
    ),
    tags(
        (name = "Coaching API", description = "Practice sessions with the simulated coaching partner")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/start", post(handlers::start_session))
        .route("/sessions/{id}/turns", post(handlers::submit_turn))
        .route("/sessions/{id}/report", get(handlers::get_report))
        .route("/guide", get(handlers::get_guide))
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    // Swagger UI is stateless, so it is merged in separately.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
