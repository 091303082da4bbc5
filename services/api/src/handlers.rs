//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for practice
//! sessions. It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use coaching_core::{
    TurnError,
    persona::{PERSONA_NAME, coaching_guide},
    report::SessionReport,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    models::{
        ErrorResponse, GuideView, MessageView, ReportView, SessionSummary, SessionView,
        SubmitTurnPayload, TurnDisposition, TurnResponse,
    },
    state::AppState,
    store::SessionSlot,
    turn::{self, TurnResult},
};

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Upstream(TurnError),
    InternalServerError(anyhow::Error),
}

/// Message shown to the user when a turn could not be evaluated.
pub fn turn_failure_message(err: &TurnError) -> String {
    match err {
        TurnError::TimedOut(_) => {
            "Kim did not answer in time. Please send your message again.".to_string()
        }
        _ => "Something went wrong while Kim was answering. Please send your message again."
            .to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Upstream(err) => {
                warn!("Turn failed upstream: {:#}", err);
                let message = turn_failure_message(&err);
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

fn user_id(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("x-user-id header is required".to_string()))
}

async fn find_session(state: &AppState, id: Uuid, user_id: &str) -> Result<SessionSlot, ApiError> {
    state
        .sessions
        .get(id, user_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session with id '{}' not found", id)))
}

/// Create a new practice session. It stays unstarted until `/start` is called.
#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session created successfully", body = SessionView),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user creating the session")
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user_id(&headers)?;
    let record = state.sessions.create(user_id).await;
    info!(session_id = %record.id, user_id, "Session created");
    Ok((StatusCode::CREATED, Json(SessionView::from(&record))))
}

/// List all sessions for a user.
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "List of sessions", body = [SessionSummary]),
        (status = 400, description = "Bad request", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let user_id = user_id(&headers)?;
    let sessions = state.sessions.list(user_id).await;
    Ok(Json(sessions.iter().map(SessionSummary::from).collect()))
}

/// Get a specific session by its ID.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user_id(&headers)?;
    let slot = find_session(&state, id, user_id).await?;
    let view = SessionView::from(&*slot.lock().await);
    Ok((StatusCode::OK, Json(view)))
}

/// Start a session, or restart it from a fresh opening line.
#[utoipa::path(
    post,
    path = "/sessions/{id}/start",
    responses(
        (status = 200, description = "Session started", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user_id(&headers)?;
    let slot = find_session(&state, id, user_id).await?;
    let mut record = slot.lock().await;
    record.restart();
    info!(session_id = %id, "Session (re)started");
    Ok((StatusCode::OK, Json(SessionView::from(&*record))))
}

/// Submit one user turn and wait for the partner's evaluated reply.
#[utoipa::path(
    post,
    path = "/sessions/{id}/turns",
    request_body = SubmitTurnPayload,
    responses(
        (status = 200, description = "Turn completed or ignored", body = TurnResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 502, description = "The evaluation service failed; the turn can be retried", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn submit_turn(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitTurnPayload>,
) -> Result<Json<TurnResponse>, ApiError> {
    let user_id = user_id(&headers)?;
    let slot = find_session(&state, id, user_id).await?;

    let result = turn::run(&state.orchestrator, &slot, &payload.text)
        .await
        .map_err(ApiError::Upstream)?;

    let (disposition, ignored_reason, reply) = match result {
        TurnResult::Completed(completed) => (
            TurnDisposition::Completed,
            None,
            Some(MessageView::from(&completed.reply)),
        ),
        TurnResult::Ignored(reason) => (TurnDisposition::Ignored, Some(reason.into()), None),
        TurnResult::Superseded => (TurnDisposition::Superseded, None, None),
    };

    let session = SessionView::from(&*slot.lock().await);
    Ok(Json(TurnResponse {
        disposition,
        ignored_reason,
        reply,
        session,
    }))
}

/// Score the session and build its report.
#[utoipa::path(
    get,
    path = "/sessions/{id}/report",
    responses(
        (status = 200, description = "Session report", body = ReportView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportView>, ApiError> {
    let user_id = user_id(&headers)?;
    let slot = find_session(&state, id, user_id).await?;
    let report = SessionReport::from_messages(slot.lock().await.state.messages());
    Ok(Json(report.into()))
}

/// Delete a session.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = user_id(&headers)?;
    if !state.sessions.remove(id, user_id).await {
        return Err(ApiError::NotFound(format!(
            "Session with id '{}' not found",
            id
        )));
    }
    info!(session_id = %id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// The coaching guide shown before a session.
#[utoipa::path(
    get,
    path = "/guide",
    responses(
        (status = 200, description = "Coaching guide", body = GuideView)
    )
)]
pub async fn get_guide() -> Json<GuideView> {
    Json(GuideView::new(PERSONA_NAME, coaching_guide()))
}
