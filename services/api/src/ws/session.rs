//! Manages the WebSocket connection lifecycle for a practice session.

use super::protocol::{ClientMessage, ServerMessage};
use crate::{
    handlers::turn_failure_message,
    models::{MessageView, MoodView, ReportView, SessionView},
    state::AppState,
    store::SessionSlot,
    turn::{self, TurnResult},
};
use anyhow::{Result, anyhow};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use coaching_core::{
    report::SessionReport,
    session::{PendingTurn, TurnStart},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, error, info, instrument, warn};
use uuid::Uuid;

type SocketSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
///
/// The first client message must be `init`, naming a session the user owns.
/// Once attached, the socket is served by [`run_session`] in its own task.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let temp_id: u32 = rand::random();
    tracing::Span::current().record("session_id", temp_id);
    info!("New WebSocket connection. Awaiting initialization...");

    let (socket_tx, mut socket_rx) = socket.split();
    let socket_tx: SocketSink = Arc::new(Mutex::new(socket_tx));

    let attached = match socket_rx.next().await {
        Some(Ok(Message::Text(text))) => attach_session(&text, &state).await,
        Some(Ok(_)) => Err(anyhow!("First message was not a text `init` message.")),
        Some(Err(e)) => {
            warn!("Error receiving init message: {:?}", e);
            return;
        }
        None => {
            info!("Client disconnected before sending init message.");
            return;
        }
    };

    let (session_id, slot) = match attached {
        Ok(attached) => attached,
        Err(e) => {
            error!("Session initialization failed: {:?}", e);
            let _ = send_msg(
                &socket_tx,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
            let _ = socket_tx.lock().await.close().await;
            return;
        }
    };

    let session = SessionView::from(&*slot.lock().await);
    if send_msg(&socket_tx, ServerMessage::Initialized { session })
        .await
        .is_err()
    {
        error!("Failed to send Initialized message to client.");
        return;
    }

    let session_span = tracing::info_span!("practice_session", %session_id);
    tokio::spawn(
        async move {
            if let Err(e) = run_session(state, socket_tx, socket_rx, slot).await {
                error!(error = ?e, "Practice session terminated with error.");
            }
            info!("Practice session finished.");
        }
        .instrument(session_span),
    );
}

/// Parses the `init` message and looks up the session it names.
async fn attach_session(init_text: &str, state: &Arc<AppState>) -> Result<(Uuid, SessionSlot)> {
    let ClientMessage::Init {
        session_id,
        user_id,
    } = serde_json::from_str::<ClientMessage>(init_text)?
    else {
        return Err(anyhow!("First message must be `init`"));
    };

    tracing::Span::current().record("session_id", tracing::field::display(session_id));
    let slot = state
        .sessions
        .get(session_id, &user_id)
        .await
        .ok_or_else(|| anyhow!("Session with id '{}' not found", session_id))?;
    info!(%user_id, "Attached to session");
    Ok((session_id, slot))
}

/// The main event loop for an attached WebSocket.
async fn run_session(
    state: Arc<AppState>,
    socket_tx: SocketSink,
    mut socket_rx: SplitStream<WebSocket>,
    slot: SessionSlot,
) -> Result<()> {
    while let Some(msg_result) = socket_rx.next().await {
        let text = match msg_result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                info!("Client sent close frame. Shutting down session.");
                break;
            }
            Ok(Message::Binary(_)) => {
                warn!("Ignoring binary frame.");
                continue;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Err(e) => {
                error!("Error receiving from client WebSocket: {:?}", e);
                break;
            }
        };

        let msg = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Unparseable client message: {}", e);
                send_msg(
                    &socket_tx,
                    ServerMessage::Error {
                        message: format!("Invalid message: {}", e),
                    },
                )
                .await?;
                continue;
            }
        };

        match msg {
            ClientMessage::Init { .. } => {
                send_msg(
                    &socket_tx,
                    ServerMessage::Error {
                        message: "Session is already initialized".to_string(),
                    },
                )
                .await?;
            }
            ClientMessage::Start => {
                let session = {
                    let mut record = slot.lock().await;
                    record.restart();
                    SessionView::from(&*record)
                };
                info!("Session (re)started");
                send_msg(&socket_tx, ServerMessage::SessionStarted { session }).await?;
            }
            ClientMessage::UserMessage { text } => match turn::accept(&slot, &text).await {
                TurnStart::Accepted(pending) => {
                    let message = MessageView::from(&pending.user_message);
                    send_msg(&socket_tx, ServerMessage::TurnAccepted { message }).await?;
                    spawn_turn(state.clone(), slot.clone(), socket_tx.clone(), pending);
                }
                TurnStart::Ignored(reason) => {
                    info!(?reason, "Ignoring user message");
                    send_msg(
                        &socket_tx,
                        ServerMessage::TurnIgnored {
                            reason: reason.into(),
                        },
                    )
                    .await?;
                }
            },
            ClientMessage::RequestReport => {
                let report = SessionReport::from_messages(slot.lock().await.state.messages());
                send_msg(
                    &socket_tx,
                    ServerMessage::Report {
                        report: ReportView::from(report),
                    },
                )
                .await?;
            }
        }
    }

    info!("WebSocket connection closed.");
    Ok(())
}

/// Resolves an accepted turn off the read loop and reports the result.
///
/// The turn settles on the session even if the socket has gone away.
fn spawn_turn(
    state: Arc<AppState>,
    slot: SessionSlot,
    socket_tx: SocketSink,
    pending: PendingTurn,
) {
    tokio::spawn(
        async move {
            let msg = match turn::resolve(&state.orchestrator, &slot, pending).await {
                Ok(TurnResult::Completed(completed)) => ServerMessage::TurnCompleted {
                    reply: MessageView::from(&completed.reply),
                    turn_count: completed.turn_count,
                    ended: completed.ended,
                    willingness: completed.willingness,
                    mood: MoodView::new(completed.willingness),
                },
                Ok(TurnResult::Ignored(reason)) => ServerMessage::TurnIgnored {
                    reason: reason.into(),
                },
                Ok(TurnResult::Superseded) => return,
                Err(e) => ServerMessage::TurnFailed {
                    message: turn_failure_message(&e),
                },
            };
            if let Err(e) = send_msg(&socket_tx, msg).await {
                warn!("Could not deliver turn result: {}", e);
            }
        }
        .in_current_span(),
    );
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(socket_tx: &SocketSink, msg: ServerMessage) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx
        .lock()
        .await
        .send(Message::Text(serialized.into()))
        .await?;
    Ok(())
}
