//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the session store
//! and the turn orchestrator shared by every handler and socket.

use crate::{config::Config, store::SessionStore};
use coaching_core::ConversationOrchestrator;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub config: Arc<Config>,
}
