//! Coaching API Library Crate
//!
//! Application state, the in-memory session store, REST handlers, the
//! WebSocket session and routing for the coaching practice service. The
//! `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod store;
pub mod turn;
pub mod ws;
