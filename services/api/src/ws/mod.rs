//! WebSocket Session Management
//!
//! Live practice sessions over WebSockets:
//!
//! - `protocol`: the JSON message format for client-server communication.
//! - `session`: the connection lifecycle, from the `init` handshake to close,
//!   with each accepted turn resolved in its own task.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
