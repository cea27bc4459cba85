//! WebSocket module — client sessions for the room relay.
//!
//! - [`messages`]: Typed event/command envelopes.
//! - [`handler`]: Axum WebSocket upgrade handler and per-connection loops.

pub mod handler;
pub mod messages;

pub use handler::ws_handler;
pub use messages::WsEvent;
