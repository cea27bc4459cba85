//! Routes decoded client messages to room transitions.

use axum::extract::ws::Utf8Bytes;
use tracing::{debug, warn};

use crate::relay::outbox::Frame;
use crate::room::{ConnectionId, RoomHandle};
use crate::ws::messages::{ClientMessage, Inbound, ProtocolError, WsEvent};

/// Per-connection routing context.
#[derive(Debug, Clone)]
pub struct RelayRouter {
    pub conn: ConnectionId,
    pub room: RoomHandle,
    pub echo_state: bool,
}

impl RelayRouter {
    pub fn new(conn: ConnectionId, room: RoomHandle, echo_state: bool) -> Self {
        Self {
            conn,
            room,
            echo_state,
        }
    }

    /// Apply one decoded message to the room.
    pub async fn dispatch(&self, inbound: Inbound) {
        let mut room = self.room.lock().await;
        if !room.contains(self.conn) {
            debug!(room = %room.id, conn = %self.conn, "ignoring frame from evicted connection");
            return;
        }
        match inbound.message {
            ClientMessage::Ready { mode } => {
                let outcome = room.ready(self.conn, mode);
                debug!(room = %room.id, conn = %self.conn, %mode, ?outcome, "ready");
            }
            ClientMessage::State => {
                room.relay_state(self.conn, inbound.raw, self.echo_state);
            }
            ClientMessage::GameOver => {
                room.game_over(inbound.raw);
            }
        }
    }

    /// Drop a frame that failed to decode, telling only the sender why.
    pub async fn reject(&self, err: &ProtocolError) {
        let mut room = self.room.lock().await;
        warn!(room = %room.id, conn = %self.conn, error = %err, "dropped malformed frame");
        let event = WsEvent::error(&err.to_string());
        room.send_to(self.conn, Frame::control(event.to_json()));
    }

    /// Decode and dispatch a text frame.
    pub async fn handle_text(&self, text: Utf8Bytes) {
        match Inbound::decode(text) {
            Ok(inbound) => self.dispatch(inbound).await,
            Err(err) => self.reject(&err).await,
        }
    }

    /// Decode and dispatch a binary frame carrying UTF-8 JSON.
    pub async fn handle_binary(&self, bytes: &[u8]) {
        match Inbound::decode_binary(bytes) {
            Ok(inbound) => self.dispatch(inbound).await,
            Err(err) => self.reject(&err).await,
        }
    }
}
