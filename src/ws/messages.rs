//! WebSocket message types for room events and relayed game frames.

use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};

use crate::room::{Mode, PlayerState};

/// Countdown announced with every `startGame`.
pub const START_COUNTDOWN: u32 = 3;

// ---------------------------------------------------------------------------
// Server → Client events
// ---------------------------------------------------------------------------

/// Envelope sent from server to room members.
#[derive(Debug, Clone, Serialize)]
pub struct WsEvent {
    /// Discriminator so clients can switch on event type.
    #[serde(rename = "type")]
    pub event_type: WsEventType,
    /// Event-specific payload.
    #[serde(flatten)]
    pub payload: WsPayload,
}

/// Event type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WsEventType {
    PlayerJoin,
    PlayerLeave,
    RoomStatus,
    StartGame,
    Waiting,
    Error,
}

/// Event payload variants.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WsPayload {
    Membership(MembershipPayload),
    RoomStatus(RoomStatusPayload),
    StartGame(StartGamePayload),
    Waiting(WaitingPayload),
    Error(ErrorPayload),
}

/// Shared by `playerJoin` and `playerLeave`.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipPayload {
    pub name: String,
    pub count: usize,
    pub players: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomStatusPayload {
    pub players: Vec<PlayerState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartGamePayload {
    pub countdown: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitingPayload {
    pub msg: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Client → Server messages
// ---------------------------------------------------------------------------

/// Messages sent from client to server. Fields other than `type` (and
/// `mode` for `ready`) are ignored here; `state` and `gameOver` are relayed
/// from the raw frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Ready { mode: Mode },
    State,
    GameOver,
}

/// A decoded client frame together with its original text.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub message: ClientMessage,
    pub raw: Utf8Bytes,
}

/// Inbound frame that could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("binary frame is not valid UTF-8")]
    NotUtf8,
}

impl Inbound {
    pub fn decode(raw: Utf8Bytes) -> Result<Self, ProtocolError> {
        let message = serde_json::from_str::<ClientMessage>(raw.as_str())?;
        Ok(Inbound { message, raw })
    }

    pub fn decode_binary(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::NotUtf8)?;
        Self::decode(Utf8Bytes::from(text))
    }
}

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl WsEvent {
    pub fn player_join(name: &str, players: Vec<String>) -> Self {
        WsEvent {
            event_type: WsEventType::PlayerJoin,
            payload: WsPayload::Membership(MembershipPayload {
                name: name.to_string(),
                count: players.len(),
                players,
            }),
        }
    }

    pub fn player_leave(name: &str, players: Vec<String>) -> Self {
        WsEvent {
            event_type: WsEventType::PlayerLeave,
            payload: WsPayload::Membership(MembershipPayload {
                name: name.to_string(),
                count: players.len(),
                players,
            }),
        }
    }

    pub fn room_status(players: Vec<PlayerState>) -> Self {
        WsEvent {
            event_type: WsEventType::RoomStatus,
            payload: WsPayload::RoomStatus(RoomStatusPayload { players }),
        }
    }

    pub fn start_game() -> Self {
        WsEvent {
            event_type: WsEventType::StartGame,
            payload: WsPayload::StartGame(StartGamePayload {
                countdown: START_COUNTDOWN,
            }),
        }
    }

    pub fn waiting(ready: usize, total: usize) -> Self {
        WsEvent {
            event_type: WsEventType::Waiting,
            payload: WsPayload::Waiting(WaitingPayload {
                msg: format!("{ready}/{total} ready"),
            }),
        }
    }

    pub fn error(message: &str) -> Self {
        WsEvent {
            event_type: WsEventType::Error,
            payload: WsPayload::Error(ErrorPayload {
                message: message.to_string(),
            }),
        }
    }

    /// Serialize to JSON text for sending over WebSocket.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"error","message":"serialization failed"}"#.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
