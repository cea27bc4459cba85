use serde::Serialize;

use crate::room::{Mode, RoomSnapshot};

// ---------------------------------------------------------------------------
// Response models
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime: u64,
    /// Open WebSocket connections.
    pub connections: usize,
    /// Live rooms.
    pub rooms: usize,
    /// Relay frames dropped for slow open connections.
    pub dropped_frames: u64,
}

/// One entry of `GET /api/rooms`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub players: usize,
    pub in_game: bool,
    pub mode: Mode,
}

impl From<RoomSnapshot> for RoomSummary {
    fn from(snap: RoomSnapshot) -> Self {
        RoomSummary {
            id: snap.id,
            players: snap.players.len(),
            in_game: snap.in_game,
            mode: snap.mode,
        }
    }
}
