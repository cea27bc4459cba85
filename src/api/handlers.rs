use axum::Json;
use axum::extract::{Path, State};

use crate::room::RoomSnapshot;

use super::errors::ApiError;
use super::models::*;
use super::state::SharedState;

// =========================================================================
// Health
// =========================================================================

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime,
        connections: state.connections.len().await,
        rooms: state.rooms.len().await,
        dropped_frames: state.connections.dropped_frames().await,
    })
}

// =========================================================================
// Rooms
// =========================================================================

/// GET /api/rooms
pub async fn list_rooms(State(state): State<SharedState>) -> Json<Vec<RoomSummary>> {
    let rooms = state.rooms.snapshots().await;
    Json(rooms.into_iter().map(RoomSummary::from).collect())
}

/// GET /api/rooms/{id}
pub async fn get_room(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    match state.rooms.snapshot(&id).await {
        Some(room) => Ok(Json(room)),
        None => Err(ApiError::RoomNotFound(id)),
    }
}
