//! WebSocket upgrade handler. Joins the client to its room and runs the
//! per-connection reader and writer tasks.

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::api::state::SharedState;
use crate::relay::RelayRouter;
use crate::room::{ConnectionId, Player, RoomHandle};

/// Query parameters accepted on `/ws`.
#[derive(Debug, Default, Deserialize)]
pub struct JoinParams {
    pub room: Option<String>,
    pub name: Option<String>,
}

impl JoinParams {
    /// Resolve room and player name, treating empty values as absent.
    pub fn resolve(self, default_room: &str, default_name: &str) -> (String, String) {
        let room = self
            .room
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| default_room.to_string());
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_name.to_string());
        (room, name)
    }
}

/// GET /ws?room=..&name=.. — upgrade to WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<JoinParams>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let (room, name) = params.resolve(&state.config.default_room, &state.config.default_name);
    ws.on_upgrade(move |socket| handle_socket(socket, room, name, state))
}

/// Core WebSocket session logic.
async fn handle_socket(socket: WebSocket, room_id: String, name: String, state: SharedState) {
    let (conn, outbox) = state.connections.register().await;
    let (mut sink, mut stream) = socket.split();

    let room = state
        .rooms
        .join(&room_id, conn, Player::new(name.clone(), outbox.clone()))
        .await;
    info!(room = room_id, conn = %conn, name, "client connected");

    // Writer task: drain the outbox → WS sink, pinging while idle.
    let ping_every = state.config.ping_interval();
    let mut writer = tokio::spawn(async move {
        let mut ticker = ping_every.map(|period| {
            let mut t = tokio::time::interval_at(Instant::now() + period, period);
            t.set_missed_tick_behavior(MissedTickBehavior::Delay);
            t
        });
        loop {
            tokio::select! {
                frame = outbox.next() => match frame {
                    Some(frame) => {
                        if sink.send(Message::Text(frame.text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = tick(&mut ticker) => {
                    if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        // Further pushes for this connection now fail and evict it.
        outbox.close();
        let _ = sink.close().await;
    });

    // Reader task: client frames → relay router, bounded by the idle watchdog.
    let router = RelayRouter::new(conn, room.clone(), state.config.echo_state);
    let idle = state.config.idle_timeout();
    let mut reader = tokio::spawn(async move {
        loop {
            let next = match idle {
                Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        info!(conn = %router.conn, "idle timeout");
                        break;
                    }
                },
                None => stream.next().await,
            };
            match next {
                Some(Ok(Message::Text(text))) => router.handle_text(text).await,
                Some(Ok(Message::Binary(bytes))) => router.handle_binary(&bytes).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // Ping / Pong: activity only
                Some(Err(e)) => {
                    debug!(conn = %router.conn, error = %e, "read failed");
                    break;
                }
            }
        }
    });

    // Wait for either task to finish, then abort the other.
    tokio::select! {
        _ = &mut writer => { reader.abort(); }
        _ = &mut reader => { writer.abort(); }
    }

    cleanup(&state, &room, conn).await;
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Leave the room and forget the connection. Idempotent.
async fn cleanup(state: &SharedState, room: &RoomHandle, conn: ConnectionId) {
    state.rooms.leave(room, conn).await;
    state.connections.unregister(conn).await;
    debug!(conn = %conn, "WS session cleaned up");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
