//! Owns every live room behind its own lock.
//!
//! Lock discipline: the map lock is never held while waiting for a room
//! lock, and no operation holds more than one room lock. Leaving may take
//! the map lock while holding its room lock (room → map), which cannot
//! cycle because nothing goes map → room.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::types::{ConnectionId, Mode, Player, PlayerState, Room};

pub type RoomHandle = Arc<Mutex<Room>>;

/// Point-in-time view of one room for the HTTP API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: String,
    pub in_game: bool,
    pub mode: Mode,
    pub players: Vec<PlayerState>,
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, RoomHandle>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live room for `id`, creating an empty one if absent.
    pub async fn get_or_create(&self, id: &str) -> RoomHandle {
        if let Some(room) = self.rooms.read().await.get(id) {
            return room.clone();
        }
        self.rooms
            .write()
            .await
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(room = id, "room created");
                Arc::new(Mutex::new(Room::new(id)))
            })
            .clone()
    }

    /// Join `player` to room `id` and broadcast the join. Retries when the
    /// room found was reaped between lookup and lock.
    pub async fn join(&self, id: &str, conn: ConnectionId, player: Player) -> RoomHandle {
        loop {
            let handle = self.get_or_create(id).await;
            let mut room = handle.lock().await;
            if room.closed {
                continue;
            }
            room.join(conn, player);
            drop(room);
            return handle;
        }
    }

    /// Remove `conn` from its room, broadcasting the leave if it was still a
    /// member, and reap the room once empty.
    pub async fn leave(&self, handle: &RoomHandle, conn: ConnectionId) -> Option<Player> {
        let mut room = handle.lock().await;
        let player = room.leave(conn);
        if room.is_empty() && !room.closed {
            room.closed = true;
            let mut rooms = self.rooms.write().await;
            if rooms.get(&room.id).is_some_and(|r| Arc::ptr_eq(r, handle)) {
                rooms.remove(&room.id);
                info!(room = %room.id, "room reaped");
            }
        }
        player
    }

    pub async fn get(&self, id: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(id).cloned()
    }

    /// Number of live rooms.
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of one live room; `None` once it has been reaped.
    pub async fn snapshot(&self, id: &str) -> Option<RoomSnapshot> {
        let handle = self.get(id).await?;
        let room = handle.lock().await;
        (!room.closed).then(|| snapshot_of(&room))
    }

    /// Snapshots of every live room, sorted by id. Locks one room at a time.
    pub async fn snapshots(&self) -> Vec<RoomSnapshot> {
        let handles: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            let room = handle.lock().await;
            if !room.closed {
                out.push(snapshot_of(&room));
            }
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }
}

fn snapshot_of(room: &Room) -> RoomSnapshot {
    RoomSnapshot {
        id: room.id.clone(),
        in_game: room.in_game,
        mode: room.mode,
        players: room.player_states(),
    }
}
