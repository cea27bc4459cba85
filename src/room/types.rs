use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::relay::outbox::Outbox;

// ---------------------------------------------------------------------------
// ConnectionId
// ---------------------------------------------------------------------------

/// Identity of one client channel. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Game mode, shared by every player in a room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    #[serde(skip_deserializing)]
    Unset,
    Single,
    Multi,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Unset => "unset",
            Mode::Single => "single",
            Mode::Multi => "multi",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Player {
    pub name: String,
    pub ready: bool,
    /// Outbound queue of the player's connection (shared with its writer task).
    pub outbox: Arc<Outbox>,
}

impl Player {
    pub fn new(name: impl Into<String>, outbox: Arc<Outbox>) -> Self {
        Player {
            name: name.into(),
            ready: false,
            outbox,
        }
    }
}

/// Name + ready flag as shown in `roomStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerState {
    pub name: String,
    pub ready: bool,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One named room. Players are ordered by connection id, i.e. by join order.
#[derive(Debug)]
pub struct Room {
    pub id: String,
    pub players: BTreeMap<ConnectionId, Player>,
    pub in_game: bool,
    pub mode: Mode,
    /// Set once the room has been removed from the registry.
    pub(crate) closed: bool,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Room {
            id: id.into(),
            players: BTreeMap::new(),
            in_game: false,
            mode: Mode::Unset,
            closed: false,
        }
    }

    /// Insert a player; an existing entry for the same connection is replaced.
    pub fn add_player(&mut self, conn: ConnectionId, player: Player) {
        self.players.insert(conn, player);
    }

    pub fn remove_player(&mut self, conn: ConnectionId) -> Option<Player> {
        self.players.remove(&conn)
    }

    pub fn player_names(&self) -> Vec<String> {
        self.players.values().map(|p| p.name.clone()).collect()
    }

    pub fn player_states(&self) -> Vec<PlayerState> {
        self.players
            .values()
            .map(|p| PlayerState {
                name: p.name.clone(),
                ready: p.ready,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn ready_count(&self) -> usize {
        self.players.values().filter(|p| p.ready).count()
    }

    pub fn all_ready(&self) -> bool {
        self.players.values().all(|p| p.ready)
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.players.contains_key(&conn)
    }
}
