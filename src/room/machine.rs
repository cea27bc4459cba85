//! Room state machine: join, leave, ready, state relay and game over.
//!
//! Every transition runs with the room lock held and only pushes into player
//! outboxes, so it never awaits. A recipient whose push fails is evicted on
//! the spot and announced to the rest of the room.

use axum::extract::ws::Utf8Bytes;
use tracing::{debug, info, warn};

use super::types::{ConnectionId, Mode, Player, Room};
use crate::relay::outbox::{Frame, PushOutcome};
use crate::ws::messages::WsEvent;

/// What a `ready` event led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// `startGame` sent; the room is now in progress.
    Started,
    /// Multi mode without enough ready players.
    Waiting { ready: usize, total: usize },
    /// No mode given; nothing changes.
    NoMode,
    /// The sender is not a member of this room.
    NotInRoom,
}

impl Room {
    /// Add a player and announce it with `playerJoin` + `roomStatus`.
    pub fn join(&mut self, conn: ConnectionId, player: Player) {
        let name = player.name.clone();
        self.add_player(conn, player);
        info!(room = %self.id, conn = %conn, name, count = self.len(), "player joined");

        let event = WsEvent::player_join(&name, self.player_names());
        self.broadcast(Frame::control(event.to_json()));
        self.broadcast_status();
    }

    /// Remove a player and announce it. Returns the removed player, `None`
    /// when the connection had already been evicted.
    pub fn leave(&mut self, conn: ConnectionId) -> Option<Player> {
        let player = self.remove_player(conn)?;
        info!(
            room = %self.id,
            conn = %conn,
            name = player.name,
            count = self.len(),
            in_game = self.in_game,
            "player left"
        );
        self.announce_leave(&player.name);
        Some(player)
    }

    /// Mark the sender ready for `mode` and start the game if possible.
    pub fn ready(&mut self, conn: ConnectionId, mode: Mode) -> ReadyOutcome {
        let Some(player) = self.players.get_mut(&conn) else {
            return ReadyOutcome::NotInRoom;
        };
        let solo = match mode {
            Mode::Single => true,
            Mode::Multi => false,
            Mode::Unset => {
                debug!(room = %self.id, conn = %conn, "ready without a mode ignored");
                return ReadyOutcome::NoMode;
            }
        };
        player.ready = true;
        self.mode = mode;
        self.broadcast_status();

        if solo {
            self.in_game = true;
            info!(room = %self.id, conn = %conn, "single-player game started");
            self.send_to(conn, Frame::control(WsEvent::start_game().to_json()));
            return ReadyOutcome::Started;
        }

        let total = self.len();
        let ready = self.ready_count();
        if total >= 2 && self.all_ready() {
            self.in_game = true;
            info!(room = %self.id, players = total, "multiplayer game started");
            self.broadcast(Frame::control(WsEvent::start_game().to_json()));
            ReadyOutcome::Started
        } else {
            debug!(room = %self.id, ready, total, "not enough ready players");
            self.broadcast(Frame::control(WsEvent::waiting(ready, total).to_json()));
            ReadyOutcome::Waiting { ready, total }
        }
    }

    /// Relay an opaque `state` payload to the room. The sender receives its
    /// own frame back unless `echo_sender` is false.
    pub fn relay_state(&mut self, sender: ConnectionId, payload: Utf8Bytes, echo_sender: bool) {
        let frame = Frame::relay(payload);
        self.deliver(frame, |conn| echo_sender || conn != sender);
    }

    /// Forward `gameOver` verbatim, reset every ready flag and leave the
    /// in-progress state.
    pub fn game_over(&mut self, payload: Utf8Bytes) {
        self.broadcast(Frame::control(payload));
        for player in self.players.values_mut() {
            player.ready = false;
        }
        self.in_game = false;
        info!(room = %self.id, "game over");
        self.broadcast_status();
    }

    /// Send a frame to one member.
    pub fn send_to(&mut self, conn: ConnectionId, frame: Frame) {
        let failed = self
            .players
            .get(&conn)
            .is_some_and(|p| p.outbox.push(frame).is_failure());
        if failed {
            self.evict(conn);
        }
    }

    pub fn broadcast(&mut self, frame: Frame) {
        self.deliver(frame, |_| true);
    }

    fn broadcast_status(&mut self) {
        let event = WsEvent::room_status(self.player_states());
        self.broadcast(Frame::status(event.to_json()));
    }

    fn announce_leave(&mut self, name: &str) {
        let event = WsEvent::player_leave(name, self.player_names());
        self.broadcast(Frame::control(event.to_json()));
        self.broadcast_status();
    }

    /// Push `frame` to every member accepted by `filter`, then evict the
    /// members whose outbox failed.
    fn deliver(&mut self, frame: Frame, filter: impl Fn(ConnectionId) -> bool) {
        let mut failed = Vec::new();
        for (&conn, player) in &self.players {
            if !filter(conn) {
                continue;
            }
            match player.outbox.push(frame.clone()) {
                PushOutcome::Queued => {}
                PushOutcome::DroppedOldest | PushOutcome::Discarded => {
                    debug!(room = %self.id, conn = %conn, "dropped stale relay frame");
                }
                PushOutcome::Overflow | PushOutcome::Closed => failed.push(conn),
            }
        }
        for conn in failed {
            self.evict(conn);
        }
    }

    fn evict(&mut self, conn: ConnectionId) {
        if let Some(player) = self.remove_player(conn) {
            player.outbox.close();
            warn!(room = %self.id, conn = %conn, name = player.name, "evicted unresponsive player");
            self.announce_leave(&player.name);
        }
    }
}
