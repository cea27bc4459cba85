//! Room membership, readiness and game lifecycle.
//!
//! - [`types`]: Room and player data.
//! - [`machine`]: Join / leave / ready / state / game-over transitions.
//! - [`registry`]: Room lookup, per-room locking and reaping.

pub mod machine;
pub mod registry;
pub mod types;

pub use machine::ReadyOutcome;
pub use registry::{RoomHandle, RoomRegistry, RoomSnapshot};
pub use types::{ConnectionId, Mode, Player, PlayerState, Room};
