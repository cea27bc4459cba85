//! Relay plumbing: connection tracking, outbound queues and message routing.
//!
//! - [`outbox`]: Bounded per-connection outbound queue.
//! - [`registry`]: Open connection tracking.
//! - [`router`]: Dispatch of decoded client messages to room transitions.

pub mod outbox;
pub mod registry;
pub mod router;

pub use outbox::{Frame, FrameKind, MIN_OUTBOX_CAPACITY, Outbox, PushOutcome};
pub use registry::ConnectionRegistry;
pub use router::RelayRouter;
