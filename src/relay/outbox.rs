//! Per-connection bounded outbound queue.
//!
//! Fan-out pushes frames here without awaiting; the connection's writer task
//! drains them in order. Relay frames may be dropped under pressure, a queued
//! room status is replaced by the next one, other control frames are never
//! dropped.

use std::collections::VecDeque;
use std::sync::Mutex;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::Notify;

/// Smallest capacity a connection outbox is configured with. Fits a join
/// burst plus a handful of lifecycle events.
pub const MIN_OUTBOX_CAPACITY: usize = 8;

/// Whether a frame may be discarded when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Room lifecycle events and verbatim `gameOver` payloads.
    Control,
    /// Full `roomStatus` snapshot; a newer one replaces any still queued.
    Status,
    /// Opaque `state` payloads; newer frames supersede older ones.
    Relay,
}

/// One outbound text frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    pub text: Utf8Bytes,
}

impl Frame {
    pub fn control(text: impl Into<Utf8Bytes>) -> Self {
        Frame {
            kind: FrameKind::Control,
            text: text.into(),
        }
    }

    pub fn status(text: impl Into<Utf8Bytes>) -> Self {
        Frame {
            kind: FrameKind::Status,
            text: text.into(),
        }
    }

    pub fn relay(text: impl Into<Utf8Bytes>) -> Self {
        Frame {
            kind: FrameKind::Relay,
            text: text.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }
}

/// Result of [`Outbox::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queued after discarding the oldest pending relay frame.
    DroppedOldest,
    /// Relay frame discarded because only control frames were queued.
    Discarded,
    /// Queue full of control frames; the outbox has been closed.
    Overflow,
    /// The outbox was already closed.
    Closed,
}

impl PushOutcome {
    /// True when the recipient must be evicted.
    pub fn is_failure(self) -> bool {
        matches!(self, PushOutcome::Overflow | PushOutcome::Closed)
    }
}

#[derive(Debug)]
struct State {
    frames: VecDeque<Frame>,
    closed: bool,
    dropped: u64,
}

#[derive(Debug)]
pub struct Outbox {
    state: Mutex<State>,
    notify: Notify,
    capacity: usize,
}

impl Outbox {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Outbox {
            state: Mutex::new(State {
                frames: VecDeque::with_capacity(capacity.min(256)),
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueue a frame without blocking.
    pub fn push(&self, frame: Frame) -> PushOutcome {
        let outcome = {
            let mut state = self.lock();
            if state.closed {
                return PushOutcome::Closed;
            }
            if frame.kind == FrameKind::Status {
                if let Some(pos) = state
                    .frames
                    .iter()
                    .position(|f| f.kind == FrameKind::Status)
                {
                    state.frames.remove(pos);
                }
            }
            if state.frames.len() < self.capacity {
                state.frames.push_back(frame);
                PushOutcome::Queued
            } else if let Some(pos) = state
                .frames
                .iter()
                .position(|f| f.kind == FrameKind::Relay)
            {
                state.frames.remove(pos);
                state.dropped += 1;
                state.frames.push_back(frame);
                PushOutcome::DroppedOldest
            } else if frame.kind == FrameKind::Relay {
                state.dropped += 1;
                return PushOutcome::Discarded;
            } else {
                state.closed = true;
                state.frames.clear();
                PushOutcome::Overflow
            }
        };
        self.notify.notify_one();
        outcome
    }

    /// Pop the next frame if one is queued.
    pub fn try_next(&self) -> Option<Frame> {
        self.lock().frames.pop_front()
    }

    /// Wait for the next frame; `None` once the outbox is closed.
    ///
    /// Frames queued before [`close`](Self::close) are discarded, the writer
    /// stops as soon as the connection is torn down.
    pub async fn next(&self) -> Option<Frame> {
        loop {
            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(frame) = state.frames.pop_front() {
                    return Some(frame);
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn close(&self) {
        {
            let mut state = self.lock();
            state.closed = true;
            state.frames.clear();
        }
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Relay frames discarded under pressure so far.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned queue still holds consistent data; nothing panics while holding it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
