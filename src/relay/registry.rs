//! Tracks every open client channel and hands out
//! connection ids together with the outbox the writer task drains.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use super::outbox::{MIN_OUTBOX_CAPACITY, Outbox};
use crate::room::ConnectionId;

/// Open connections keyed by id.
#[derive(Debug)]
pub struct ConnectionRegistry {
    open: RwLock<HashMap<ConnectionId, Arc<Outbox>>>,
    /// Monotonically increasing counter for connection ids.
    next_id: AtomicU64,
    outbox_capacity: usize,
}

impl ConnectionRegistry {
    pub fn new(outbox_capacity: usize) -> Self {
        Self {
            open: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            outbox_capacity: outbox_capacity.max(MIN_OUTBOX_CAPACITY),
        }
    }

    /// Register a freshly upgraded connection, returning its id and outbox.
    pub async fn register(&self) -> (ConnectionId, Arc<Outbox>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let outbox = Arc::new(Outbox::new(self.outbox_capacity));
        self.open.write().await.insert(id, outbox.clone());
        debug!(conn = %id, "connection registered");
        (id, outbox)
    }

    /// Forget a connection and close its outbox. Idempotent.
    pub async fn unregister(&self, id: ConnectionId) {
        if let Some(outbox) = self.open.write().await.remove(&id) {
            outbox.close();
            debug!(conn = %id, "connection unregistered");
        }
    }

    /// Number of currently open connections.
    pub async fn len(&self) -> usize {
        self.open.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Relay frames dropped so far across the open connections.
    pub async fn dropped_frames(&self) -> u64 {
        self.open.read().await.values().map(|o| o.dropped()).sum()
    }

    #[cfg(test)]
    pub(crate) async fn contains(&self, id: ConnectionId) -> bool {
        self.open.read().await.contains_key(&id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(64)
    }
}
