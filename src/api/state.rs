use std::sync::Arc;

use crate::config::AppConfig;
use crate::relay::ConnectionRegistry;
use crate::room::RoomRegistry;

/// Shared application state passed to all handlers via Axum's State extractor.
pub struct AppState {
    pub rooms: RoomRegistry,
    pub connections: ConnectionRegistry,
    pub config: AppConfig,
    pub start_time: std::time::Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(AppState {
            rooms: RoomRegistry::new(),
            connections: ConnectionRegistry::new(config.outbox_capacity),
            config,
            start_time: std::time::Instant::now(),
        })
    }
}
