use std::time::Duration;

use crate::relay::MIN_OUTBOX_CAPACITY;

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server listen port.
    pub port: u16,
    /// Server bind host.
    pub host: String,
    /// Room joined when the client omits `room`.
    pub default_room: String,
    /// Player name used when the client omits `name`.
    pub default_name: String,
    /// Maximum number of queued outbound frames per connection, at least
    /// [`MIN_OUTBOX_CAPACITY`].
    pub outbox_capacity: usize,
    /// Seconds without any inbound frame before a connection is dropped (0 disables).
    pub idle_timeout_secs: u64,
    /// Seconds between server-initiated pings (0 disables).
    pub ping_interval_secs: u64,
    /// Whether `state` frames are echoed back to their sender.
    pub echo_state: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();
        AppConfig {
            port: env_or("PORT", defaults.port),
            host: std::env::var("HOST").unwrap_or(defaults.host),
            default_room: std::env::var("RELAY_DEFAULT_ROOM")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.default_room),
            default_name: std::env::var("RELAY_DEFAULT_NAME")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.default_name),
            outbox_capacity: env_or("RELAY_OUTBOX_CAPACITY", defaults.outbox_capacity)
                .max(MIN_OUTBOX_CAPACITY),
            idle_timeout_secs: env_or("RELAY_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
            ping_interval_secs: env_or("RELAY_PING_INTERVAL_SECS", defaults.ping_interval_secs),
            echo_state: env_or("RELAY_ECHO_STATE", defaults.echo_state),
        }
    }

    /// Socket address string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_secs > 0).then(|| Duration::from_secs(self.ping_interval_secs))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            port: 7000,
            host: "0.0.0.0".to_string(),
            default_room: "lobby".to_string(),
            default_name: "Player".to_string(),
            outbox_capacity: 64,
            idle_timeout_secs: 60,
            ping_interval_secs: 20,
            echo_state: true,
        }
    }
}
