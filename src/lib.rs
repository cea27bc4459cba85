pub mod api;
pub mod config;
pub mod relay;
pub mod room;
pub mod ws;
