//! Server-Sent-Events server
//!
//! Minimal HTTP surface over the fan-out layer, built on axum.

pub mod config;
pub mod listener;

pub use config::{EventFormat, PortMode, ServerConfig};
pub use listener::{FanoutServer, DEFAULT_PUBLISH_PAYLOAD, PUBLISH_PATH, SSE_PATH};
