//! Publish and subscribe ports
//!
//! The two operations the rest of an application uses: `publish(message)` and
//! `subscribe() -> message | timeout`.

pub mod config;
pub mod publish;
pub mod subscribe;

pub use config::{PublishConfig, SubscribeConfig, DEFAULT_RECEIVE_TIMEOUT};
pub use publish::PublishPort;
pub use subscribe::SubscribePort;
