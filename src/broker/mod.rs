//! Message broker
//!
//! A standalone relay that decouples publishers from subscribers: both sides
//! connect to fixed addresses and never need to know about each other.

pub mod config;
pub mod proxy;
pub mod stats;

pub use config::BrokerConfig;
pub use proxy::{BrokerProxy, Direction, ProxyState};
pub use stats::{RelaySnapshot, RelayStats};
