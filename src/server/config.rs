//! Server configuration

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::port::{PublishConfig, SubscribeConfig};
use crate::transport::Endpoint;

/// Environment variable overriding the HTTP bind address
pub const BIND_ADDR_ENV: &str = "FANOUT_BIND_ADDR";

/// Environment variable overriding the address published to
pub const PUBLISH_ADDR_ENV: &str = "FANOUT_PUBLISH_ADDR";

/// Environment variable overriding the address subscribed to
pub const SUBSCRIBE_ADDR_ENV: &str = "FANOUT_SUBSCRIBE_ADDR";

/// Environment variable selecting the [`EventFormat`]
pub const EVENT_FORMAT_ENV: &str = "FANOUT_EVENT_FORMAT";

/// How streaming clients get their subscribe port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortMode {
    /// One port per client; every client sees every message
    Dedicated,
    /// One port for all clients; clients split the messages between them
    Shared,
}

/// What event streams send for each message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFormat {
    /// `event: current_time` / `data: current_time`, payload ignored
    CurrentTime,
    /// Payload as data, topic (or `message`) as event name
    Passthrough,
}

impl fmt::Display for EventFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventFormat::CurrentTime => f.write_str("current_time"),
            EventFormat::Passthrough => f.write_str("passthrough"),
        }
    }
}

impl FromStr for EventFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "current_time" => Ok(EventFormat::CurrentTime),
            "passthrough" => Ok(EventFormat::Passthrough),
            other => Err(Error::InvalidConfig(format!("unknown event format: {}", other))),
        }
    }
}

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent event streams (0 = unlimited)
    pub max_connections: usize,

    /// Publish port used by `POST`
    pub publish: PublishConfig,

    /// Subscribe port options for event streams
    pub subscribe: SubscribeConfig,

    /// Port allocation for event streams
    pub port_mode: PortMode,

    /// Event produced for each received message
    pub event_format: EventFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            max_connections: 0, // Unlimited
            publish: PublishConfig::default(),
            subscribe: SubscribeConfig::default(),
            port_mode: PortMode::Dedicated,
            event_format: EventFormat::CurrentTime,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Defaults overridden by `FANOUT_BIND_ADDR`, `FANOUT_PUBLISH_ADDR`,
    /// `FANOUT_SUBSCRIBE_ADDR` and `FANOUT_EVENT_FORMAT`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var(BIND_ADDR_ENV) {
            config.bind_addr = addr
                .parse()
                .map_err(|_| Error::InvalidAddress(addr.clone()))?;
        }
        if let Ok(addr) = std::env::var(PUBLISH_ADDR_ENV) {
            config.publish.endpoint = Endpoint::Connect(addr.parse()?);
        }
        if let Ok(addr) = std::env::var(SUBSCRIBE_ADDR_ENV) {
            config.subscribe.endpoint = Endpoint::Connect(addr.parse()?);
        }
        if let Ok(format) = std::env::var(EVENT_FORMAT_ENV) {
            config.event_format = format.parse()?;
        }

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum concurrent event streams
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set publish port options
    pub fn publish(mut self, publish: PublishConfig) -> Self {
        self.publish = publish;
        self
    }

    /// Set subscribe port options
    pub fn subscribe(mut self, subscribe: SubscribeConfig) -> Self {
        self.subscribe = subscribe;
        self
    }

    /// Set port allocation mode
    pub fn port_mode(mut self, mode: PortMode) -> Self {
        self.port_mode = mode;
        self
    }

    /// Set the per-message event format
    pub fn event_format(mut self, format: EventFormat) -> Self {
        self.event_format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::Address;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.port_mode, PortMode::Dedicated);
        assert_eq!(config.event_format, EventFormat::CurrentTime);
        assert_eq!(
            config.publish.endpoint,
            Endpoint::Connect(Address::default_frontend())
        );
        assert_eq!(
            config.subscribe.endpoint,
            Endpoint::Connect(Address::default_backend())
        );
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(50)
            .subscribe(SubscribeConfig::default().timeout(Duration::from_millis(100)))
            .port_mode(PortMode::Shared)
            .event_format(EventFormat::Passthrough);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.subscribe.timeout, Some(Duration::from_millis(100)));
        assert_eq!(config.port_mode, PortMode::Shared);
        assert_eq!(config.event_format, EventFormat::Passthrough);
    }

    #[test]
    fn test_event_format_parse() {
        assert_eq!("passthrough".parse::<EventFormat>().unwrap(), EventFormat::Passthrough);
        assert_eq!(
            EventFormat::CurrentTime.to_string().parse::<EventFormat>().unwrap(),
            EventFormat::CurrentTime
        );
        assert!(matches!(
            "json".parse::<EventFormat>(),
            Err(Error::InvalidConfig(_))
        ));
    }
}
