//! Broker configuration

use std::time::Duration;

use crate::error::Result;
use crate::transport::{Address, SocketConfig};

/// Environment variable overriding the collection address
pub const FRONTEND_ADDR_ENV: &str = "FANOUT_FRONTEND_ADDR";

/// Environment variable overriding the distribution address
pub const BACKEND_ADDR_ENV: &str = "FANOUT_BACKEND_ADDR";

/// Broker proxy configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Collection side; publishers connect here
    pub frontend: Address,

    /// Distribution side; subscribers connect here
    pub backend: Address,

    /// Socket options for both sides
    pub socket: SocketConfig,

    /// How often the broker binary logs relay statistics (`None` disables)
    pub stats_interval: Option<Duration>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            frontend: Address::default_frontend(),
            backend: Address::default_backend(),
            socket: SocketConfig::default(),
            stats_interval: Some(Duration::from_secs(60)),
        }
    }
}

impl BrokerConfig {
    /// Defaults overridden by `FANOUT_FRONTEND_ADDR` / `FANOUT_BACKEND_ADDR`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var(FRONTEND_ADDR_ENV) {
            config.frontend = addr.parse()?;
        }
        if let Ok(addr) = std::env::var(BACKEND_ADDR_ENV) {
            config.backend = addr.parse()?;
        }

        Ok(config)
    }

    /// Set the collection address
    pub fn frontend(mut self, addr: Address) -> Self {
        self.frontend = addr;
        self
    }

    /// Set the distribution address
    pub fn backend(mut self, addr: Address) -> Self {
        self.backend = addr;
        self
    }

    /// Set socket options
    pub fn socket(mut self, socket: SocketConfig) -> Self {
        self.socket = socket;
        self
    }

    /// Set the statistics log interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = Some(interval);
        self
    }

    /// Disable periodic statistics logging
    pub fn disable_stats(mut self) -> Self {
        self.stats_interval = None;
        self
    }
}
