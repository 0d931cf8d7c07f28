//! Port configuration

use std::time::Duration;

use crate::transport::{Address, Endpoint, SocketConfig};

/// Default receive budget of a subscribe port
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Publish port options
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Where the publishing socket lives
    pub endpoint: Endpoint,

    /// Socket tuning
    pub socket: SocketConfig,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Connect(Address::default_frontend()),
            socket: SocketConfig::default(),
        }
    }
}

impl PublishConfig {
    /// Publish through a broker listening at `addr`
    pub fn connect(addr: Address) -> Self {
        Self {
            endpoint: Endpoint::Connect(addr),
            ..Default::default()
        }
    }

    /// Publish directly, letting subscribers connect to `addr`
    pub fn bind(addr: Address) -> Self {
        Self {
            endpoint: Endpoint::Bind(addr),
            ..Default::default()
        }
    }

    /// Set socket options
    pub fn socket(mut self, socket: SocketConfig) -> Self {
        self.socket = socket;
        self
    }
}

/// Subscribe port options
#[derive(Debug, Clone)]
pub struct SubscribeConfig {
    /// Where the subscribing socket lives
    pub endpoint: Endpoint,

    /// Topic prefixes subscribed at open
    pub topics: Vec<String>,

    /// Receive budget (`None` waits indefinitely)
    pub timeout: Option<Duration>,

    /// Socket tuning
    pub socket: SocketConfig,
}

impl Default for SubscribeConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Connect(Address::default_backend()),
            topics: vec![String::new()],
            timeout: Some(DEFAULT_RECEIVE_TIMEOUT),
            socket: SocketConfig::default(),
        }
    }
}

impl SubscribeConfig {
    /// Subscribe to a broker or direct publisher at `addr`
    pub fn connect(addr: Address) -> Self {
        Self {
            endpoint: Endpoint::Connect(addr),
            ..Default::default()
        }
    }

    /// Replace the topic prefixes
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Set the receive budget
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait indefinitely on receive
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set socket options
    pub fn socket(mut self, socket: SocketConfig) -> Self {
        self.socket = socket;
        self
    }
}
