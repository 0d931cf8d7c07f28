//! Rendezvous addresses
//!
//! Addresses name a Unix domain socket on the local filesystem using the
//! `ipc://` scheme, e.g. `ipc:///tmp/ipcpub`. One side binds, the other connects.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Error;

const IPC_SCHEME: &str = "ipc://";

/// Default address of the broker's collection side (publishers connect here)
pub const DEFAULT_FRONTEND_ADDR: &str = "ipc:///tmp/ipcsub";

/// Default address of the broker's distribution side (subscribers connect here)
pub const DEFAULT_BACKEND_ADDR: &str = "ipc:///tmp/ipcpub";

/// Default address for brokerless pub/sub (publisher binds, subscribers connect)
pub const DEFAULT_DIRECT_ADDR: &str = "ipc:///tmp/pubsub";

/// A local IPC endpoint address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    path: PathBuf,
}

impl Address {
    /// Create an address from a filesystem path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Socket file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// [`DEFAULT_FRONTEND_ADDR`]
    pub fn default_frontend() -> Self {
        Self::builtin(DEFAULT_FRONTEND_ADDR)
    }

    /// [`DEFAULT_BACKEND_ADDR`]
    pub fn default_backend() -> Self {
        Self::builtin(DEFAULT_BACKEND_ADDR)
    }

    /// [`DEFAULT_DIRECT_ADDR`]
    pub fn default_direct() -> Self {
        Self::builtin(DEFAULT_DIRECT_ADDR)
    }

    fn builtin(addr: &'static str) -> Self {
        Self::from_path(addr.trim_start_matches(IPC_SCHEME))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s
            .strip_prefix(IPC_SCHEME)
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))?;

        if path.is_empty() {
            return Err(Error::InvalidAddress(s.to_string()));
        }

        Ok(Self::from_path(path))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", IPC_SCHEME, self.path.display())
    }
}

/// Whether a socket creates the endpoint or attaches to an existing one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Create the listening endpoint
    Bind(Address),
    /// Connect to an endpoint bound elsewhere
    Connect(Address),
}

impl Endpoint {
    /// Address of the endpoint regardless of direction
    pub fn address(&self) -> &Address {
        match self {
            Endpoint::Bind(addr) | Endpoint::Connect(addr) => addr,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Bind(addr) => write!(f, "bind {}", addr),
            Endpoint::Connect(addr) => write!(f, "connect {}", addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipc_address() {
        let addr: Address = "ipc:///tmp/pubsub".parse().unwrap();
        assert_eq!(addr.path(), Path::new("/tmp/pubsub"));
        assert_eq!(addr.to_string(), "ipc:///tmp/pubsub");
    }

    #[test]
    fn test_relative_path() {
        let addr: Address = "ipc://run/broker.sock".parse().unwrap();
        assert_eq!(addr.path(), Path::new("run/broker.sock"));
    }

    #[test]
    fn test_reject_other_schemes() {
        assert!(matches!(
            "tcp://localhost:5555".parse::<Address>(),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            "/tmp/pubsub".parse::<Address>(),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!("ipc://".parse::<Address>(), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_defaults_parse() {
        assert_eq!(
            DEFAULT_FRONTEND_ADDR.parse::<Address>().unwrap(),
            Address::default_frontend()
        );
        assert_eq!(
            DEFAULT_BACKEND_ADDR.parse::<Address>().unwrap(),
            Address::default_backend()
        );
        assert_eq!(
            DEFAULT_DIRECT_ADDR.parse::<Address>().unwrap(),
            Address::default_direct()
        );
    }

    #[test]
    fn test_endpoint_address() {
        let addr = Address::from_path("/tmp/x.sock");
        assert_eq!(Endpoint::Bind(addr.clone()).address(), &addr);
        assert_eq!(Endpoint::Connect(addr.clone()).to_string(), "connect ipc:///tmp/x.sock");
    }
}
