//! Error types
//!
//! A single crate-level [`Error`] with nested enums for the wire codec and the
//! subscriber registry. Receive timeouts are not errors; see [`crate::Recv`].

use std::io;

use crate::registry::RegistryError;
use crate::transport::SocketKind;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by sockets, ports, the broker and the bridge
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Address string could not be parsed
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Configuration value could not be parsed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Another live process already owns the address
    #[error("address already in use: {0}")]
    AddressInUse(String),

    /// Binding the listening socket failed
    #[error("bind to {address} failed: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Connecting to the address failed
    #[error("connect to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Socket was closed locally
    #[error("socket closed")]
    Closed,

    /// The only peer of a connected socket went away
    #[error("peer disconnected")]
    Disconnected,

    /// Operation is not valid for this socket kind
    #[error("{operation} is not supported by {kind} sockets")]
    Unsupported {
        kind: SocketKind,
        operation: &'static str,
    },

    /// Attempt to send a message without frames
    #[error("message has no frames")]
    EmptyMessage,

    /// Multipart shape does not map to a port-level message
    #[error("invalid message: expected 1 or 2 frames, got {frames}")]
    InvalidMessage { frames: usize },

    /// Wire framing violation
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Subscriber registry error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Other I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Wire framing errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Frame count of zero
    #[error("multipart message with zero frames")]
    NoFrames,

    /// Too many frames in one message
    #[error("too many frames: {count} (max {max})")]
    TooManyFrames { count: usize, max: usize },

    /// A single frame exceeds the size limit
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Underlying stream error while decoding
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether the error means the socket will never deliver again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Error::Closed | Error::Disconnected)
    }
}
