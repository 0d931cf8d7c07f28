//! Subscribe port
//!
//! Timed receiver. Each [`SubscribePort::receive`] waits up to the configured
//! budget and reports [`Recv::TimedOut`] when it runs out, so callers can send
//! a heartbeat instead of treating silence as a failure.
//!
//! # Sharing
//!
//! A port is one queue. If several consumers call `receive` on the same port
//! at once, every message goes to exactly one of them: with N consumers each
//! sees roughly 1/N of the traffic. Consumers that must all see every message
//! need a port each (see [`crate::registry::SubscriberRegistry`]).

use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::message::{Message, Recv};
use crate::transport::{Socket, SocketKind};

use super::config::SubscribeConfig;

/// Receiving half of the fan-out layer
#[derive(Debug)]
pub struct SubscribePort {
    socket: Socket,
    timeout: Option<Duration>,
}

impl SubscribePort {
    /// Open the port's socket and register the configured topics
    pub async fn open(config: &SubscribeConfig) -> Result<Self> {
        let socket = Socket::open(SocketKind::Sub, &config.endpoint, config.socket.clone()).await?;

        for topic in &config.topics {
            socket.subscribe(Bytes::copy_from_slice(topic.as_bytes())).await?;
        }

        tracing::debug!(
            endpoint = %config.endpoint,
            topics = ?config.topics,
            timeout_ms = config.timeout.map(|t| t.as_millis() as u64),
            "Subscribe port opened"
        );

        Ok(Self {
            socket,
            timeout: config.timeout,
        })
    }

    /// Wait for the next message, up to the receive budget
    ///
    /// Transport messages that are not `[topic, payload]` are logged and
    /// skipped; the budget covers the whole wait.
    pub async fn receive(&self) -> Result<Recv<Message>> {
        let deadline = self.timeout.map(|t| Instant::now() + t);

        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let msg = match self.socket.recv_timeout(remaining).await? {
                Recv::Delivered(msg) => msg,
                Recv::TimedOut => return Ok(Recv::TimedOut),
            };

            match Message::from_multipart(msg) {
                Ok(message) => return Ok(Recv::Delivered(message)),
                Err(e @ (Error::InvalidMessage { .. } | Error::EmptyMessage)) => {
                    tracing::warn!(error = %e, "Skipping malformed message");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Add a topic prefix
    pub async fn subscribe(&self, prefix: impl Into<Bytes>) -> Result<()> {
        self.socket.subscribe(prefix).await
    }

    /// Drop a topic prefix
    pub async fn unsubscribe(&self, prefix: impl Into<Bytes>) -> Result<()> {
        self.socket.unsubscribe(prefix).await
    }

    /// Receive budget
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Underlying socket
    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    /// Release the endpoint; pending receives fail with `Closed`
    pub fn close(&self) {
        self.socket.close();
    }

    /// Whether the port can no longer receive
    pub fn is_closed(&self) -> bool {
        self.socket.is_closed()
    }
}
