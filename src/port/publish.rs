//! Publish port
//!
//! Fire-and-forget sender. A publish returns as soon as the transport has
//! queued the message; nothing is acknowledged, and messages nobody has
//! subscribed to are not sent at all.

use bytes::Bytes;

use crate::error::Result;
use crate::message::Message;
use crate::transport::{Socket, SocketKind};

use super::config::PublishConfig;

/// Sending half of the fan-out layer
///
/// # Example
/// ```no_run
/// use fanout_rs::port::{PublishConfig, PublishPort};
///
/// # async fn example() -> fanout_rs::error::Result<()> {
/// let publisher = PublishPort::open(&PublishConfig::default()).await?;
/// publisher.publish("SUCCESS").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PublishPort {
    socket: Socket,
}

impl PublishPort {
    /// Open the port's socket (bind or connect per config)
    pub async fn open(config: &PublishConfig) -> Result<Self> {
        let socket = Socket::open(SocketKind::Pub, &config.endpoint, config.socket.clone()).await?;
        Ok(Self { socket })
    }

    /// Publish an untagged payload
    pub async fn publish(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.send(Message::new(payload)).await
    }

    /// Publish a payload tagged with `topic`
    pub async fn publish_with_topic(
        &self,
        topic: impl Into<Bytes>,
        payload: impl Into<Bytes>,
    ) -> Result<()> {
        self.send(Message::with_topic(topic, payload)).await
    }

    /// Publish a prepared message
    pub async fn send(&self, message: Message) -> Result<()> {
        self.socket.send(message.into_multipart()).await
    }

    /// Underlying socket
    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    /// Release the endpoint
    pub fn close(&self) {
        self.socket.close();
    }
}
