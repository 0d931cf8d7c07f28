//! Port-level messages
//!
//! A [`Message`] is a payload with an optional topic tag. On the wire every
//! message is `[topic, payload]`, with an empty topic frame when untagged, so
//! subscribers filter on the topic frame and never on the payload.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::transport::Multipart;

/// Outcome of a timed receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recv<T> {
    /// A message arrived within the budget
    Delivered(T),
    /// The budget elapsed without a message
    TimedOut,
}

impl<T> Recv<T> {
    /// Whether the receive timed out
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Recv::TimedOut)
    }

    /// The delivered value, if any
    pub fn delivered(self) -> Option<T> {
        match self {
            Recv::Delivered(value) => Some(value),
            Recv::TimedOut => None,
        }
    }

    /// Transform the delivered value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Recv<U> {
        match self {
            Recv::Delivered(value) => Recv::Delivered(f(value)),
            Recv::TimedOut => Recv::TimedOut,
        }
    }
}

/// A published message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    topic: Option<Bytes>,
    payload: Bytes,
}

impl Message {
    /// Untagged message
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            topic: None,
            payload: payload.into(),
        }
    }

    /// Message tagged with a topic; an empty topic means untagged
    pub fn with_topic(topic: impl Into<Bytes>, payload: impl Into<Bytes>) -> Self {
        let topic = topic.into();
        Self {
            topic: (!topic.is_empty()).then_some(topic),
            payload: payload.into(),
        }
    }

    /// Topic tag
    pub fn topic(&self) -> Option<&Bytes> {
        self.topic.as_ref()
    }

    /// Topic tag as UTF-8, if tagged and valid
    pub fn topic_str(&self) -> Option<&str> {
        self.topic
            .as_ref()
            .and_then(|t| std::str::from_utf8(t).ok())
    }

    /// Payload bytes
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload as UTF-8, if valid
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Wire representation
    pub fn into_multipart(self) -> Multipart {
        let topic = self.topic.unwrap_or_default();
        Multipart::from_frames(vec![topic, self.payload])
    }

    /// Parse the wire representation
    ///
    /// A lone frame from a raw sender is read as an untagged payload.
    pub fn from_multipart(msg: Multipart) -> Result<Self> {
        let frames = msg.len();
        let mut parts = msg.into_iter();

        match (parts.next(), parts.next(), parts.next()) {
            (Some(payload), None, None) => Ok(Self::new(payload)),
            (Some(topic), Some(payload), None) => Ok(Self::with_topic(topic, payload)),
            (None, _, _) => Err(Error::EmptyMessage),
            _ => Err(Error::InvalidMessage { frames }),
        }
    }
}

impl From<&'static str> for Message {
    fn from(payload: &'static str) -> Self {
        Self::new(Bytes::from_static(payload.as_bytes()))
    }
}

impl From<String> for Message {
    fn from(payload: String) -> Self {
        Self::new(payload)
    }
}
