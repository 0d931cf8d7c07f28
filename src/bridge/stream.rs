//! Per-client event stream
//!
//! Drives one subscribe port and turns its receive/timeout timeline into SSE
//! events:
//!
//! ```text
//!   Connecting ──► Streaming ──┬─► Closed   (sentinel, cancellation)
//!     │              │  ▲      └─► Failed   (receive error)
//!     ▼              ▼  │
//!  connected     ping / translated event
//! ```

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::message::{Message, Recv};
use crate::port::SubscribePort;
use crate::registry::Registration;

use super::event::SseEvent;
use super::translate::{CurrentTimeTranslator, EventTranslator};

/// Payload that ends a stream
pub const STOP_SENTINEL: &[u8] = b"break";

/// Lifecycle of a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// `connected` not yet emitted
    Connecting,
    /// Relaying messages and heartbeats
    Streaming,
    /// Ended normally
    Closed,
    /// Ended by a receive error
    Failed,
}

impl BridgeState {
    /// Whether the bridge will produce no more events
    pub fn is_terminal(self) -> bool {
        matches!(self, BridgeState::Closed | BridgeState::Failed)
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeState::Connecting => "connecting",
            BridgeState::Streaming => "streaming",
            BridgeState::Closed => "closed",
            BridgeState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a bridge holds its subscribe port
#[derive(Debug)]
pub enum PortLease {
    /// The bridge's own port, released when the bridge ends
    Dedicated(Registration),
    /// A port other consumers may also read from
    ///
    /// Concurrent readers split the traffic between them; a bridge on a
    /// shared port sees only part of the stream. The bridge never closes it.
    Shared(Arc<SubscribePort>),
}

impl PortLease {
    /// The leased port
    pub fn port(&self) -> &SubscribePort {
        match self {
            PortLease::Dedicated(registration) => registration.port().as_ref(),
            PortLease::Shared(port) => port.as_ref(),
        }
    }

    fn session_id(&self) -> Option<u64> {
        match self {
            PortLease::Dedicated(registration) => Some(registration.session_id()),
            PortLease::Shared(_) => None,
        }
    }

    async fn release(self) {
        match self {
            PortLease::Dedicated(registration) => registration.release().await,
            PortLease::Shared(_) => {}
        }
    }
}

impl From<Registration> for PortLease {
    fn from(registration: Registration) -> Self {
        PortLease::Dedicated(registration)
    }
}

impl From<Arc<SubscribePort>> for PortLease {
    fn from(port: Arc<SubscribePort>) -> Self {
        PortLease::Shared(port)
    }
}

/// One client's SSE stream
pub struct StreamBridge {
    lease: Option<PortLease>,
    translator: Box<dyn EventTranslator>,
    cancel: CancellationToken,
    state: BridgeState,
    session_id: Option<u64>,
}

impl StreamBridge {
    /// Bridge over a port lease with the `current_time` translator
    pub fn new(lease: impl Into<PortLease>) -> Self {
        let lease = lease.into();
        let session_id = lease.session_id();

        Self {
            lease: Some(lease),
            translator: Box::new(CurrentTimeTranslator),
            cancel: CancellationToken::new(),
            state: BridgeState::Connecting,
            session_id,
        }
    }

    /// Replace the message translator
    pub fn with_translator(mut self, translator: impl EventTranslator + 'static) -> Self {
        self.translator = Box::new(translator);
        self
    }

    /// Also stop when `parent` is cancelled
    pub fn with_cancellation(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    /// Token that stops this bridge
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current state
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Produce the next event
    ///
    /// Returns `None` once the bridge has ended. A receive error is yielded
    /// once and then the bridge ends.
    pub async fn next_event(&mut self) -> Option<Result<SseEvent>> {
        loop {
            match self.state {
                BridgeState::Closed | BridgeState::Failed => return None,
                BridgeState::Connecting => {
                    self.state = BridgeState::Streaming;
                    tracing::info!(session_id = ?self.session_id, "Event stream opened");
                    return Some(Ok(SseEvent::connected()));
                }
                BridgeState::Streaming => {}
            }

            if self.cancel.is_cancelled() {
                self.finish(BridgeState::Closed, "cancelled").await;
                return None;
            }

            let Some(lease) = &self.lease else {
                self.state = BridgeState::Closed;
                return None;
            };

            // Receives are cancel-safe, so losing the race drops nothing
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = lease.port().receive() => Some(result),
            };

            match received {
                None => {
                    self.finish(BridgeState::Closed, "cancelled").await;
                    return None;
                }
                Some(Ok(Recv::TimedOut)) => {
                    tracing::trace!(session_id = ?self.session_id, "Heartbeat");
                    return Some(Ok(SseEvent::ping()));
                }
                Some(Ok(Recv::Delivered(msg))) if is_stop(&msg) => {
                    self.finish(BridgeState::Closed, "stop sentinel").await;
                    return Some(Ok(SseEvent::disconnected()));
                }
                Some(Ok(Recv::Delivered(msg))) => {
                    if let Some(event) = self.translator.translate(&msg) {
                        return Some(Ok(event));
                    }
                    tracing::trace!(session_id = ?self.session_id, "Message skipped by translator");
                }
                Some(Err(e)) => {
                    tracing::warn!(session_id = ?self.session_id, error = %e, "Event stream failed");
                    self.finish(BridgeState::Failed, "receive error").await;
                    return Some(Err(e));
                }
            }
        }
    }

    /// Encoded event chunks for an HTTP body
    ///
    /// Dropping the stream stops the bridge and releases a dedicated port.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
        stream::unfold(self, |mut bridge| async move {
            let next = bridge.next_event().await;
            next.map(|item| (item.map(|event| event.to_bytes()), bridge))
        })
    }

    async fn finish(&mut self, state: BridgeState, reason: &'static str) {
        self.state = state;
        if let Some(lease) = self.lease.take() {
            lease.release().await;
        }
        tracing::info!(session_id = ?self.session_id, state = %state, reason = reason, "Event stream ended");
    }
}

impl Drop for StreamBridge {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for StreamBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBridge")
            .field("state", &self.state)
            .field("session_id", &self.session_id)
            .field("lease", &self.lease)
            .finish()
    }
}

fn is_stop(msg: &Message) -> bool {
    msg.payload().as_ref() == STOP_SENTINEL
}
