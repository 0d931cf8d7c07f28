//! Broker proxy
//!
//! Binds the collection side (XSUB) and the distribution side (XPUB) and
//! moves whole messages between them:
//!
//! ```text
//!   publishers ──► XSUB ══ downstream ══► XPUB ──► subscribers
//!              ◄──      ◄══ upstream ═══      ◄── (subscriptions)
//! ```
//!
//! The proxy never inspects frames; it forwards exactly what it receives.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::transport::{Multipart, Socket, SocketKind};

use super::config::BrokerConfig;
use super::stats::RelayStats;

/// Which way a message travels through the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Collection side to distribution side (data)
    Downstream,
    /// Distribution side to collection side (subscriptions)
    Upstream,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Downstream => f.write_str("downstream"),
            Direction::Upstream => f.write_str("upstream"),
        }
    }
}

/// Proxy loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    /// Waiting on both sides
    Idle,
    /// Forwarding one message
    Relaying(Direction),
    /// Loop has exited
    Stopped,
}

/// XSUB/XPUB relay
pub struct BrokerProxy {
    frontend: Socket,
    backend: Socket,
    stats: Arc<RelayStats>,
    state: watch::Sender<ProxyState>,
}

impl BrokerProxy {
    /// Bind both sides
    ///
    /// Fails if either address is taken; nothing stays bound on failure.
    pub async fn bind(config: &BrokerConfig) -> Result<Self> {
        let frontend = Socket::bind(SocketKind::XSub, &config.frontend, config.socket.clone()).await?;
        let backend = Socket::bind(SocketKind::XPub, &config.backend, config.socket.clone()).await?;

        tracing::info!(
            frontend = %config.frontend,
            backend = %config.backend,
            "Broker bound"
        );

        Ok(Self {
            frontend,
            backend,
            stats: Arc::new(RelayStats::new()),
            state: watch::channel(ProxyState::Idle).0,
        })
    }

    /// Collection side socket
    pub fn frontend(&self) -> &Socket {
        &self.frontend
    }

    /// Distribution side socket
    pub fn backend(&self) -> &Socket {
        &self.backend
    }

    /// Relay counters
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Current loop state
    pub fn state(&self) -> ProxyState {
        *self.state.borrow()
    }

    /// Relay until both sides are closed
    ///
    /// A side whose socket closes drops out of the wait set and the other keeps
    /// relaying. Returns [`Error::Closed`] once neither side is left.
    pub async fn run(&self) -> Result<()> {
        let mut frontend_open = true;
        let mut backend_open = true;

        tracing::info!("Proxy running");

        loop {
            if !frontend_open && !backend_open {
                self.state.send_replace(ProxyState::Stopped);
                tracing::info!("Both sides closed, proxy stopping");
                return Err(Error::Closed);
            }

            self.state.send_replace(ProxyState::Idle);

            let (direction, received) = tokio::select! {
                result = self.frontend.recv(), if frontend_open => (Direction::Downstream, result),
                result = self.backend.recv(), if backend_open => (Direction::Upstream, result),
            };

            match received {
                Ok(msg) => self.relay(direction, msg).await,
                Err(e) if e.is_terminal() => {
                    tracing::warn!(direction = %direction, error = %e, "Proxy side closed");
                    match direction {
                        Direction::Downstream => frontend_open = false,
                        Direction::Upstream => backend_open = false,
                    }
                }
                Err(e) => {
                    tracing::warn!(direction = %direction, error = %e, "Proxy receive failed");
                }
            }
        }
    }

    /// Relay until `shutdown` completes or both sides close
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let result = tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                tracing::info!("Proxy shutting down");
                Ok(())
            }
        };

        self.state.send_replace(ProxyState::Stopped);
        result
    }

    async fn relay(&self, direction: Direction, msg: Multipart) {
        self.state.send_replace(ProxyState::Relaying(direction));

        let frames = msg.len();
        let bytes = msg.byte_len();
        let target = match direction {
            Direction::Downstream => &self.backend,
            Direction::Upstream => &self.frontend,
        };

        match target.send(msg).await {
            Ok(()) => {
                self.stats.record(direction, bytes);
                tracing::debug!(direction = %direction, frames = frames, bytes = bytes, "Relayed");
            }
            Err(e) => {
                self.stats.record_failure();
                tracing::warn!(direction = %direction, error = %e, "Relay failed, message dropped");
            }
        }
    }
}

impl fmt::Debug for BrokerProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerProxy")
            .field("frontend", &self.frontend)
            .field("backend", &self.backend)
            .field("state", &self.state())
            .finish()
    }
}
