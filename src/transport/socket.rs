//! Sockets
//!
//! A [`Socket`] is one endpoint of a transport channel. Its [`SocketKind`]
//! decides which direction data and subscriptions flow:
//!
//! ```text
//!   PUB / XPUB  ──── data ────►  SUB / XSUB
//!               ◄── 0x01/0x00 ──
//!                   subscriptions
//! ```
//!
//! `PUB` and `XPUB` filter outgoing data per peer. `XPUB` additionally hands
//! the subscription messages it receives to the application, and `XSUB` lets
//! the application send them upstream, which is what the broker relays.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, Mutex};

use crate::error::{Error, Result};
use crate::message::Recv;

use super::address::{Address, Endpoint};
use super::config::SocketConfig;
use super::multipart::Multipart;
use super::peer::{accept_loop, Core};
use super::subscription::Control;

/// Role of a socket in a pub/sub topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    /// Publishes data, filtered by peer subscriptions
    Pub,
    /// Receives data matching its own subscriptions
    Sub,
    /// Like `Pub`, but also receives subscription messages
    XPub,
    /// Like `Sub`, but sends raw subscription messages
    XSub,
}

impl SocketKind {
    /// Whether `send` is valid for this kind
    pub fn can_send(self) -> bool {
        !matches!(self, SocketKind::Sub)
    }

    /// Whether `recv` is valid for this kind
    pub fn can_recv(self) -> bool {
        !matches!(self, SocketKind::Pub)
    }
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocketKind::Pub => "PUB",
            SocketKind::Sub => "SUB",
            SocketKind::XPub => "XPUB",
            SocketKind::XSub => "XSUB",
        };
        f.write_str(name)
    }
}

/// One endpoint of a transport channel
pub struct Socket {
    core: Arc<Core>,
    inbound: Mutex<mpsc::Receiver<Multipart>>,
    endpoint: Endpoint,
}

impl Socket {
    /// Open a socket on an endpoint
    pub async fn open(kind: SocketKind, endpoint: &Endpoint, config: SocketConfig) -> Result<Self> {
        match endpoint {
            Endpoint::Bind(addr) => Self::bind(kind, addr, config).await,
            Endpoint::Connect(addr) => Self::connect(kind, addr, config).await,
        }
    }

    /// Create the listening endpoint at `address`
    ///
    /// Fails with [`Error::AddressInUse`] if another live socket is bound there.
    /// A leftover socket file that nobody listens on is replaced.
    pub async fn bind(kind: SocketKind, address: &Address, config: SocketConfig) -> Result<Self> {
        let listener = bind_listener(address).await?;
        let (core, rx) = Core::new(kind, config, false);

        tokio::spawn(accept_loop(Arc::clone(&core), listener));

        tracing::info!(kind = %kind, addr = %address, "Socket bound");

        Ok(Self {
            core,
            inbound: Mutex::new(rx),
            endpoint: Endpoint::Bind(address.clone()),
        })
    }

    /// Connect to an endpoint bound elsewhere
    ///
    /// Connects once; there is no retry and no reconnect.
    pub async fn connect(kind: SocketKind, address: &Address, config: SocketConfig) -> Result<Self> {
        let stream = UnixStream::connect(address.path())
            .await
            .map_err(|source| Error::Connect {
                address: address.to_string(),
                source,
            })?;

        let (core, rx) = Core::new(kind, config, true);
        core.attach(stream).await;

        tracing::info!(kind = %kind, addr = %address, "Socket connected");

        Ok(Self {
            core,
            inbound: Mutex::new(rx),
            endpoint: Endpoint::Connect(address.clone()),
        })
    }

    /// Socket kind
    pub fn kind(&self) -> SocketKind {
        self.core.kind
    }

    /// Endpoint this socket was opened on
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send one message atomically
    ///
    /// Never waits for a peer. A peer whose outbound queue is full misses the
    /// message (see [`Socket::dropped_messages`]); there is no acknowledgment.
    pub async fn send(&self, msg: impl Into<Multipart>) -> Result<()> {
        let msg = msg.into();
        self.ensure_open()?;
        if msg.is_empty() {
            return Err(Error::EmptyMessage);
        }

        match self.kind() {
            SocketKind::Sub => return Err(self.unsupported("send")),
            SocketKind::Pub | SocketKind::XPub => {
                let delivered = self.core.publish(&msg).await;
                tracing::trace!(kind = %self.kind(), peers = delivered, frames = msg.len(), "Sent");
            }
            SocketKind::XSub => {
                let mut subs = self.core.local_subs.lock().await;
                if let Some(control) = Control::parse(&msg) {
                    subs.apply(&control);
                }
                let delivered = self.core.broadcast(&msg).await;
                tracing::trace!(kind = %self.kind(), peers = delivered, frames = msg.len(), "Sent upstream");
            }
        }

        Ok(())
    }

    /// Wait for the next message
    ///
    /// Cancel-safe. Concurrent callers on the same socket each take a
    /// different message; whoever is waiting first gets the next one.
    pub async fn recv(&self) -> Result<Multipart> {
        if !self.kind().can_recv() {
            return Err(self.unsupported("recv"));
        }

        let mut rx = self.inbound.lock().await;

        tokio::select! {
            biased;
            msg = rx.recv() => msg.ok_or(Error::Closed),
            _ = self.core.closed.cancelled() => Err(self.core.close_error()),
        }
    }

    /// Wait for the next message for at most `timeout` (`None` waits forever)
    pub async fn recv_timeout(&self, timeout: Option<Duration>) -> Result<Recv<Multipart>> {
        match timeout {
            None => self.recv().await.map(Recv::Delivered),
            Some(limit) => match tokio::time::timeout(limit, self.recv()).await {
                Ok(result) => result.map(Recv::Delivered),
                Err(_) => Ok(Recv::TimedOut),
            },
        }
    }

    /// Start receiving topics that begin with `prefix` (SUB only)
    pub async fn subscribe(&self, prefix: impl Into<Bytes>) -> Result<()> {
        self.update_subscription(Control::Subscribe(prefix.into()), "subscribe")
            .await
    }

    /// Drop one subscription to `prefix` (SUB only)
    pub async fn unsubscribe(&self, prefix: impl Into<Bytes>) -> Result<()> {
        self.update_subscription(Control::Unsubscribe(prefix.into()), "unsubscribe")
            .await
    }

    async fn update_subscription(&self, control: Control, operation: &'static str) -> Result<()> {
        self.ensure_open()?;
        if self.kind() != SocketKind::Sub {
            return Err(self.unsupported(operation));
        }

        let mut subs = self.core.local_subs.lock().await;
        subs.apply(&control);
        self.core.broadcast(&control.to_multipart()).await;

        tracing::debug!(kind = %self.kind(), control = ?control, "Subscription sent");
        Ok(())
    }

    /// Messages dropped so far because a peer's queue was full
    pub fn dropped_messages(&self) -> u64 {
        self.core.dropped()
    }

    /// Number of connected peers
    pub async fn peer_count(&self) -> usize {
        self.core.peer_count().await
    }

    /// Number of peers with at least one subscription (PUB and XPUB)
    pub async fn subscriber_count(&self) -> usize {
        self.core.subscriber_count().await
    }

    /// Number of peers that would receive a message on `topic` (PUB and XPUB)
    pub async fn matching_peers(&self, topic: &[u8]) -> usize {
        self.core.matching_peers(topic).await
    }

    /// Close the socket; idempotent
    ///
    /// Pending and future `recv` calls return [`Error::Closed`].
    pub fn close(&self) {
        if !self.core.closed.is_cancelled() {
            tracing::debug!(kind = %self.kind(), endpoint = %self.endpoint, "Socket closed");
        }
        self.core.close();
    }

    /// Whether the socket is closed or lost its peer
    pub fn is_closed(&self) -> bool {
        self.core.closed.is_cancelled()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(self.core.close_error())
        } else {
            Ok(())
        }
    }

    fn unsupported(&self, operation: &'static str) -> Error {
        Error::Unsupported {
            kind: self.kind(),
            operation,
        }
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("kind", &self.core.kind)
            .field("endpoint", &self.endpoint)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.core.close();

        if let Endpoint::Bind(addr) = &self.endpoint {
            let _ = std::fs::remove_file(addr.path());
        }
    }
}

async fn bind_listener(address: &Address) -> Result<UnixListener> {
    let path = address.path();
    let bind_error = |source: io::Error| Error::Bind {
        address: address.to_string(),
        source,
    };

    match UnixListener::bind(path) {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            if UnixStream::connect(path).await.is_ok() {
                return Err(Error::AddressInUse(address.to_string()));
            }

            tracing::warn!(addr = %address, "Replacing stale socket file");
            std::fs::remove_file(path).map_err(bind_error)?;
            UnixListener::bind(path).map_err(bind_error)
        }
        Err(e) => Err(bind_error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{wait_for_matching, wait_for_peers, wait_for_subscribers, TempAddrs};

    #[tokio::test]
    async fn test_pub_sub_direct() {
        let addrs = TempAddrs::new();
        let addr = addrs.addr("direct");

        let publisher = Socket::bind(SocketKind::Pub, &addr, SocketConfig::default())
            .await
            .unwrap();
        let subscriber = Socket::connect(SocketKind::Sub, &addr, SocketConfig::default())
            .await
            .unwrap();
        subscriber.subscribe("").await.unwrap();
        wait_for_subscribers(&publisher, 1).await;

        publisher.send("hello").await.unwrap();

        let msg = subscriber.recv().await.unwrap();
        assert_eq!(msg, Multipart::from("hello"));
    }

    #[tokio::test]
    async fn test_multipart_boundaries_preserved() {
        let addrs = TempAddrs::new();
        let addr = addrs.addr("frames");

        let publisher = Socket::bind(SocketKind::Pub, &addr, SocketConfig::default())
            .await
            .unwrap();
        let subscriber = Socket::connect(SocketKind::Sub, &addr, SocketConfig::default())
            .await
            .unwrap();
        subscriber.subscribe("").await.unwrap();
        wait_for_subscribers(&publisher, 1).await;

        let sent = Multipart::new()
            .with_frame("topic")
            .with_frame(Bytes::new())
            .with_frame(Bytes::from(vec![0u8, 255, 1]));
        publisher.send(sent.clone()).await.unwrap();

        assert_eq!(subscriber.recv().await.unwrap(), sent);
    }

    #[tokio::test]
    async fn test_unsubscribed_sub_receives_nothing() {
        let addrs = TempAddrs::new();
        let addr = addrs.addr("nosub");

        let publisher = Socket::bind(SocketKind::Pub, &addr, SocketConfig::default())
            .await
            .unwrap();
        let subscriber = Socket::connect(SocketKind::Sub, &addr, SocketConfig::default())
            .await
            .unwrap();
        wait_for_peers(&publisher, 1).await;

        publisher.send("dropped").await.unwrap();

        let result = subscriber
            .recv_timeout(Some(Duration::from_millis(100)))
            .await
            .unwrap();
        assert!(result.is_timed_out());
    }

    #[tokio::test]
    async fn test_late_peer_gets_replayed_subscriptions() {
        let addrs = TempAddrs::new();
        let addr = addrs.addr("replay");

        // SUB binds, PUB connects after the subscription was made
        let subscriber = Socket::bind(SocketKind::Sub, &addr, SocketConfig::default())
            .await
            .unwrap();
        subscriber.subscribe("news").await.unwrap();

        let publisher = Socket::connect(SocketKind::Pub, &addr, SocketConfig::default())
            .await
            .unwrap();
        wait_for_matching(&publisher, b"news", 1).await;

        publisher.send("news: it works").await.unwrap();
        assert_eq!(subscriber.recv().await.unwrap(), Multipart::from("news: it works"));
    }

    #[tokio::test]
    async fn test_xpub_reports_subscriptions_and_departures() {
        let addrs = TempAddrs::new();
        let addr = addrs.addr("xpub");

        let xpub = Socket::bind(SocketKind::XPub, &addr, SocketConfig::default())
            .await
            .unwrap();
        let subscriber = Socket::connect(SocketKind::Sub, &addr, SocketConfig::default())
            .await
            .unwrap();
        subscriber.subscribe("a").await.unwrap();

        let msg = xpub.recv().await.unwrap();
        assert_eq!(
            Control::parse(&msg),
            Some(Control::Subscribe(Bytes::from("a")))
        );

        drop(subscriber);

        let msg = xpub.recv().await.unwrap();
        assert_eq!(
            Control::parse(&msg),
            Some(Control::Unsubscribe(Bytes::from("a")))
        );
    }

    #[tokio::test]
    async fn test_xsub_send_skips_stalled_peer() {
        let addrs = TempAddrs::new();
        let addr = addrs.addr("stalled");

        let xsub = Socket::bind(SocketKind::XSub, &addr, SocketConfig::default().send_hwm(4))
            .await
            .unwrap();
        let publisher = Socket::connect(SocketKind::Pub, &addr, SocketConfig::default())
            .await
            .unwrap();
        let _stalled = UnixStream::connect(addr.path()).await.unwrap();
        wait_for_peers(&xsub, 2).await;

        let prefix = Bytes::from(vec![b'x'; 4096]);
        let flood = async {
            for _ in 0..500 {
                xsub.send(Control::Subscribe(prefix.clone()).to_multipart())
                    .await
                    .unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(5), flood)
            .await
            .expect("send waited on a stalled peer");

        assert!(xsub.dropped_messages() > 0);
        wait_for_matching(&publisher, &prefix, 1).await;
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let addrs = TempAddrs::new();
        let addr = addrs.addr("unsupported");

        let publisher = Socket::bind(SocketKind::Pub, &addr, SocketConfig::default())
            .await
            .unwrap();
        let subscriber = Socket::connect(SocketKind::Sub, &addr, SocketConfig::default())
            .await
            .unwrap();

        assert!(matches!(
            publisher.recv().await,
            Err(Error::Unsupported { kind: SocketKind::Pub, .. })
        ));
        assert!(matches!(
            subscriber.send("x").await,
            Err(Error::Unsupported { kind: SocketKind::Sub, .. })
        ));
        assert!(matches!(
            publisher.subscribe("x").await,
            Err(Error::Unsupported { .. })
        ));
        assert!(matches!(
            publisher.send(Multipart::new()).await,
            Err(Error::EmptyMessage)
        ));
    }

    #[tokio::test]
    async fn test_close_wakes_pending_recv() {
        let addrs = TempAddrs::new();
        let addr = addrs.addr("close");

        let socket = Arc::new(
            Socket::bind(SocketKind::XSub, &addr, SocketConfig::default())
                .await
                .unwrap(),
        );

        let waiter = {
            let socket = Arc::clone(&socket);
            tokio::spawn(async move { socket.recv().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        socket.close();
        socket.close();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(Error::Closed)));
        assert!(matches!(socket.send("x").await, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_connected_socket_reports_lost_peer() {
        let addrs = TempAddrs::new();
        let addr = addrs.addr("lost");

        let publisher = Socket::bind(SocketKind::Pub, &addr, SocketConfig::default())
            .await
            .unwrap();
        let subscriber = Socket::connect(SocketKind::Sub, &addr, SocketConfig::default())
            .await
            .unwrap();
        subscriber.subscribe("").await.unwrap();
        wait_for_subscribers(&publisher, 1).await;

        publisher.send("last words").await.unwrap();
        assert_eq!(subscriber.recv().await.unwrap(), Multipart::from("last words"));

        drop(publisher);

        assert!(matches!(subscriber.recv().await, Err(Error::Disconnected)));
        assert!(subscriber.is_closed());
    }

    #[tokio::test]
    async fn test_bind_conflicts() {
        let addrs = TempAddrs::new();
        let addr = addrs.addr("owned");

        let first = Socket::bind(SocketKind::XPub, &addr, SocketConfig::default())
            .await
            .unwrap();

        let second = Socket::bind(SocketKind::XPub, &addr, SocketConfig::default()).await;
        assert!(matches!(second, Err(Error::AddressInUse(_))));
        drop(first);

        // Socket file removed on drop, address is free again
        assert!(!addr.path().exists());
        assert!(Socket::bind(SocketKind::XPub, &addr, SocketConfig::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_stale_socket_file_is_replaced() {
        let addrs = TempAddrs::new();
        let addr = addrs.addr("stale");

        // A listener that goes away without unlinking its file
        let listener = std::os::unix::net::UnixListener::bind(addr.path()).unwrap();
        drop(listener);
        assert!(addr.path().exists());

        assert!(Socket::bind(SocketKind::Pub, &addr, SocketConfig::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_connect_without_listener_fails() {
        let addrs = TempAddrs::new();
        let result = Socket::connect(SocketKind::Sub, &addrs.addr("nobody"), SocketConfig::default()).await;

        assert!(matches!(result, Err(Error::Connect { .. })));
    }
}
