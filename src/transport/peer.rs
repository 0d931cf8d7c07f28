//! Peer connections
//!
//! Every Unix stream a socket owns (accepted or connected) becomes a peer with
//! two tasks: a writer draining the peer's outbound queue and a reader feeding
//! decoded messages back into the socket. Both stop when the socket closes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::error::Error;

use super::codec::MultipartCodec;
use super::config::SocketConfig;
use super::multipart::Multipart;
use super::socket::SocketKind;
use super::subscription::{Control, SubscriptionSet};

/// One connected peer as seen by its socket
struct Peer {
    tx: mpsc::Sender<Multipart>,
    /// Topics this peer asked for (publishing sockets only)
    subscriptions: SubscriptionSet,
}

/// State shared between a socket handle and its background tasks
pub(crate) struct Core {
    pub(crate) kind: SocketKind,
    pub(crate) config: SocketConfig,
    /// Connected sockets close when their single peer goes away
    connected: bool,
    peers: RwLock<HashMap<u64, Peer>>,
    next_peer_id: AtomicU64,
    /// Local subscriptions (SUB and XSUB), replayed to every new peer
    pub(crate) local_subs: Mutex<SubscriptionSet>,
    inbound: mpsc::Sender<Multipart>,
    pub(crate) closed: CancellationToken,
    disconnected: AtomicBool,
    /// Messages a full peer queue could not take
    dropped: AtomicU64,
}

impl Core {
    pub(crate) fn new(
        kind: SocketKind,
        config: SocketConfig,
        connected: bool,
    ) -> (Arc<Self>, mpsc::Receiver<Multipart>) {
        let (inbound, rx) = mpsc::channel(config.recv_hwm);

        let core = Arc::new(Self {
            kind,
            config,
            connected,
            peers: RwLock::new(HashMap::new()),
            next_peer_id: AtomicU64::new(1),
            local_subs: Mutex::new(SubscriptionSet::new()),
            inbound,
            closed: CancellationToken::new(),
            disconnected: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        });

        (core, rx)
    }

    fn codec(&self) -> MultipartCodec {
        MultipartCodec::new(self.config.max_frames, self.config.max_frame_size)
    }

    /// Error reported once the socket can no longer deliver
    pub(crate) fn close_error(&self) -> Error {
        if self.disconnected.load(Ordering::Acquire) {
            Error::Disconnected
        } else {
            Error::Closed
        }
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    pub(crate) async fn subscriber_count(&self) -> usize {
        self.peers
            .read()
            .await
            .values()
            .filter(|p| !p.subscriptions.is_empty())
            .count()
    }

    pub(crate) async fn matching_peers(&self, topic: &[u8]) -> usize {
        self.peers
            .read()
            .await
            .values()
            .filter(|p| p.subscriptions.matches(topic))
            .count()
    }

    /// Register a stream as a new peer and start its tasks
    pub(crate) async fn attach(self: &Arc<Self>, stream: UnixStream) -> u64 {
        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed);
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::channel(self.config.send_hwm);

        tokio::spawn(write_loop(
            id,
            rx,
            FramedWrite::new(write_half, self.codec()),
            self.closed.clone(),
        ));

        // Holding the subscription lock while registering keeps a concurrent
        // subscribe() from reaching this peer twice. Lock order: local_subs,
        // then peers. Neither is held across a wait on the peer itself.
        {
            let subs = self.local_subs.lock().await;
            for msg in subs.subscribe_messages() {
                if let Err(TrySendError::Full(_)) = tx.try_send(msg) {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(kind = %self.kind, peer = id, "Peer queue full, subscription replay cut short");
                    break;
                }
            }
            self.peers.write().await.insert(
                id,
                Peer {
                    tx,
                    subscriptions: SubscriptionSet::new(),
                },
            );
        }

        tokio::spawn(read_loop(
            Arc::clone(self),
            id,
            FramedRead::new(read_half, self.codec()),
        ));

        tracing::debug!(kind = %self.kind, peer = id, "Peer attached");
        id
    }

    async fn detach(&self, id: u64) {
        let removed = self.peers.write().await.remove(&id);

        if let Some(peer) = removed {
            tracing::debug!(kind = %self.kind, peer = id, "Peer detached");

            // Downstream needs to learn that this peer's interest is gone
            if self.kind == SocketKind::XPub && !self.closed.is_cancelled() {
                for msg in peer.subscriptions.unsubscribe_messages() {
                    self.deliver(msg).await;
                }
            }
        }

        if self.connected && !self.closed.is_cancelled() {
            tracing::info!(kind = %self.kind, "Connection to peer lost");
            self.disconnected.store(true, Ordering::Release);
            self.closed.cancel();
        }
    }

    /// Queue a message for `recv`, waiting for room unless the socket closes
    async fn deliver(&self, msg: Multipart) {
        tokio::select! {
            _ = self.closed.cancelled() => {}
            result = self.inbound.send(msg) => {
                if result.is_err() {
                    tracing::trace!(kind = %self.kind, "Inbound queue gone, message dropped");
                }
            }
        }
    }

    async fn on_peer_message(&self, id: u64, msg: Multipart) {
        match self.kind {
            SocketKind::Pub | SocketKind::XPub => {
                let Some(control) = Control::parse(&msg) else {
                    tracing::trace!(kind = %self.kind, peer = id, "Ignoring non-subscription message");
                    return;
                };

                if let Some(peer) = self.peers.write().await.get_mut(&id) {
                    peer.subscriptions.apply(&control);
                }

                tracing::debug!(
                    kind = %self.kind,
                    peer = id,
                    control = ?control,
                    "Subscription update"
                );

                if self.kind == SocketKind::XPub {
                    self.deliver(msg).await;
                }
            }
            SocketKind::Sub => {
                let wanted = self.local_subs.lock().await.matches(msg.topic_bytes());
                if wanted {
                    self.deliver(msg).await;
                }
            }
            SocketKind::XSub => self.deliver(msg).await,
        }
    }

    /// Offer a message to every peer subscribed to its topic; full peers miss it
    pub(crate) async fn publish(&self, msg: &Multipart) -> usize {
        self.offer(msg, |peer| peer.subscriptions.matches(msg.topic_bytes()))
            .await
    }

    /// Offer a message to every peer regardless of subscriptions; full peers miss it
    pub(crate) async fn broadcast(&self, msg: &Multipart) -> usize {
        self.offer(msg, |_| true).await
    }

    /// Never waits on a peer: one stalled reader must not hold up the rest
    async fn offer(&self, msg: &Multipart, wanted: impl Fn(&Peer) -> bool) -> usize {
        let peers = self.peers.read().await;
        let mut delivered = 0;

        for (id, peer) in peers.iter() {
            if !wanted(peer) {
                continue;
            }
            match peer.tx.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(kind = %self.kind, peer = id, "Peer queue full, message dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::trace!(kind = %self.kind, peer = id, "Peer gone, message dropped");
                }
            }
        }

        delivered
    }

    pub(crate) fn close(&self) {
        self.closed.cancel();
    }
}

pub(crate) async fn accept_loop(core: Arc<Core>, listener: UnixListener) {
    loop {
        let accepted = tokio::select! {
            _ = core.closed.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, _)) => {
                core.attach(stream).await;
            }
            Err(e) => {
                tracing::error!(kind = %core.kind, error = %e, "Failed to accept connection");
            }
        }
    }

    tracing::debug!(kind = %core.kind, "Accept loop stopped");
}

async fn write_loop(
    id: u64,
    mut rx: mpsc::Receiver<Multipart>,
    mut writer: FramedWrite<OwnedWriteHalf, MultipartCodec>,
    closed: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = closed.cancelled() => break,
            next = rx.recv() => next,
        };

        let Some(msg) = next else { break };

        if let Err(e) = writer.send(msg).await {
            tracing::debug!(peer = id, error = %e, "Peer write failed");
            break;
        }
    }
}

async fn read_loop(core: Arc<Core>, id: u64, mut reader: FramedRead<OwnedReadHalf, MultipartCodec>) {
    loop {
        let next = tokio::select! {
            _ = core.closed.cancelled() => break,
            next = reader.next() => next,
        };

        match next {
            Some(Ok(msg)) => core.on_peer_message(id, msg).await,
            Some(Err(e)) => {
                tracing::warn!(kind = %core.kind, peer = id, error = %e, "Dropping peer after read error");
                break;
            }
            None => break,
        }
    }

    core.detach(id).await;
}
