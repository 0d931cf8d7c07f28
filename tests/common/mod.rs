//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use fanout_rs::broker::{BrokerConfig, BrokerProxy};
use fanout_rs::transport::{Address, Socket, SocketConfig};
use tempfile::TempDir;

const WAIT_LIMIT: Duration = Duration::from_secs(5);
const WAIT_STEP: Duration = Duration::from_millis(5);

/// Socket addresses in a private temporary directory
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn addr(&self, name: &str) -> Address {
        Address::from_path(self.dir.path().join(format!("{}.sock", name)))
    }
}

/// A running broker and its two addresses
pub struct Broker {
    pub proxy: Arc<BrokerProxy>,
    pub frontend: Address,
    pub backend: Address,
}

pub async fn start_broker(sandbox: &Sandbox) -> Broker {
    start_broker_with(sandbox, SocketConfig::default()).await
}

pub async fn start_broker_with(sandbox: &Sandbox, socket: SocketConfig) -> Broker {
    let frontend = sandbox.addr("frontend");
    let backend = sandbox.addr("backend");
    let config = BrokerConfig::default()
        .frontend(frontend.clone())
        .backend(backend.clone())
        .socket(socket);

    let proxy = Arc::new(BrokerProxy::bind(&config).await.expect("bind broker"));
    {
        let proxy = Arc::clone(&proxy);
        tokio::spawn(async move { proxy.run().await });
    }

    Broker {
        proxy,
        frontend,
        backend,
    }
}

/// Wait until a socket has `count` peers
pub async fn wait_for_peers(socket: &Socket, count: usize) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while socket.peer_count().await < count {
        assert!(tokio::time::Instant::now() < deadline, "peers never attached");
        tokio::time::sleep(WAIT_STEP).await;
    }
}

/// Wait until `count` peers of a publishing socket have subscribed
pub async fn wait_for_subscribers(socket: &Socket, count: usize) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while socket.subscriber_count().await < count {
        assert!(tokio::time::Instant::now() < deadline, "subscribers never arrived");
        tokio::time::sleep(WAIT_STEP).await;
    }
}

/// Wait until at least `count` peers would receive `topic`
pub async fn wait_for_matching(socket: &Socket, topic: &[u8], count: usize) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while socket.matching_peers(topic).await < count {
        assert!(tokio::time::Instant::now() < deadline, "subscription never arrived");
        tokio::time::sleep(WAIT_STEP).await;
    }
}

/// Wait until no peer of a publishing socket would receive `topic`
pub async fn wait_for_no_match(socket: &Socket, topic: &[u8]) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while socket.matching_peers(topic).await > 0 {
        assert!(tokio::time::Instant::now() < deadline, "subscription never went away");
        tokio::time::sleep(WAIT_STEP).await;
    }
}
