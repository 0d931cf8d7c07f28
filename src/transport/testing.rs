//! Helpers for socket tests

use std::time::Duration;

use tempfile::TempDir;

use super::address::Address;
use super::socket::Socket;

const WAIT_LIMIT: Duration = Duration::from_secs(5);
const WAIT_STEP: Duration = Duration::from_millis(5);

/// Socket addresses inside a private temporary directory
pub(crate) struct TempAddrs {
    dir: TempDir,
}

impl TempAddrs {
    pub(crate) fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub(crate) fn addr(&self, name: &str) -> Address {
        Address::from_path(self.dir.path().join(format!("{}.sock", name)))
    }
}

// Subscriptions travel asynchronously; publishers drop data sent before they arrive
pub(crate) async fn wait_for_subscribers(socket: &Socket, count: usize) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while socket.subscriber_count().await < count {
        assert!(tokio::time::Instant::now() < deadline, "subscribers never arrived");
        tokio::time::sleep(WAIT_STEP).await;
    }
}

pub(crate) async fn wait_for_matching(socket: &Socket, topic: &[u8], count: usize) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while socket.matching_peers(topic).await < count {
        assert!(tokio::time::Instant::now() < deadline, "subscription never arrived");
        tokio::time::sleep(WAIT_STEP).await;
    }
}

pub(crate) async fn wait_for_peers(socket: &Socket, count: usize) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while socket.peer_count().await < count {
        assert!(tokio::time::Instant::now() < deadline, "peers never connected");
        tokio::time::sleep(WAIT_STEP).await;
    }
}
