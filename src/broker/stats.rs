//! Relay statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::proxy::Direction;

/// Live counters shared between the proxy loop and observers
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    downstream_messages: AtomicU64,
    downstream_bytes: AtomicU64,
    upstream_messages: AtomicU64,
    upstream_bytes: AtomicU64,
    send_failures: AtomicU64,
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            downstream_messages: AtomicU64::new(0),
            downstream_bytes: AtomicU64::new(0),
            upstream_messages: AtomicU64::new(0),
            upstream_bytes: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
        }
    }

    /// Count one relayed message
    pub fn record(&self, direction: Direction, bytes: usize) {
        let (messages, total) = match direction {
            Direction::Downstream => (&self.downstream_messages, &self.downstream_bytes),
            Direction::Upstream => (&self.upstream_messages, &self.upstream_bytes),
        };
        messages.fetch_add(1, Ordering::Relaxed);
        total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Count one failed forward
    pub fn record_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> RelaySnapshot {
        RelaySnapshot {
            uptime: self.started_at.elapsed(),
            downstream_messages: self.downstream_messages.load(Ordering::Relaxed),
            downstream_bytes: self.downstream_bytes.load(Ordering::Relaxed),
            upstream_messages: self.upstream_messages.load(Ordering::Relaxed),
            upstream_bytes: self.upstream_bytes.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}

/// Relay counters at one moment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelaySnapshot {
    /// Time since the proxy started
    pub uptime: Duration,
    /// Messages relayed publishers -> subscribers
    pub downstream_messages: u64,
    /// Payload bytes relayed publishers -> subscribers
    pub downstream_bytes: u64,
    /// Subscription messages relayed subscribers -> publishers
    pub upstream_messages: u64,
    /// Bytes relayed subscribers -> publishers
    pub upstream_bytes: u64,
    /// Messages that could not be forwarded
    pub send_failures: u64,
}

impl RelaySnapshot {
    /// Total messages relayed in both directions
    pub fn total_messages(&self) -> u64 {
        self.downstream_messages + self.upstream_messages
    }

    /// Downstream message rate since start
    pub fn downstream_rate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.downstream_messages as f64 / secs
        } else {
            0.0
        }
    }
}
