//! Registry entries and registration guards

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;

use crate::port::SubscribePort;

use super::store::SubscriberRegistry;

/// Per-session state stored in the registry
#[derive(Debug)]
pub struct SubscriberEntry {
    /// The session's own subscribe port
    pub port: Arc<SubscribePort>,

    /// When the session registered
    pub registered_at: Instant,
}

impl SubscriberEntry {
    pub(super) fn new(port: Arc<SubscribePort>) -> Self {
        Self {
            port,
            registered_at: Instant::now(),
        }
    }

    /// How long the session has held its port
    pub fn age(&self) -> Duration {
        self.registered_at.elapsed()
    }
}

/// Ownership of one session's subscribe port
///
/// Dropping the registration closes the port and removes the session from the
/// registry. Use [`Registration::release`] to do it synchronously.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<SubscriberRegistry>,
    session_id: u64,
    port: Arc<SubscribePort>,
    released: bool,
}

impl Registration {
    pub(super) fn new(
        registry: Arc<SubscriberRegistry>,
        session_id: u64,
        port: Arc<SubscribePort>,
    ) -> Self {
        Self {
            registry,
            session_id,
            port,
            released: false,
        }
    }

    /// Session this registration belongs to
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// The session's port
    pub fn port(&self) -> &Arc<SubscribePort> {
        &self.port
    }

    /// Close the port and remove the session now
    pub async fn release(mut self) {
        self.released = true;
        // Already removed if someone unregistered the session explicitly
        let _ = self.registry.unregister(self.session_id).await;
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        self.port.close();

        let registry = Arc::clone(&self.registry);
        let session_id = self.session_id;

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = registry.unregister(session_id).await;
                });
            }
            Err(_) => {
                tracing::warn!(session_id = session_id, "Registration dropped outside runtime");
            }
        }
    }
}
