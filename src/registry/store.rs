//! Subscriber registry implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::Result;
use crate::port::{SubscribeConfig, SubscribePort};

use super::entry::{Registration, SubscriberEntry};
use super::error::RegistryError;

/// One subscribe port per session
///
/// Thread-safe via `RwLock`. Every session that needs to see the full message
/// stream gets its own port, so no two consumers compete for one queue.
#[derive(Debug)]
pub struct SubscriberRegistry {
    /// Map of session id to entry
    entries: RwLock<HashMap<u64, SubscriberEntry>>,

    /// Configuration for ports opened by the registry
    config: SubscribeConfig,

    /// Source of ids for [`SubscriberRegistry::register_next`]
    next_session_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Create a registry that opens ports with `config`
    pub fn new(config: SubscribeConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Port configuration
    pub fn config(&self) -> &SubscribeConfig {
        &self.config
    }

    /// Open a port for `session_id`
    ///
    /// Fails with [`RegistryError::AlreadyRegistered`] if the session already
    /// holds one.
    ///
    /// The port is opened before the registry is locked, so a slow connect
    /// never holds up other sessions.
    pub async fn register(self: &Arc<Self>, session_id: u64) -> Result<Registration> {
        if self.contains(session_id).await {
            return Err(RegistryError::AlreadyRegistered(session_id).into());
        }

        let port = Arc::new(SubscribePort::open(&self.config).await?);

        let mut entries = self.entries.write().await;
        if entries.contains_key(&session_id) {
            // Lost a race for the same id
            port.close();
            return Err(RegistryError::AlreadyRegistered(session_id).into());
        }
        entries.insert(session_id, SubscriberEntry::new(Arc::clone(&port)));

        tracing::info!(
            session_id = session_id,
            sessions = entries.len(),
            "Subscriber registered"
        );

        Ok(Registration::new(Arc::clone(self), session_id, port))
    }

    /// Open a port under a freshly allocated session id
    pub async fn register_next(self: &Arc<Self>) -> Result<Registration> {
        loop {
            let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
            match self.register(session_id).await {
                // Skip ids that were registered explicitly
                Err(crate::error::Error::Registry(RegistryError::AlreadyRegistered(_))) => continue,
                result => return result,
            }
        }
    }

    /// Close and remove a session's port
    pub async fn unregister(&self, session_id: u64) -> Result<()> {
        let mut entries = self.entries.write().await;

        let entry = entries
            .remove(&session_id)
            .ok_or(RegistryError::NotRegistered(session_id))?;
        entry.port.close();

        tracing::info!(
            session_id = session_id,
            held_ms = entry.age().as_millis() as u64,
            sessions = entries.len(),
            "Subscriber unregistered"
        );

        Ok(())
    }

    /// Port of a registered session
    pub async fn get(&self, session_id: u64) -> Option<Arc<SubscribePort>> {
        self.entries
            .read()
            .await
            .get(&session_id)
            .map(|entry| Arc::clone(&entry.port))
    }

    /// Whether a session is registered
    pub async fn contains(&self, session_id: u64) -> bool {
        self.entries.read().await.contains_key(&session_id)
    }

    /// Number of registered sessions
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no session is registered
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Registered session ids, sorted
    pub async fn session_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.entries.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::Error;
    use crate::port::{PublishConfig, PublishPort};
    use crate::transport::testing::{wait_for_subscribers, TempAddrs};

    async fn setup(addrs: &TempAddrs) -> (PublishPort, Arc<SubscriberRegistry>) {
        let addr = addrs.addr("registry");
        let publisher = PublishPort::open(&PublishConfig::bind(addr.clone()))
            .await
            .unwrap();
        let config = SubscribeConfig::connect(addr).timeout(Duration::from_millis(200));
        (publisher, Arc::new(SubscriberRegistry::new(config)))
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let addrs = TempAddrs::new();
        let (_publisher, registry) = setup(&addrs).await;

        let registration = registry.register(7).await.unwrap();
        assert_eq!(registration.session_id(), 7);
        assert!(registry.contains(7).await);
        assert_eq!(registry.len().await, 1);

        registry.unregister(7).await.unwrap();
        assert!(registry.is_empty().await);
        assert!(registration.port().is_closed());

        // Releasing after an explicit unregister is harmless
        registration.release().await;
    }

    #[tokio::test]
    async fn test_duplicate_session_rejected() {
        let addrs = TempAddrs::new();
        let (_publisher, registry) = setup(&addrs).await;

        let _first = registry.register(1).await.unwrap();
        let second = registry.register(1).await;

        assert!(matches!(
            second,
            Err(Error::Registry(RegistryError::AlreadyRegistered(1)))
        ));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_unknown_session() {
        let addrs = TempAddrs::new();
        let (_publisher, registry) = setup(&addrs).await;

        assert!(matches!(
            registry.unregister(42).await,
            Err(Error::Registry(RegistryError::NotRegistered(42)))
        ));
    }

    #[tokio::test]
    async fn test_register_next_skips_taken_ids() {
        let addrs = TempAddrs::new();
        let (_publisher, registry) = setup(&addrs).await;

        let _explicit = registry.register(1).await.unwrap();
        let next = registry.register_next().await.unwrap();

        assert_eq!(next.session_id(), 2);
        assert_eq!(registry.session_ids().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_release_closes_port() {
        let addrs = TempAddrs::new();
        let (_publisher, registry) = setup(&addrs).await;

        let registration = registry.register_next().await.unwrap();
        let port = Arc::clone(registration.port());

        registration.release().await;

        assert!(port.is_closed());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_drop_removes_session() {
        let addrs = TempAddrs::new();
        let (_publisher, registry) = setup(&addrs).await;

        let registration = registry.register(3).await.unwrap();
        let port = Arc::clone(registration.port());
        drop(registration);

        assert!(port.is_closed());
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while registry.contains(3).await {
            assert!(tokio::time::Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_register_same_id() {
        let addrs = TempAddrs::new();
        let (_publisher, registry) = setup(&addrs).await;

        let (a, b) = tokio::join!(registry.register(9), registry.register(9));

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert!(matches!(
            a.as_ref().err().or(b.as_ref().err()),
            Some(Error::Registry(RegistryError::AlreadyRegistered(9)))
        ));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_each_session_sees_every_message() {
        let addrs = TempAddrs::new();
        let (publisher, registry) = setup(&addrs).await;

        let a = registry.register_next().await.unwrap();
        let b = registry.register_next().await.unwrap();
        wait_for_subscribers(publisher.socket(), 2).await;

        publisher.publish("SUCCESS").await.unwrap();

        for registration in [&a, &b] {
            let msg = registration.port().receive().await.unwrap().delivered().unwrap();
            assert_eq!(msg.payload_str(), Some("SUCCESS"));
        }
    }
}
