//! Registry error types

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A port is already registered for the session
    #[error("session already registered: {0}")]
    AlreadyRegistered(u64),

    /// No port is registered for the session
    #[error("session not registered: {0}")]
    NotRegistered(u64),
}
