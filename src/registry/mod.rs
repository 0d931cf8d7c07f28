//! Subscriber registry
//!
//! A subscribe port is one queue: consumers sharing it split the traffic
//! between them. The registry gives every session its own port instead.
//!
//! ```text
//!                      Arc<SubscriberRegistry>
//!                 ┌─────────────────────────────┐
//!                 │ entries: HashMap<session,   │
//!                 │   SubscriberEntry {         │
//!                 │     port: SubscribePort,    │
//!                 │   }                         │
//!                 │ >                           │
//!                 └──────────────┬──────────────┘
//!                                │
//!         ┌──────────────────────┼──────────────────────┐
//!         ▼                      ▼                      ▼
//!   [Registration 1]       [Registration 2]       [Registration 3]
//!    port.receive()         port.receive()         port.receive()
//!     every message          every message          every message
//! ```
//!
//! A [`Registration`] owns its session's port; dropping it closes the port and
//! removes the session.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{Registration, SubscriberEntry};
pub use error::RegistryError;
pub use store::SubscriberRegistry;
