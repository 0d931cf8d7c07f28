//! Transport channel
//!
//! Addressable pub/sub endpoints over Unix domain sockets. Messages are
//! multi-part byte frames, relayed verbatim and filtered by topic prefix.
//!
//! # Topology
//!
//! ```text
//!   direct:   PUB (bind) ──────────────────────────────► SUB (connect) x N
//!
//!   brokered: PUB (connect) ──► XSUB (bind) ═ proxy ═ XPUB (bind) ──► SUB (connect) x N
//!                           ◄── subscriptions ◄═══════════════════ ◄──
//! ```
//!
//! Subscriptions always flow against the data, so a publisher only puts on the
//! wire what at least one subscriber asked for.

pub mod address;
pub mod codec;
pub mod config;
pub mod multipart;
mod peer;
pub mod socket;
pub mod subscription;

#[cfg(test)]
pub(crate) mod testing;

pub use address::{Address, Endpoint, DEFAULT_BACKEND_ADDR, DEFAULT_DIRECT_ADDR, DEFAULT_FRONTEND_ADDR};
pub use codec::MultipartCodec;
pub use config::SocketConfig;
pub use multipart::Multipart;
pub use socket::{Socket, SocketKind};
pub use subscription::{Control, SubscriptionSet};
