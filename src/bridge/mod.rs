//! Stream bridge
//!
//! Adapts a subscribe port to a long-lived Server-Sent-Events response:
//! a `connected` event up front, one event per message, a `ping` whenever a
//! receive times out, and `disconnected` when the stop sentinel arrives.

pub mod event;
pub mod stream;
pub mod translate;

pub use event::SseEvent;
pub use stream::{BridgeState, PortLease, StreamBridge, STOP_SENTINEL};
pub use translate::{CurrentTimeTranslator, EventTranslator, PassthroughTranslator};
