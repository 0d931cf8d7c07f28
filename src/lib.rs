//! Pub/sub fan-out over Unix domain sockets, with a Server-Sent-Events bridge
//!
//! ```text
//!   PublishPort ──► BrokerProxy ──► SubscribePort ──► StreamBridge ──► HTTP client
//!                   (XSUB/XPUB)      (timed recv)      (SSE + ping)
//! ```
//!
//! - [`transport`]: framed multi-part messages, topic-prefix filtering,
//!   `PUB`/`SUB`/`XPUB`/`XSUB` sockets
//! - [`port`]: `publish(message)` and `receive() -> message | timeout`
//! - [`broker`]: the standalone relay between publishers and subscribers
//! - [`bridge`]: turns a subscribe port into an SSE event stream
//! - [`registry`]: one subscribe port per client session
//! - [`server`]: the HTTP endpoints
//!
//! # Example
//! ```no_run
//! use fanout_rs::port::{PublishConfig, PublishPort, SubscribeConfig, SubscribePort};
//! use fanout_rs::Recv;
//!
//! # async fn example() -> fanout_rs::Result<()> {
//! let subscriber = SubscribePort::open(&SubscribeConfig::default()).await?;
//! let publisher = PublishPort::open(&PublishConfig::default()).await?;
//!
//! publisher.publish("SUCCESS").await?;
//!
//! match subscriber.receive().await? {
//!     Recv::Delivered(msg) => println!("got {:?}", msg.payload_str()),
//!     Recv::TimedOut => println!("nothing yet"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod broker;
pub mod error;
pub mod message;
pub mod port;
pub mod registry;
pub mod server;
pub mod transport;

pub use bridge::{SseEvent, StreamBridge};
pub use broker::{BrokerConfig, BrokerProxy};
pub use error::{Error, Result};
pub use message::{Message, Recv};
pub use port::{PublishConfig, PublishPort, SubscribeConfig, SubscribePort};
pub use registry::SubscriberRegistry;
pub use server::{FanoutServer, ServerConfig};
