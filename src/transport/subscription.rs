//! Topic subscriptions
//!
//! Subscribers tell publishers which topic prefixes they want by sending
//! single-frame control messages upstream:
//!
//! ```text
//! 0x01 <prefix bytes>   subscribe
//! 0x00 <prefix bytes>   unsubscribe
//! ```
//!
//! Publishers keep one [`SubscriptionSet`] per peer and only forward messages
//! whose first frame starts with a subscribed prefix. Sets count duplicates,
//! so a prefix stays active until it has been unsubscribed as many times as it
//! was subscribed. This matters when a proxy forwards the subscriptions of
//! several downstream peers over one upstream connection.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

use super::multipart::Multipart;

const SUBSCRIBE: u8 = 0x01;
const UNSUBSCRIBE: u8 = 0x00;

/// A subscription control message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Start receiving topics with this prefix
    Subscribe(Bytes),
    /// Stop receiving topics with this prefix
    Unsubscribe(Bytes),
}

impl Control {
    /// Parse a control message; `None` if the message is not one
    pub fn parse(msg: &Multipart) -> Option<Control> {
        if msg.len() != 1 {
            return None;
        }

        let frame = msg.first()?;
        match frame.first() {
            Some(&SUBSCRIBE) => Some(Control::Subscribe(frame.slice(1..))),
            Some(&UNSUBSCRIBE) => Some(Control::Unsubscribe(frame.slice(1..))),
            _ => None,
        }
    }

    /// Encode as a single-frame message
    pub fn to_multipart(&self) -> Multipart {
        let (flag, prefix) = match self {
            Control::Subscribe(p) => (SUBSCRIBE, p),
            Control::Unsubscribe(p) => (UNSUBSCRIBE, p),
        };

        let mut frame = BytesMut::with_capacity(1 + prefix.len());
        frame.put_u8(flag);
        frame.put_slice(prefix);
        Multipart::from(frame.freeze())
    }

    /// The prefix this message refers to
    pub fn prefix(&self) -> &Bytes {
        match self {
            Control::Subscribe(p) | Control::Unsubscribe(p) => p,
        }
    }
}

/// Multiset of subscribed topic prefixes
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSet {
    prefixes: HashMap<Bytes, usize>,
}

impl SubscriptionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one reference to `prefix`; returns true if it was not present
    pub fn add(&mut self, prefix: Bytes) -> bool {
        let count = self.prefixes.entry(prefix).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Drop one reference to `prefix`; returns true if it is now gone
    pub fn remove(&mut self, prefix: &[u8]) -> bool {
        match self.prefixes.get_mut(prefix) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.prefixes.remove(prefix);
                true
            }
            None => false,
        }
    }

    /// Apply a control message
    pub fn apply(&mut self, control: &Control) -> bool {
        match control {
            Control::Subscribe(p) => self.add(p.clone()),
            Control::Unsubscribe(p) => self.remove(p),
        }
    }

    /// Whether any subscribed prefix is a prefix of `topic`
    pub fn matches(&self, topic: &[u8]) -> bool {
        self.prefixes.keys().any(|p| topic.starts_with(p))
    }

    /// Whether `prefix` is subscribed
    pub fn contains(&self, prefix: &[u8]) -> bool {
        self.prefixes.contains_key(prefix)
    }

    /// Number of distinct prefixes
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Whether nothing is subscribed
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// One subscribe message per reference held, for replay to a new peer
    pub fn subscribe_messages(&self) -> Vec<Multipart> {
        self.expand(Control::Subscribe)
    }

    /// One unsubscribe message per reference held, for a departed peer
    pub fn unsubscribe_messages(&self) -> Vec<Multipart> {
        self.expand(Control::Unsubscribe)
    }

    fn expand(&self, make: fn(Bytes) -> Control) -> Vec<Multipart> {
        self.prefixes
            .iter()
            .flat_map(|(prefix, &count)| {
                std::iter::repeat_with(move || make(prefix.clone()).to_multipart()).take(count)
            })
            .collect()
    }
}
