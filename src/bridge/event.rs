//! Server-Sent-Events framing

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

/// Event sent first on every stream
pub const CONNECTED_EVENT: &str = "connected";

/// Heartbeat sent when a receive times out
pub const PING_EVENT: &str = "ping";

/// Event sent after the stop sentinel
pub const DISCONNECTED_EVENT: &str = "disconnected";

/// One SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    name: String,
    data: String,
}

impl SseEvent {
    /// Event with a name and data
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// `connected` with empty data
    pub fn connected() -> Self {
        Self::new(CONNECTED_EVENT, "")
    }

    /// `ping` heartbeat
    pub fn ping() -> Self {
        Self::new(PING_EVENT, "ping")
    }

    /// `disconnected` with empty data
    pub fn disconnected() -> Self {
        Self::new(DISCONNECTED_EVENT, "")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Append the wire form to `buf`
    ///
    /// Multi-line data becomes one `data:` line per line. Empty data still
    /// produces a single `data: ` line so every event carries a data field.
    pub fn encode(&self, buf: &mut BytesMut) {
        put_field(buf, "event", &self.name);
        for line in self.data.split('\n') {
            put_field(buf, "data", line.strip_suffix('\r').unwrap_or(line));
        }
        buf.put_u8(b'\n');
    }

    /// Wire form as a single chunk
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.name.len() + self.data.len() + 24);
        self.encode(&mut buf);
        buf.freeze()
    }
}

impl fmt::Display for SseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

fn put_field(buf: &mut BytesMut, field: &str, value: &str) {
    buf.put_slice(field.as_bytes());
    buf.put_slice(b": ");
    // Line breaks inside a single-line field would end the event early
    for part in value.split(['\r', '\n']) {
        buf.put_slice(part.as_bytes());
    }
    buf.put_u8(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_time_wire_format() {
        let event = SseEvent::new("current_time", "current_time");
        assert_eq!(
            event.to_bytes().as_ref(),
            b"event: current_time\ndata: current_time\n\n"
        );
    }

    #[test]
    fn test_empty_data_keeps_data_line() {
        assert_eq!(SseEvent::connected().to_string(), "event: connected\ndata: \n\n");
        assert_eq!(
            SseEvent::disconnected().to_string(),
            "event: disconnected\ndata: \n\n"
        );
    }

    #[test]
    fn test_ping() {
        assert_eq!(SseEvent::ping().to_string(), "event: ping\ndata: ping\n\n");
    }

    #[test]
    fn test_multiline_data() {
        let event = SseEvent::new("message", "line one\r\nline two\nline three");
        assert_eq!(
            event.to_string(),
            "event: message\ndata: line one\ndata: line two\ndata: line three\n\n"
        );
    }

    #[test]
    fn test_name_line_breaks_stripped() {
        let event = SseEvent::new("bad\nname", "x");
        assert_eq!(event.to_string(), "event: badname\ndata: x\n\n");
    }
}
