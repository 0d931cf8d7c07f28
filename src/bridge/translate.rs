//! Message to event translation

use crate::message::Message;

use super::event::SseEvent;

/// Event name and data used by [`CurrentTimeTranslator`]
pub const CURRENT_TIME_EVENT: &str = "current_time";

/// Event name used by [`PassthroughTranslator`] for untagged messages
pub const MESSAGE_EVENT: &str = "message";

/// Turns a received message into an SSE event
///
/// Returning `None` skips the message; the bridge keeps waiting.
pub trait EventTranslator: Send + Sync {
    fn translate(&self, message: &Message) -> Option<SseEvent>;
}

impl<F> EventTranslator for F
where
    F: Fn(&Message) -> Option<SseEvent> + Send + Sync,
{
    fn translate(&self, message: &Message) -> Option<SseEvent> {
        self(message)
    }
}

/// Maps every message to `event: current_time` / `data: current_time`
///
/// The payload is not forwarded; the event only tells the page to refresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentTimeTranslator;

impl EventTranslator for CurrentTimeTranslator {
    fn translate(&self, _message: &Message) -> Option<SseEvent> {
        Some(SseEvent::new(CURRENT_TIME_EVENT, CURRENT_TIME_EVENT))
    }
}

/// Forwards the payload as data, named after the topic (or `message`)
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranslator;

impl EventTranslator for PassthroughTranslator {
    fn translate(&self, message: &Message) -> Option<SseEvent> {
        let name = message
            .topic()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .unwrap_or_else(|| MESSAGE_EVENT.to_string());
        let data = String::from_utf8_lossy(message.payload()).into_owned();

        Some(SseEvent::new(name, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_time_ignores_payload() {
        let event = CurrentTimeTranslator
            .translate(&Message::from("SUCCESS"))
            .unwrap();

        assert_eq!(event.name(), "current_time");
        assert_eq!(event.data(), "current_time");
    }

    #[test]
    fn test_passthrough() {
        let untagged = PassthroughTranslator.translate(&Message::from("hi")).unwrap();
        assert_eq!(untagged.name(), "message");
        assert_eq!(untagged.data(), "hi");

        let tagged = PassthroughTranslator
            .translate(&Message::with_topic("weather", "rain"))
            .unwrap();
        assert_eq!(tagged.name(), "weather");
        assert_eq!(tagged.data(), "rain");
    }

    #[test]
    fn test_closure_translator() {
        let only_tagged = |m: &Message| m.topic().map(|_| SseEvent::new("tagged", ""));

        assert!(only_tagged.translate(&Message::from("x")).is_none());
        assert!(only_tagged
            .translate(&Message::with_topic("t", "x"))
            .is_some());
    }
}
