//! Outbound message and destination
//!
//! The publish loop stages every event into one reused [`OutboundMessage`].
//! Brokers receive it by shared reference for the duration of `send`, so
//! they must copy the payload before returning. The borrow checker then
//! guarantees staging of the next event cannot race an in-flight send.

use crate::domain::PendingEvent;
use std::fmt;
use topic_bus::Topic;

/// Resolved publish destination.
///
/// Created once at startup from the configured topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    topic: Topic,
}

impl Destination {
    #[must_use]
    pub fn new(topic: Topic) -> Self {
        Self { topic }
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.topic.as_str()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "topic:{}", self.topic)
    }
}

/// A reusable text message staged before each send.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    text: String,
    sequence: u64,
}

impl OutboundMessage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all state left by a previous send. Keeps the allocation.
    pub fn reset(&mut self) {
        self.text.clear();
        self.sequence = 0;
    }

    /// Replace the payload text.
    pub fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
    }

    /// Reset, then load `event` as the payload with the given sequence.
    pub fn stage(&mut self, event: &PendingEvent, sequence: u64) {
        self.reset();
        self.set_text(event.as_str());
        self.sequence = sequence;
    }

    /// The staged payload text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Staging sequence number within the current run (1-based, 0 when unstaged).
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_overwrites_previous_payload() {
        let mut msg = OutboundMessage::new();
        msg.stage(&PendingEvent::from("a much longer first payload"), 1);
        msg.stage(&PendingEvent::from("b"), 2);

        assert_eq!(msg.text(), "b");
        assert_eq!(msg.sequence(), 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut msg = OutboundMessage::new();
        msg.stage(&PendingEvent::from("payload"), 9);
        msg.reset();

        assert_eq!(msg, OutboundMessage::new());
    }

    #[test]
    fn test_destination_display() {
        let dest = Destination::new(Topic::new("tweets/raw").unwrap());
        assert_eq!(dest.name(), "tweets/raw");
        assert_eq!(dest.to_string(), "topic:tweets/raw");
    }
}
