//! # Bus Messages
//!
//! The unit of delivery on the topic bus.

use crate::topic::Topic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Broker-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A text message published to a topic.
///
/// Owns its payload; publishers copy into it so the caller's buffer
/// can be reused as soon as `publish` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Unique message identifier.
    pub id: MessageId,
    /// Topic the message was published to.
    pub topic: Topic,
    /// Text payload.
    pub payload: String,
    /// Publisher-side sequence number, if the publisher assigns one.
    pub sequence: Option<u64>,
    /// Publish timestamp.
    pub published_at: DateTime<Utc>,
}

impl BusMessage {
    /// Create a message with a fresh id and the current timestamp.
    #[must_use]
    pub fn new(topic: Topic, payload: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            topic,
            payload: payload.into(),
            sequence: None,
            published_at: Utc::now(),
        }
    }

    /// Attach a publisher sequence number.
    #[must_use]
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_unique() {
        let a = MessageId::generate();
        let b = MessageId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_message() {
        let topic = Topic::new("tweets/raw").unwrap();
        let msg = BusMessage::new(topic.clone(), "hello").with_sequence(7);
        assert_eq!(msg.topic, topic);
        assert_eq!(msg.payload, "hello");
        assert_eq!(msg.sequence, Some(7));
    }
}
