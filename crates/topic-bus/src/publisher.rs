//! # Topic Publisher
//!
//! Defines the publishing side of the topic bus.

use crate::message::BusMessage;
use crate::subscriber::{MessageStream, Subscription};
use crate::topic::{Topic, TopicPattern};
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait for publishing messages to the bus.
///
/// Publishing never waits: a slow subscriber lags instead of blocking
/// the publisher.
pub trait TopicPublisher: Send + Sync {
    /// Publish a message.
    ///
    /// # Returns
    ///
    /// The number of subscriptions whose pattern matched the message topic.
    /// Zero means the message was dropped.
    fn publish(&self, message: BusMessage) -> usize;

    /// Get the total number of publish attempts.
    fn messages_published(&self) -> u64;
}

/// In-memory implementation of the topic bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
/// semantics; each subscription filters by its own pattern.
pub struct InMemoryTopicBus {
    /// Broadcast sender for messages.
    sender: broadcast::Sender<BusMessage>,

    /// Active subscription count by pattern.
    subscriptions: Arc<RwLock<HashMap<TopicPattern, usize>>>,

    /// Total publish attempts.
    messages_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryTopicBus {
    /// Create a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with specified per-subscriber capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to messages whose topic matches `pattern`.
    #[must_use]
    pub fn subscribe(&self, pattern: TopicPattern) -> Subscription {
        let receiver = self.sender.subscribe();

        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(pattern.clone()).or_insert(0) += 1;
        }

        debug!(pattern = %pattern, "New subscription created");

        Subscription::new(receiver, pattern, self.subscriptions.clone())
    }

    /// Get a stream of messages matching a pattern.
    #[must_use]
    pub fn message_stream(&self, pattern: TopicPattern) -> MessageStream {
        MessageStream::new(self.subscribe(pattern))
    }

    /// Number of live subscriptions whose pattern matches `topic`.
    #[must_use]
    pub fn matching_subscribers(&self, topic: &Topic) -> usize {
        let Ok(subs) = self.subscriptions.read() else {
            return 0;
        };
        subs.iter()
            .filter(|(pattern, _)| pattern.matches(topic))
            .map(|(_, count)| *count)
            .sum()
    }

    /// Get the number of active subscribers across all patterns.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryTopicBus {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicPublisher for InMemoryTopicBus {
    fn publish(&self, message: BusMessage) -> usize {
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let matched = self.matching_subscribers(&message.topic);
        if matched == 0 {
            warn!(
                topic = %message.topic,
                message_id = %message.id,
                "Message dropped (no matching subscribers)"
            );
            return 0;
        }

        let topic = message.topic.clone();
        let id = message.id.clone();
        match self.sender.send(message) {
            Ok(_) => {
                debug!(topic = %topic, message_id = %id, receivers = matched, "Message published");
                matched
            }
            Err(e) => {
                // Every receiver went away between the count and the send.
                warn!(topic = %topic, message_id = %id, error = %e, "Message dropped (no receivers)");
                0
            }
        }
    }

    fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}
