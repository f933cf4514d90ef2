//! # Topic Subscriber
//!
//! Defines the subscription side of the topic bus.

use crate::message::BusMessage;
use crate::topic::TopicPattern;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was dropped.
    #[error("Topic bus closed")]
    Closed,
}

/// Keeps the bus's per-pattern subscription count accurate.
///
/// Decrements the count when dropped.
struct SubscriptionGuard {
    subscriptions: Arc<RwLock<HashMap<TopicPattern, usize>>>,
    pattern: TopicPattern,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let Ok(mut subs) = self.subscriptions.write() else {
            return;
        };
        let Some(count) = subs.get_mut(&self.pattern) else {
            debug!(pattern = %self.pattern, "Subscription dropped");
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.pattern);
        }
        debug!(pattern = %self.pattern, "Subscription dropped");
    }
}

/// A subscription handle for receiving messages.
///
/// When dropped, the subscription is automatically cleaned up.
pub struct Subscription {
    receiver: broadcast::Receiver<BusMessage>,
    guard: SubscriptionGuard,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<BusMessage>,
        pattern: TopicPattern,
        subscriptions: Arc<RwLock<HashMap<TopicPattern, usize>>>,
    ) -> Self {
        Self {
            receiver,
            guard: SubscriptionGuard {
                subscriptions,
                pattern,
            },
        }
    }

    /// Receive the next message whose topic matches the pattern.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next matching message
    /// - `None` - The bus was dropped
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            let message = match self.receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some messages dropped");
                    continue;
                }
            };

            if self.guard.pattern.matches(&message.topic) {
                return Some(message);
            }
        }
    }

    /// Try to receive the next matching message without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A matching message was available
    /// - `Ok(None)` - No message available
    /// - `Err(SubscriptionError::Closed)` - The bus was dropped
    pub fn try_recv(&mut self) -> Result<Option<BusMessage>, SubscriptionError> {
        loop {
            let message = match self.receiver.try_recv() {
                Ok(m) => m,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.guard.pattern.matches(&message.topic) {
                return Ok(Some(message));
            }
        }
    }

    /// Get the pattern for this subscription.
    #[must_use]
    pub fn pattern(&self) -> &TopicPattern {
        &self.guard.pattern
    }
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct MessageStream {
    inner: BroadcastStream<BusMessage>,
    guard: SubscriptionGuard,
}

impl MessageStream {
    /// Create a new message stream from a subscription.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        Self {
            inner: BroadcastStream::new(subscription.receiver),
            guard: subscription.guard,
        }
    }

    /// Get the pattern for this stream.
    #[must_use]
    pub fn pattern(&self) -> &TopicPattern {
        &self.guard.pattern
    }
}

impl Stream for MessageStream {
    type Item = BusMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(message))) => {
                    if self.guard.pattern.matches(&message.topic) {
                        return Poll::Ready(Some(message));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    debug!(lagged = count, "Stream lagged, some messages dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{InMemoryTopicBus, TopicPublisher};
    use crate::topic::Topic;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    fn topic(raw: &str) -> Topic {
        Topic::new(raw).unwrap()
    }

    fn pattern(raw: &str) -> TopicPattern {
        TopicPattern::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_subscription_recv() {
        let bus = InMemoryTopicBus::new();
        let mut sub = bus.subscribe(pattern("tweets/raw"));

        bus.publish(BusMessage::new(topic("tweets/raw"), "hello"));

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("message");

        assert_eq!(received.payload, "hello");
    }

    #[tokio::test]
    async fn test_subscription_filters_other_topics() {
        let bus = InMemoryTopicBus::new();
        let mut sub = bus.subscribe(pattern("tweets/en"));
        let _other = bus.subscribe(pattern("tweets/de"));

        bus.publish(BusMessage::new(topic("tweets/de"), "hallo"));
        bus.publish(BusMessage::new(topic("tweets/en"), "hello"));

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("message");

        assert_eq!(received.payload, "hello");
    }

    #[tokio::test]
    async fn test_subscription_drop_cleanup() {
        let bus = InMemoryTopicBus::new();

        {
            let _sub1 = bus.subscribe(pattern("tweets/raw"));
            let _sub2 = bus.subscribe(pattern("tweets/raw"));
            assert_eq!(bus.matching_subscribers(&topic("tweets/raw")), 2);
        }

        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.matching_subscribers(&topic("tweets/raw")), 0);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = InMemoryTopicBus::new();
        let mut sub = bus.subscribe(pattern("tweets/raw"));

        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_recv_after_bus_dropped() {
        let bus = InMemoryTopicBus::new();
        let mut sub = bus.subscribe(pattern("tweets/raw"));
        drop(bus);

        assert!(sub.recv().await.is_none());
        assert_eq!(sub.try_recv(), Err(SubscriptionError::Closed));
    }

    #[tokio::test]
    async fn test_message_stream_preserves_order() {
        let bus = InMemoryTopicBus::new();
        let mut stream = bus.message_stream(pattern("tweets/>"));

        for payload in ["a", "b", "c"] {
            bus.publish(BusMessage::new(topic("tweets/raw"), payload));
        }

        let mut received = Vec::new();
        for _ in 0..3 {
            let message = timeout(Duration::from_millis(100), stream.next())
                .await
                .expect("timeout")
                .expect("message");
            received.push(message.payload);
        }

        assert_eq!(received, vec!["a", "b", "c"]);
        assert_eq!(stream.pattern().as_str(), "tweets/>");
    }
}
