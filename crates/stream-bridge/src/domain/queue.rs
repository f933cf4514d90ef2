//! Hand-off queue
//!
//! The bounded FIFO between ingestion and publishing, and the only point
//! where the two sides synchronize.
//!
//! ## Semantics
//!
//! - `enqueue` waits while the queue is full; it never drops and never errors
//!   because of capacity. This is the system's only backpressure.
//! - `dequeue` waits while the queue is empty.
//! - Strict FIFO; size never exceeds capacity.
//! - Any number of producers ([`EventSink`] is `Clone`), exactly one consumer
//!   ([`EventDrain`]).
//! - `dequeue` is cancel-safe: racing it in `tokio::select!` never loses an event.

use crate::domain::PendingEvent;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// The consumer side is gone, or the queue was closed.
///
/// Hands the rejected event back to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Hand-off queue closed")]
pub struct QueueClosed(pub PendingEvent);

/// Create a bounded hand-off queue.
///
/// A capacity of zero is raised to one.
#[must_use]
pub fn handoff_queue(capacity: usize) -> (EventSink, EventDrain) {
    handoff_queue_with_metrics(capacity, Arc::new(NoOpMetrics))
}

/// Create a bounded hand-off queue reporting into `metrics`.
#[must_use]
pub fn handoff_queue_with_metrics(
    capacity: usize,
    metrics: Arc<dyn MetricsRecorder>,
) -> (EventSink, EventDrain) {
    let capacity = capacity.max(1);
    let (sender, receiver) = mpsc::channel(capacity);
    (
        EventSink {
            sender,
            metrics: metrics.clone(),
        },
        EventDrain {
            receiver,
            capacity,
            metrics,
        },
    )
}

/// Producer side of the hand-off queue.
///
/// Thread-safe; clone it for every ingestion thread or task.
#[derive(Clone)]
pub struct EventSink {
    sender: mpsc::Sender<PendingEvent>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl EventSink {
    /// Insert an event, waiting while the queue is at capacity.
    pub async fn enqueue(&self, event: impl Into<PendingEvent>) -> Result<(), QueueClosed> {
        self.sender
            .send(event.into())
            .await
            .map_err(|e| QueueClosed(e.0))?;
        self.record_enqueued();
        Ok(())
    }

    /// Insert an event from a synchronous thread, blocking while full.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context,
    /// as `tokio::sync::mpsc::Sender::blocking_send` does.
    pub fn blocking_enqueue(&self, event: impl Into<PendingEvent>) -> Result<(), QueueClosed> {
        self.sender
            .blocking_send(event.into())
            .map_err(|e| QueueClosed(e.0))?;
        self.record_enqueued();
        Ok(())
    }

    fn record_enqueued(&self) {
        self.metrics.record_enqueued();
        self.metrics.record_queue_depth(self.len());
    }

    /// Events currently queued plus permits already granted to senders.
    ///
    /// Producers still waiting for space hold no permit and are not counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed maximum number of queued events.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Whether the consumer side has gone away or closed the queue.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Consumer side of the hand-off queue. Owned by the publish loop.
pub struct EventDrain {
    receiver: mpsc::Receiver<PendingEvent>,
    capacity: usize,
    metrics: Arc<dyn MetricsRecorder>,
}

impl EventDrain {
    /// Remove the oldest event, waiting while the queue is empty.
    ///
    /// Returns `None` only once every [`EventSink`] has been dropped (or the
    /// queue was closed) and all queued events have been taken.
    pub async fn dequeue(&mut self) -> Option<PendingEvent> {
        let event = self.receiver.recv().await?;
        self.metrics.record_queue_depth(self.receiver.len());
        Some(event)
    }

    /// Remove the oldest event if one is immediately available.
    pub fn try_dequeue(&mut self) -> Option<PendingEvent> {
        let event = self.receiver.try_recv().ok()?;
        self.metrics.record_queue_depth(self.receiver.len());
        Some(event)
    }

    /// Stop accepting new events. Already queued events remain drainable.
    pub fn close(&mut self) {
        self.receiver.close();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether every producer is gone or the queue was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}
