//! Metrics hooks for the bridge
//!
//! The bridge reports through the [`MetricsRecorder`] trait so the runtime
//! can plug in an exporter. [`BridgeMetrics`] is an in-process collector of
//! atomic counters; [`NoOpMetrics`] discards everything.
//!
//! ## Usage
//!
//! ```ignore
//! use stream_bridge::metrics::{BridgeMetrics, MetricsRecorder};
//!
//! let metrics = BridgeMetrics::new();
//! metrics.record_enqueued();
//! metrics.record_published();
//! assert_eq!(metrics.snapshot().messages_published, 1);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for custom metrics recording implementations
///
/// Implement this trait to integrate with external metrics systems.
/// Every method is called on a hot path and must not block.
pub trait MetricsRecorder: Send + Sync {
    /// An event entered the hand-off queue.
    fn record_enqueued(&self);

    /// A message was handed to the broker.
    fn record_published(&self);

    /// The broker acknowledged a message.
    fn record_acknowledged(&self);

    /// A message could not be delivered.
    fn record_failed(&self);

    /// Current number of queued events.
    fn record_queue_depth(&self, depth: usize);
}

/// No-op metrics recorder
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_enqueued(&self) {}
    fn record_published(&self) {}
    fn record_acknowledged(&self) {}
    fn record_failed(&self) {}
    fn record_queue_depth(&self, _: usize) {}
}

/// Thread-safe counters for bridge throughput.
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    events_enqueued: AtomicU64,
    messages_published: AtomicU64,
    messages_acknowledged: AtomicU64,
    messages_failed: AtomicU64,
    queue_depth: AtomicU64,
}

impl BridgeMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current metrics snapshot
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_enqueued: self.events_enqueued.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_acknowledged: self.messages_acknowledged.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.events_enqueued.store(0, Ordering::Relaxed);
        self.messages_published.store(0, Ordering::Relaxed);
        self.messages_acknowledged.store(0, Ordering::Relaxed);
        self.messages_failed.store(0, Ordering::Relaxed);
        self.queue_depth.store(0, Ordering::Relaxed);
    }
}

impl MetricsRecorder for BridgeMetrics {
    fn record_enqueued(&self) {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    fn record_published(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    fn record_acknowledged(&self) {
        self.messages_acknowledged.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failed(&self) {
        self.messages_failed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth as u64, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`BridgeMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub events_enqueued: u64,
    pub messages_published: u64,
    pub messages_acknowledged: u64,
    pub messages_failed: u64,
    pub queue_depth: u64,
}

impl MetricsSnapshot {
    /// Published messages whose outcome has not been reported yet.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.messages_published
            .saturating_sub(self.messages_acknowledged + self.messages_failed)
    }
}
