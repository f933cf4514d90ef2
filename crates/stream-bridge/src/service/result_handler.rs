//! Publish-result callback that logs every outcome.
//!
//! Acknowledgements are logged at `debug`, failures at `warn`. Nothing is
//! retried and no queue or loop state is touched.

use crate::error::BrokerError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::PublishEventHandler;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use topic_bus::MessageId;
use tracing::{debug, warn};

pub struct LoggingPublishHandler {
    acknowledged: AtomicU64,
    failed: AtomicU64,
    metrics: Arc<dyn MetricsRecorder>,
}

impl LoggingPublishHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(NoOpMetrics))
    }

    #[must_use]
    pub fn with_metrics(metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            acknowledged: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            metrics,
        }
    }

    /// Acknowledgements seen so far.
    #[must_use]
    pub fn acknowledged_count(&self) -> u64 {
        self.acknowledged.load(Ordering::Relaxed)
    }

    /// Failures seen so far.
    #[must_use]
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl Default for LoggingPublishHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishEventHandler for LoggingPublishHandler {
    fn acknowledged(&self, message_id: &MessageId) {
        self.acknowledged.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_acknowledged();
        debug!(message_id = %message_id, "Producer received response for message");
    }

    fn failed(&self, message_id: &MessageId, cause: &BrokerError, timestamp: DateTime<Utc>) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_failed();
        warn!(
            message_id = %message_id,
            timestamp = %timestamp.to_rfc3339(),
            error = %cause,
            "Producer received error for message"
        );
    }
}
