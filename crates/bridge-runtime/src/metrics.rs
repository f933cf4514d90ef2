//! Prometheus-backed metrics recorder.

use bridge_telemetry::{
    EVENTS_ENQUEUED, MESSAGES_PUBLISHED, PUBLISH_ACKS, PUBLISH_FAILURES, QUEUE_DEPTH,
};
use stream_bridge::MetricsRecorder;

/// Feeds bridge events into the global Prometheus registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusRecorder;

impl MetricsRecorder for PrometheusRecorder {
    fn record_enqueued(&self) {
        EVENTS_ENQUEUED.inc();
    }

    fn record_published(&self) {
        MESSAGES_PUBLISHED.inc();
    }

    fn record_acknowledged(&self) {
        PUBLISH_ACKS.inc();
    }

    fn record_failed(&self) {
        PUBLISH_FAILURES.inc();
    }

    fn record_queue_depth(&self, depth: usize) {
        QUEUE_DEPTH.set(i64::try_from(depth).unwrap_or(i64::MAX));
    }
}
