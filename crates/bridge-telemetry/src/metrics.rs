//! Prometheus metrics for the bridge.
//!
//! All metrics follow the naming convention: `fb_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: events enqueued, messages published, acknowledgements, failures
//! - **Gauge**: current hand-off queue depth

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use serde::Serialize;

use crate::TelemetryError;

lazy_static! {
    /// Bridge metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Events accepted into the hand-off queue
    pub static ref EVENTS_ENQUEUED: IntCounter = IntCounter::new(
        "fb_events_enqueued_total",
        "Total events accepted into the hand-off queue"
    ).expect("metric creation failed");

    /// Messages handed to the broker
    pub static ref MESSAGES_PUBLISHED: IntCounter = IntCounter::new(
        "fb_messages_published_total",
        "Total messages handed to the broker for sending"
    ).expect("metric creation failed");

    /// Broker acknowledgements
    pub static ref PUBLISH_ACKS: IntCounter = IntCounter::new(
        "fb_publish_acks_total",
        "Total publish acknowledgements received from the broker"
    ).expect("metric creation failed");

    /// Publish failures, reported at send time or through the callback
    pub static ref PUBLISH_FAILURES: IntCounter = IntCounter::new(
        "fb_publish_failures_total",
        "Total messages the broker failed to deliver"
    ).expect("metric creation failed");

    /// Current hand-off queue depth
    pub static ref QUEUE_DEPTH: IntGauge = IntGauge::new(
        "fb_queue_depth",
        "Events currently waiting in the hand-off queue"
    ).expect("metric creation failed");
}

/// Register every bridge metric with [`REGISTRY`].
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(EVENTS_ENQUEUED.clone()),
        Box::new(MESSAGES_PUBLISHED.clone()),
        Box::new(PUBLISH_ACKS.clone()),
        Box::new(PUBLISH_FAILURES.clone()),
        Box::new(QUEUE_DEPTH.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Render [`REGISTRY`] in the Prometheus text exposition format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Point-in-time values of the bridge metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSummary {
    pub events_enqueued: u64,
    pub messages_published: u64,
    pub publish_acks: u64,
    pub publish_failures: u64,
    pub queue_depth: i64,
}

impl MetricsSummary {
    /// Read the current values.
    #[must_use]
    pub fn current() -> Self {
        Self {
            events_enqueued: EVENTS_ENQUEUED.get(),
            messages_published: MESSAGES_PUBLISHED.get(),
            publish_acks: PUBLISH_ACKS.get(),
            publish_failures: PUBLISH_FAILURES.get(),
            queue_depth: QUEUE_DEPTH.get(),
        }
    }

    /// One-line JSON rendering for log records.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
