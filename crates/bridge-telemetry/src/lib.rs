//! # Bridge Telemetry
//!
//! Logging and metrics for the firehose bridge.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridge_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FB_SERVICE_NAME` | `firehose-bridge` | Service name in log records |
//! | `FB_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` is used when unset) |
//! | `FB_JSON_LOGS` | `false` (`true` in containers) | JSON log output |
//! | `FB_CONSOLE_OUTPUT` | `true` | Write logs to the console |

mod config;
mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, MetricsSummary, EVENTS_ENQUEUED, MESSAGES_PUBLISHED,
    PUBLISH_ACKS, PUBLISH_FAILURES, QUEUE_DEPTH,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the log subscriber.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    init_logging(config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name.clone(),
    })
}

/// Guard that keeps telemetry active. Logs the final metric values on drop.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(
            service = %self.service_name,
            metrics = %MetricsSummary::current().to_json(),
            "Shutting down telemetry..."
        );
    }
}
