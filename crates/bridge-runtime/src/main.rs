//! # Firehose Bridge
//!
//! Reads a length-delimited stream of text events from stdin and publishes
//! each one onto a topic.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logging, Prometheus registry)
//! 2. Load configuration from the environment
//! 3. Wire stdin ingestion, topic bus and controller
//! 4. Run until stdin ends or Ctrl+C
//!
//! A startup failure or a broker session failure exits non-zero.

use std::time::Duration;

use anyhow::{Context, Result};
use bridge_runtime::BridgeRuntime;
use bridge_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use stream_bridge::BridgeConfig;
use tracing::{debug, error, info, warn};

/// How long blocking stdin reads may delay process exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("firehose-bridge")
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(run());
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _guard = init_telemetry(&telemetry).context("Failed to initialize telemetry")?;

    let config = BridgeConfig::from_env().context("Failed to load bridge configuration")?;

    info!("===========================================");
    info!("  Firehose Bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!(
        topic = %config.stream.topic,
        queue_capacity = config.stream.queue_capacity,
        track = %config.stream.track_terms,
        "Configuration loaded"
    );

    let runtime = BridgeRuntime::with_stdin(config);
    info!("Bridge is running. Press Ctrl+C to stop.");

    let outcome = runtime.run(ctrl_c()).await;

    match encode_metrics() {
        Ok(text) => debug!(metrics = %text, "Final metrics"),
        Err(e) => warn!(error = %e, "Failed to encode metrics"),
    }

    match outcome {
        Ok(report) => {
            info!(
                report = %serde_json::to_string(&report).unwrap_or_default(),
                "Bridge exited"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "Bridge exited with error");
            Err(e)
        }
    }
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
