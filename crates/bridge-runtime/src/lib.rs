//! # Bridge Runtime Library
//!
//! This library exposes the runtime wiring for testing.
//! The main entry point is the `main.rs` binary.

pub mod metrics;
pub mod runtime;

pub use metrics::PrometheusRecorder;
pub use runtime::BridgeRuntime;
