//! # Stream Bridge
//!
//! Bridges a push-based stream of text events onto a publish/subscribe
//! topic through a bounded hand-off queue.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure data types, no I/O
//!   - `PendingEvent`: One received event
//!   - `EventSink` / `EventDrain`: The bounded FIFO hand-off queue
//!   - `OutboundMessage`: Reused staging buffer for sends
//!   - `BridgeState`: Lifecycle states
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `PublishEventHandler`: Driving port (broker -> bridge callbacks)
//!   - `IngestionSource`, `BrokerClient`: Driven ports
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `PublishLoop`: Single consumer moving events to the broker
//!   - `LoggingPublishHandler`: Default publish-result callback
//!   - `BridgeController`: activate / deactivate lifecycle
//!
//! - **Adapters Layer** (`adapters/`): External connections
//!   - `DelimitedStreamSource`: Length-delimited stream reader
//!   - `BusBrokerClient`: Publishes onto `topic-bus`
//!
//! ## Data Flow
//!
//! ```text
//! stream I/O ──enqueue──→ [hand-off queue] ──dequeue──→ PublishLoop ──send──→ broker
//!  (producer)              (bounded FIFO)              (single consumer)        │
//!                                                                                ↓
//!                                               PublishEventHandler ←── ack / failure
//! ```
//!
//! ## Delivery
//!
//! At-most-once. A full queue blocks the producer rather than dropping.
//! Events still queued when the bridge stops are discarded, and failed
//! publishes are logged but not retried.
//!
//! ## Usage Example
//!
//! ```ignore
//! use stream_bridge::{BridgeConfig, BridgeController, BusBrokerClient, DelimitedStreamSource, StdinConnector};
//! use topic_bus::InMemoryTopicBus;
//! use std::sync::Arc;
//!
//! let config = BridgeConfig::from_env()?;
//! let bus = Arc::new(InMemoryTopicBus::new());
//! let ingestion = Arc::new(DelimitedStreamSource::from_config(StdinConnector, &config));
//! let broker = Arc::new(BusBrokerClient::new(bus));
//!
//! let controller = Arc::new(BridgeController::new(config, ingestion, broker));
//! let report = controller.activate().await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use config::{BridgeConfig, Credentials, StreamConfig, TrackTerms};
pub use domain::{
    handoff_queue, handoff_queue_with_metrics, BridgeState, Destination, EventDrain, EventSink,
    OutboundMessage, PendingEvent, QueueClosed,
};
pub use error::{BridgeError, BrokerError, ConfigError, IngestionError};
pub use metrics::{BridgeMetrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use ports::{dispatch_outcome, BrokerClient, IngestionSource, PublishEventHandler, PublishOutcome};
pub use service::{BridgeController, LoggingPublishHandler, LoopExit, PublishLoop, RunReport};

pub use adapters::{
    BusBrokerClient, DelimitedFrameReader, DelimitedStreamSource, StdinConnector, StreamConnector,
    StreamRequest,
};
