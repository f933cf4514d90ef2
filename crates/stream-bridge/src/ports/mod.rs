//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - callbacks the broker drives into the bridge
//! - Driven Ports (outbound) - the ingestion stream and the broker client

pub mod inbound;
pub mod outbound;

pub use inbound::{dispatch_outcome, PublishEventHandler, PublishOutcome};
pub use outbound::{BrokerClient, IngestionSource};
