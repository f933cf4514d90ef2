//! Outbound Ports (Driven Ports)
//!
//! The two external collaborators of the bridge: the network stream that
//! pushes events in, and the broker client that carries messages out.

use crate::domain::{Destination, EventSink, OutboundMessage};
use crate::error::{BrokerError, IngestionError};
use crate::ports::PublishEventHandler;
use async_trait::async_trait;
use std::sync::Arc;

/// Push-based ingestion stream (Driven Port)
///
/// The source owns its own I/O context. Once connected it delivers every
/// received event by enqueuing into the supplied sink, blocking when the
/// queue is full. Dropping every clone of the sink tells the publish side
/// no more events will arrive.
#[async_trait]
pub trait IngestionSource: Send + Sync {
    /// Open the stream and start delivering into `sink`.
    async fn connect(&self, sink: EventSink) -> Result<(), IngestionError>;

    /// Stop delivering. No events are enqueued after this returns.
    async fn stop(&self) -> Result<(), IngestionError>;

    /// Whether the stream is permanently finished.
    fn is_done(&self) -> bool;
}

/// Publish/subscribe broker client (Driven Port)
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Open the broker session. Publish outcomes for this session are
    /// reported to `handler` from the broker's own execution context.
    async fn connect(&self, handler: Arc<dyn PublishEventHandler>) -> Result<(), BrokerError>;

    /// Resolve a destination name into a publish handle.
    fn resolve_destination(&self, name: &str) -> Result<Destination, BrokerError>;

    /// Create an empty message for staging.
    fn create_message(&self) -> OutboundMessage {
        OutboundMessage::new()
    }

    /// Hand a message to the broker for asynchronous transmission.
    ///
    /// Must not block and must copy everything it needs from `message`
    /// before returning; the caller reuses the message for the next send.
    fn send(&self, message: &OutboundMessage, destination: &Destination) -> Result<(), BrokerError>;

    /// Close the session. Outcomes already in flight are still reported.
    async fn close_session(&self) -> Result<(), BrokerError>;
}
