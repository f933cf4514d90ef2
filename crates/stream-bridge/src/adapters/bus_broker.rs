//! Broker client over the in-process topic bus.
//!
//! `send` copies the staged payload into a [`BusMessage`] and publishes it
//! immediately. The outcome is queued for a dispatcher task that owns the
//! publish-result handler, so handlers never run on the publishing thread.

use crate::domain::{Destination, OutboundMessage};
use crate::error::BrokerError;
use crate::ports::{dispatch_outcome, BrokerClient, PublishEventHandler, PublishOutcome};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use topic_bus::{BusMessage, Topic, TopicPublisher};
use tracing::{debug, info, warn};

struct Session {
    outcomes: mpsc::UnboundedSender<PublishOutcome>,
    dispatcher: JoinHandle<()>,
}

pub struct BusBrokerClient {
    bus: Arc<dyn TopicPublisher>,
    session: Mutex<Option<Session>>,
}

impl BusBrokerClient {
    pub fn new(bus: Arc<dyn TopicPublisher>) -> Self {
        Self {
            bus,
            session: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.lock().is_some()
    }
}

#[async_trait]
impl BrokerClient for BusBrokerClient {
    async fn connect(&self, handler: Arc<dyn PublishEventHandler>) -> Result<(), BrokerError> {
        let mut session = self.session.lock();
        if session.is_some() {
            return Err(BrokerError::AlreadyConnected);
        }

        let (outcomes, mut rx) = mpsc::unbounded_channel::<PublishOutcome>();
        let dispatcher = tokio::spawn(async move {
            while let Some(outcome) = rx.recv().await {
                dispatch_outcome(handler.as_ref(), &outcome);
            }
            debug!("Publish result dispatcher stopped");
        });

        *session = Some(Session {
            outcomes,
            dispatcher,
        });
        info!("Topic bus session opened");
        Ok(())
    }

    fn resolve_destination(&self, name: &str) -> Result<Destination, BrokerError> {
        Topic::new(name)
            .map(Destination::new)
            .map_err(|e| BrokerError::InvalidDestination {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn send(&self, message: &OutboundMessage, destination: &Destination) -> Result<(), BrokerError> {
        let session = self.session.lock();
        let session = session.as_ref().ok_or(BrokerError::NotConnected)?;

        let outgoing = BusMessage::new(destination.topic().clone(), message.text())
            .with_sequence(message.sequence());
        let message_id = outgoing.id.clone();

        let outcome = if self.bus.publish(outgoing) > 0 {
            PublishOutcome::Acknowledged(message_id)
        } else {
            PublishOutcome::Failed {
                message_id,
                cause: BrokerError::NoSubscribers(destination.name().to_string()),
                timestamp: Utc::now(),
            }
        };

        session
            .outcomes
            .send(outcome)
            .map_err(|_| BrokerError::SessionClosed)
    }

    /// Waits for every queued outcome to reach the handler.
    async fn close_session(&self) -> Result<(), BrokerError> {
        let session = self.session.lock().take();
        let Some(Session {
            outcomes,
            dispatcher,
        }) = session
        else {
            debug!("Topic bus session already closed");
            return Ok(());
        };

        drop(outcomes);
        if let Err(e) = dispatcher.await {
            warn!(error = %e, "Publish result dispatcher failed");
        }
        info!("Topic bus session closed");
        Ok(())
    }
}
