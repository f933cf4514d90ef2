//! Process wiring: topic bus, broker client, ingestion source and controller.
//!
//! ## Startup Sequence
//!
//! 1. Create the in-process topic bus
//! 2. Subscribe a tap on the publish topic (logs every delivered message)
//! 3. Build the controller over the ingestion source and bus broker client
//! 4. Run `activate()` until it returns or the shutdown signal fires
//! 5. On the signal, `deactivate()` and wait for teardown

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use stream_bridge::{
    BridgeConfig, BridgeController, BridgeState, BrokerClient, BusBrokerClient,
    DelimitedStreamSource, IngestionSource, RunReport, StdinConnector,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use topic_bus::{InMemoryTopicBus, Topic, TopicPattern};
use tracing::{debug, info};

use crate::metrics::PrometheusRecorder;

type Controller = BridgeController<dyn IngestionSource, dyn BrokerClient>;

/// The bridge together with the bus it publishes to.
pub struct BridgeRuntime {
    controller: Controller,
    bus: Arc<InMemoryTopicBus>,
}

impl BridgeRuntime {
    /// Wire `ingestion` to a fresh topic bus.
    pub fn new(config: BridgeConfig, ingestion: Arc<dyn IngestionSource>) -> Self {
        let bus = Arc::new(InMemoryTopicBus::new());
        let broker: Arc<dyn BrokerClient> = Arc::new(BusBrokerClient::new(bus.clone()));
        let controller = BridgeController::new(config, ingestion, broker)
            .with_metrics(Arc::new(PrometheusRecorder));

        Self { controller, bus }
    }

    /// Read the event stream from standard input.
    pub fn with_stdin(config: BridgeConfig) -> Self {
        let ingestion = Arc::new(DelimitedStreamSource::from_config(StdinConnector, &config));
        Self::new(config, ingestion)
    }

    /// The bus messages are published to.
    pub fn bus(&self) -> &Arc<InMemoryTopicBus> {
        &self.bus
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<BridgeState> {
        self.controller.subscribe_state()
    }

    /// Run the bridge until ingestion finishes or `shutdown_signal` resolves.
    pub async fn run<F>(&self, shutdown_signal: F) -> Result<RunReport>
    where
        F: Future<Output = ()>,
    {
        let topic = Topic::new(self.controller.config().stream.topic.clone())
            .context("Invalid publish topic")?;
        let tap = spawn_tap(&self.bus, &topic);

        // Polled first so the run is registered before the signal is checked.
        let activation = self.controller.activate();
        tokio::pin!(activation);

        let finished = tokio::select! {
            biased;
            result = &mut activation => Some(result),
            _ = shutdown_signal => None,
        };
        let result = match finished {
            Some(result) => result,
            None => {
                info!("Shutdown signal received");
                let ((), result) = tokio::join!(self.controller.deactivate(), &mut activation);
                result
            }
        };
        tap.abort();

        let report = result.context("Bridge run failed")?;
        Ok(report)
    }
}

/// Log every message delivered on `topic`.
fn spawn_tap(bus: &InMemoryTopicBus, topic: &Topic) -> JoinHandle<()> {
    let mut subscription = bus.subscribe(TopicPattern::exact(topic));
    tokio::spawn(async move {
        while let Some(message) = subscription.recv().await {
            debug!(
                topic = %message.topic,
                message_id = %message.id,
                sequence = ?message.sequence,
                bytes = message.payload.len(),
                "Message delivered"
            );
        }
    })
}
