//! # Lifecycle Controller
//!
//! Owns one bridge run from connect to teardown.
//!
//! ## Startup Order
//!
//! 1. Validate configuration
//! 2. Connect the broker session with the publish-result handler
//! 3. Resolve the destination and create the reusable message
//! 4. Connect ingestion against a fresh hand-off queue
//! 5. Enter the publish loop
//!
//! Any failure in 1-4 aborts the run; a broker session opened in step 2 is
//! closed again before the error is returned.
//!
//! ## Teardown Order
//!
//! Queue closed, then ingestion stopped, then broker session closed. Events
//! still queued at that point are discarded.

use crate::config::BridgeConfig;
use crate::domain::{handoff_queue_with_metrics, BridgeState, Destination, EventDrain, OutboundMessage};
use crate::error::BridgeError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::{BrokerClient, IngestionSource, PublishEventHandler};
use crate::service::publish_loop::{LoopExit, PublishLoop};
use crate::service::result_handler::LoggingPublishHandler;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// How the publish loop ended.
    #[serde(serialize_with = "serialize_exit")]
    pub exit: LoopExit,
    /// Messages handed to the broker.
    pub published: u64,
    /// Events the broker refused at send time.
    pub rejected: u64,
    /// Events still queued at teardown.
    pub discarded: usize,
}

fn serialize_exit<S: serde::Serializer>(exit: &LoopExit, s: S) -> Result<S::Ok, S::Error> {
    let name = match exit {
        LoopExit::Shutdown => "shutdown",
        LoopExit::IngestionDone => "ingestion_done",
        LoopExit::Failed(_) => "failed",
    };
    s.serialize_str(name)
}

/// Resources opened during startup.
struct Session {
    drain: EventDrain,
    destination: Destination,
    message: OutboundMessage,
}

pub struct BridgeController<I: IngestionSource + ?Sized, B: BrokerClient + ?Sized> {
    config: BridgeConfig,
    ingestion: Arc<I>,
    broker: Arc<B>,
    handler: Option<Arc<dyn PublishEventHandler>>,
    metrics: Arc<dyn MetricsRecorder>,
    state_tx: watch::Sender<BridgeState>,
    shutdown_tx: watch::Sender<bool>,
}

impl<I: IngestionSource + ?Sized, B: BrokerClient + ?Sized> BridgeController<I, B> {
    pub fn new(config: BridgeConfig, ingestion: Arc<I>, broker: Arc<B>) -> Self {
        let (state_tx, _) = watch::channel(BridgeState::Stopped);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            ingestion,
            broker,
            handler: None,
            metrics: Arc::new(NoOpMetrics),
            state_tx,
            shutdown_tx,
        }
    }

    /// Replace the default logging publish-result handler.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn PublishEventHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> BridgeState {
        *self.state_tx.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<BridgeState> {
        self.state_tx.subscribe()
    }

    /// Connect everything and run the publish loop until stopped.
    ///
    /// Returns once teardown has completed. Only one run may be in progress.
    pub async fn activate(&self) -> Result<RunReport, BridgeError> {
        self.begin_start()?;
        info!(topic = %self.config.stream.topic, "Starting stream bridge...");

        let session = match self.start().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Error while starting stream bridge");
                self.set_state(BridgeState::Stopped);
                return Err(e);
            }
        };

        let mut publish_loop =
            PublishLoop::new(session.drain, self.broker.clone(), session.destination, session.message)
                .with_metrics(self.metrics.clone());

        let exit = if *self.shutdown_tx.borrow() {
            debug!("Stop requested during startup");
            LoopExit::Shutdown
        } else {
            self.set_state(BridgeState::Running);
            info!("Stream bridge has started");
            let ingestion = self.ingestion.clone();
            publish_loop
                .run(
                    self.shutdown_tx.subscribe(),
                    move || ingestion.is_done(),
                    self.config.stream.done_check_interval,
                )
                .await
        };

        self.set_state(BridgeState::Stopping);
        let discarded = publish_loop.close_queue();
        self.teardown(discarded).await;
        self.set_state(BridgeState::Stopped);

        match exit {
            LoopExit::Failed(e) => Err(BridgeError::Publish(e)),
            exit => {
                let report = RunReport {
                    exit,
                    published: publish_loop.published(),
                    rejected: publish_loop.rejected(),
                    discarded,
                };
                info!(
                    exit = ?report.exit,
                    published = report.published,
                    rejected = report.rejected,
                    discarded = report.discarded,
                    "Stream bridge run finished"
                );
                Ok(report)
            }
        }
    }

    /// Ask a running bridge to stop and wait until teardown has finished.
    ///
    /// Does nothing when the bridge is already stopped.
    pub async fn deactivate(&self) {
        let mut active = false;
        self.state_tx.send_if_modified(|state| {
            active = state.is_active();
            if active {
                self.shutdown_tx.send_replace(true);
            }
            false
        });

        if !active {
            debug!("Stream bridge is not running");
            return;
        }

        info!("Stop requested");
        let mut state_rx = self.state_tx.subscribe();
        // The sender lives in `self`, so this only ends once Stopped is seen.
        let _ = state_rx.wait_for(|s| *s == BridgeState::Stopped).await;
    }

    /// Move Stopped to Starting and clear any previous stop request, atomically.
    fn begin_start(&self) -> Result<(), BridgeError> {
        let mut actual = BridgeState::Stopped;
        let started = self.state_tx.send_if_modified(|state| {
            actual = *state;
            if *state != BridgeState::Stopped {
                return false;
            }
            self.shutdown_tx.send_replace(false);
            *state = BridgeState::Starting;
            true
        });

        if started {
            debug!(from = %BridgeState::Stopped, to = %BridgeState::Starting, "Bridge state changed");
            Ok(())
        } else {
            Err(BridgeError::InvalidState {
                expected: BridgeState::Stopped,
                actual,
            })
        }
    }

    fn set_state(&self, next: BridgeState) {
        let previous = self.state_tx.send_replace(next);
        debug_assert!(
            previous.can_transition_to(next),
            "illegal transition {previous} -> {next}"
        );
        debug!(from = %previous, to = %next, "Bridge state changed");
    }

    async fn start(&self) -> Result<Session, BridgeError> {
        self.config.validate()?;

        let handler: Arc<dyn PublishEventHandler> = match &self.handler {
            Some(handler) => handler.clone(),
            None => Arc::new(LoggingPublishHandler::with_metrics(self.metrics.clone())),
        };
        self.broker
            .connect(handler)
            .await
            .map_err(BridgeError::BrokerStartup)?;
        info!("Connected to broker");

        let opened = self.open_session().await;
        if opened.is_err() {
            if let Err(e) = self.broker.close_session().await {
                warn!(error = %e, "Failed to close broker session after startup failure");
            }
        }
        opened
    }

    async fn open_session(&self) -> Result<Session, BridgeError> {
        let destination = self
            .broker
            .resolve_destination(&self.config.stream.topic)
            .map_err(BridgeError::BrokerStartup)?;
        let message = self.broker.create_message();

        let (sink, drain) =
            handoff_queue_with_metrics(self.config.stream.queue_capacity, self.metrics.clone());
        self.ingestion
            .connect(sink)
            .await
            .map_err(BridgeError::IngestionStartup)?;
        info!(
            destination = %destination,
            capacity = drain.capacity(),
            "Connected to ingestion stream"
        );

        Ok(Session {
            drain,
            destination,
            message,
        })
    }

    async fn teardown(&self, discarded: usize) {
        info!("Stopping stream bridge...");
        if discarded > 0 {
            warn!(discarded, "Discarding queued events that were never published");
        }

        if let Err(e) = self.ingestion.stop().await {
            warn!(error = %e, "Failed to stop ingestion stream");
        }
        if let Err(e) = self.broker.close_session().await {
            warn!(error = %e, "Failed to close broker session");
        }
        info!("Stream bridge has stopped");
    }
}
