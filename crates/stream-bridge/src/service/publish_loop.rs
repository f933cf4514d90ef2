//! # Publish Loop
//!
//! Drains the hand-off queue and forwards every event to the broker, one at
//! a time, in queue order.
//!
//! ## Per-Event Steps
//!
//! 1. Dequeue (waits while the queue is empty)
//! 2. Stage into the reused outbound message (reset, then set)
//! 3. Hand to the broker's non-blocking send
//! 4. Continue without waiting for the acknowledgement
//!
//! The wait in step 1 races the shutdown signal, so a stop request is
//! observed even when no event ever arrives again.

use crate::domain::{Destination, EventDrain, OutboundMessage, PendingEvent};
use crate::error::BrokerError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::BrokerClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

/// Why the publish loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The stop signal was raised.
    Shutdown,
    /// No more events will arrive and the queue is empty.
    IngestionDone,
    /// The broker session failed; the run cannot continue.
    Failed(BrokerError),
}

/// What woke the loop.
enum Wake {
    Event(PendingEvent),
    QueueClosed,
    Signal { sender_gone: bool },
    Tick,
}

pub struct PublishLoop<B: BrokerClient + ?Sized> {
    drain: EventDrain,
    broker: Arc<B>,
    destination: Destination,
    message: OutboundMessage,
    metrics: Arc<dyn MetricsRecorder>,
    published: u64,
    rejected: u64,
}

impl<B: BrokerClient + ?Sized> PublishLoop<B> {
    pub fn new(
        drain: EventDrain,
        broker: Arc<B>,
        destination: Destination,
        message: OutboundMessage,
    ) -> Self {
        Self {
            drain,
            broker,
            destination,
            message,
            metrics: Arc::new(NoOpMetrics),
            published: 0,
            rejected: 0,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run until stopped, until ingestion is finished, or until the broker
    /// session fails.
    ///
    /// `ingestion_done` is consulted before every dequeue and every
    /// `done_check_interval` while the queue is idle. The loop only exits
    /// for it once the queue is empty.
    pub async fn run<F>(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
        ingestion_done: F,
        done_check_interval: Duration,
    ) -> LoopExit
    where
        F: Fn() -> bool,
    {
        let mut ticker = tokio::time::interval(done_check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow_and_update() {
                return LoopExit::Shutdown;
            }
            if ingestion_done() && self.drain.is_empty() {
                return LoopExit::IngestionDone;
            }

            let wake = tokio::select! {
                biased;
                changed = shutdown.changed() => Wake::Signal { sender_gone: changed.is_err() },
                event = self.drain.dequeue() => event.map_or(Wake::QueueClosed, Wake::Event),
                _ = ticker.tick() => Wake::Tick,
            };

            match wake {
                Wake::Event(event) => {
                    if let Err(e) = self.publish(&event) {
                        return LoopExit::Failed(e);
                    }
                }
                Wake::QueueClosed => return LoopExit::IngestionDone,
                Wake::Signal { sender_gone: true } => return LoopExit::Shutdown,
                Wake::Signal { sender_gone: false } | Wake::Tick => {}
            }
        }
    }

    /// Stage and send a single event.
    ///
    /// A per-message rejection drops the event. Only session-level
    /// failures are returned.
    fn publish(&mut self, event: &PendingEvent) -> Result<(), BrokerError> {
        let sequence = self.published + self.rejected + 1;
        self.message.stage(event, sequence);

        match self.broker.send(&self.message, &self.destination) {
            Ok(()) => {
                self.published += 1;
                self.metrics.record_published();
                debug!(
                    destination = %self.destination,
                    sequence,
                    bytes = event.len(),
                    "Message sent"
                );
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                error!(destination = %self.destination, sequence, error = %e, "Broker session failed");
                Err(e)
            }
            Err(e) => {
                self.rejected += 1;
                self.metrics.record_failed();
                warn!(destination = %self.destination, sequence, error = %e, "Message rejected, dropping event");
                Ok(())
            }
        }
    }

    /// Stop accepting events. Producers blocked on a full queue are released.
    ///
    /// Returns the number of queued events that will never be published.
    pub fn close_queue(&mut self) -> usize {
        self.drain.close();
        self.drain.len()
    }

    /// Messages handed to the broker so far.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Events the broker refused at send time.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::handoff_queue;
    use crate::ports::PublishEventHandler;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use topic_bus::Topic;

    /// Records every send; optionally fails on a given payload.
    #[derive(Default)]
    struct RecordingBroker {
        sent: Mutex<Vec<(u64, String)>>,
        reject: Option<&'static str>,
        fail_session_on: Option<&'static str>,
    }

    #[async_trait]
    impl BrokerClient for RecordingBroker {
        async fn connect(&self, _: Arc<dyn PublishEventHandler>) -> Result<(), BrokerError> {
            Ok(())
        }

        fn resolve_destination(&self, name: &str) -> Result<Destination, BrokerError> {
            Ok(Destination::new(Topic::new(name).unwrap()))
        }

        fn send(&self, message: &OutboundMessage, _: &Destination) -> Result<(), BrokerError> {
            if Some(message.text()) == self.fail_session_on {
                return Err(BrokerError::SessionClosed);
            }
            if Some(message.text()) == self.reject {
                return Err(BrokerError::Rejected("test".into()));
            }
            self.sent
                .lock()
                .push((message.sequence(), message.text().to_string()));
            Ok(())
        }

        async fn close_session(&self) -> Result<(), BrokerError> {
            Ok(())
        }
    }

    fn destination() -> Destination {
        Destination::new(Topic::new("tweets/raw").unwrap())
    }

    fn sent_texts(broker: &RecordingBroker) -> Vec<String> {
        broker.sent.lock().iter().map(|(_, t)| t.clone()).collect()
    }

    #[tokio::test]
    async fn test_sends_in_queue_order_then_exits_when_sinks_dropped() {
        let broker = Arc::new(RecordingBroker::default());
        let (sink, drain) = handoff_queue(8);
        for text in ["a", "b", "c"] {
            sink.enqueue(text).await.unwrap();
        }
        drop(sink);

        let (_tx, rx) = watch::channel(false);
        let mut publish_loop =
            PublishLoop::new(drain, broker.clone(), destination(), OutboundMessage::new());
        let exit = publish_loop
            .run(rx, || false, Duration::from_secs(60))
            .await;

        assert_eq!(exit, LoopExit::IngestionDone);
        assert_eq!(sent_texts(&broker), vec!["a", "b", "c"]);
        assert_eq!(publish_loop.published(), 3);
    }

    #[tokio::test]
    async fn test_staging_leaves_no_residue() {
        let broker = Arc::new(RecordingBroker::default());
        let (sink, drain) = handoff_queue(8);
        sink.enqueue("a long first payload").await.unwrap();
        sink.enqueue("x").await.unwrap();
        drop(sink);

        let (_tx, rx) = watch::channel(false);
        PublishLoop::new(drain, broker.clone(), destination(), OutboundMessage::new())
            .run(rx, || false, Duration::from_secs(60))
            .await;

        let sent = broker.sent.lock().clone();
        assert_eq!(sent, vec![(1, "a long first payload".to_string()), (2, "x".to_string())]);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_idle_wait() {
        let broker = Arc::new(RecordingBroker::default());
        let (_sink, drain) = handoff_queue(8);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            PublishLoop::new(drain, broker, destination(), OutboundMessage::new())
                .run(rx, || false, Duration::from_secs(60))
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        let exit = tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("loop should observe shutdown")
            .unwrap();
        assert_eq!(exit, LoopExit::Shutdown);
    }

    #[tokio::test]
    async fn test_dropped_shutdown_sender_stops_loop() {
        let broker = Arc::new(RecordingBroker::default());
        let (_sink, drain) = handoff_queue(8);
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let exit = PublishLoop::new(drain, broker, destination(), OutboundMessage::new())
            .run(rx, || false, Duration::from_secs(60))
            .await;
        assert_eq!(exit, LoopExit::Shutdown);
    }

    #[tokio::test]
    async fn test_ingestion_done_is_polled_while_idle() {
        let broker = Arc::new(RecordingBroker::default());
        let (_sink, drain) = handoff_queue(8);
        let (_tx, rx) = watch::channel(false);
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let flag = done.clone();
        let handle = tokio::spawn(async move {
            PublishLoop::new(drain, broker, destination(), OutboundMessage::new())
                .run(
                    rx,
                    move || flag.load(std::sync::atomic::Ordering::SeqCst),
                    Duration::from_millis(10),
                )
                .await
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        done.store(true, std::sync::atomic::Ordering::SeqCst);

        let exit = tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("loop should notice ingestion is done")
            .unwrap();
        assert_eq!(exit, LoopExit::IngestionDone);
    }

    #[tokio::test]
    async fn test_ingestion_done_still_drains_queue() {
        let broker = Arc::new(RecordingBroker::default());
        let (sink, drain) = handoff_queue(8);
        sink.enqueue("queued").await.unwrap();
        let (_tx, rx) = watch::channel(false);

        let exit = PublishLoop::new(drain, broker.clone(), destination(), OutboundMessage::new())
            .run(rx, || true, Duration::from_secs(60))
            .await;

        assert_eq!(exit, LoopExit::IngestionDone);
        assert_eq!(sent_texts(&broker), vec!["queued"]);
        drop(sink);
    }

    #[tokio::test]
    async fn test_rejected_message_is_dropped_and_loop_continues() {
        let broker = Arc::new(RecordingBroker {
            reject: Some("bad"),
            ..Default::default()
        });
        let (sink, drain) = handoff_queue(8);
        for text in ["a", "bad", "c"] {
            sink.enqueue(text).await.unwrap();
        }
        drop(sink);

        let (_tx, rx) = watch::channel(false);
        let mut publish_loop =
            PublishLoop::new(drain, broker.clone(), destination(), OutboundMessage::new());
        let exit = publish_loop.run(rx, || false, Duration::from_secs(60)).await;

        assert_eq!(exit, LoopExit::IngestionDone);
        assert_eq!(sent_texts(&broker), vec!["a", "c"]);
        assert_eq!(publish_loop.rejected(), 1);
    }

    #[tokio::test]
    async fn test_session_failure_ends_run() {
        let broker = Arc::new(RecordingBroker {
            fail_session_on: Some("boom"),
            ..Default::default()
        });
        let (sink, drain) = handoff_queue(8);
        for text in ["a", "boom", "never"] {
            sink.enqueue(text).await.unwrap();
        }

        let (_tx, rx) = watch::channel(false);
        let mut publish_loop =
            PublishLoop::new(drain, broker.clone(), destination(), OutboundMessage::new());
        let exit = publish_loop.run(rx, || false, Duration::from_secs(60)).await;

        assert_eq!(exit, LoopExit::Failed(BrokerError::SessionClosed));
        assert_eq!(sent_texts(&broker), vec!["a"]);
        assert_eq!(publish_loop.close_queue(), 1);
        assert!(sink.is_closed());
    }
}
