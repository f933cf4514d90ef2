//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stream_bridge::{
    dispatch_outcome, BrokerClient, BrokerError, Destination, EventSink, IngestionError,
    IngestionSource, OutboundMessage, PublishEventHandler, PublishOutcome,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use topic_bus::{MessageId, Topic};

/// Ordered record of collaborator calls across both doubles.
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Ingestion fed by the test through a [`Feeder`].
pub struct ScriptedIngestion {
    feed: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    done: Arc<AtomicBool>,
    calls: CallLog,
}

/// Pushes events into a connected [`ScriptedIngestion`]. Dropping it ends the stream.
pub struct Feeder(mpsc::UnboundedSender<String>);

impl Feeder {
    pub fn push(&self, text: &str) {
        self.0.send(text.to_string()).expect("ingestion task gone");
    }
}

impl ScriptedIngestion {
    pub fn new(calls: CallLog) -> (Arc<Self>, Feeder) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ingestion = Arc::new(Self {
            feed: Mutex::new(Some(rx)),
            task: Mutex::new(None),
            done: Arc::new(AtomicBool::new(false)),
            calls,
        });
        (ingestion, Feeder(tx))
    }

    /// Ingestion that replays `events` and then finishes.
    pub fn replay(calls: CallLog, events: &[&str]) -> Arc<Self> {
        let (ingestion, feeder) = Self::new(calls);
        for event in events {
            feeder.push(event);
        }
        ingestion
    }
}

#[async_trait]
impl IngestionSource for ScriptedIngestion {
    async fn connect(&self, sink: EventSink) -> Result<(), IngestionError> {
        self.calls.lock().push("ingestion.connect");
        let mut feed = self
            .feed
            .lock()
            .take()
            .ok_or(IngestionError::AlreadyConnected)?;
        let done = self.done.clone();
        let handle = tokio::spawn(async move {
            while let Some(text) = feed.recv().await {
                if sink.enqueue(text).await.is_err() {
                    break;
                }
            }
            done.store(true, Ordering::SeqCst);
        });
        *self.task.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), IngestionError> {
        self.calls.lock().push("ingestion.stop");
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.abort();
        }
        self.done.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

/// Broker that records every send and acknowledges from a spawned task.
#[derive(Default)]
pub struct RecordingBroker {
    pub sent: Mutex<Vec<(u64, String)>>,
    calls: CallLog,
    handler: Mutex<Option<Arc<dyn PublishEventHandler>>>,
    fail_connect: bool,
    fail_delivery_of: Option<&'static str>,
}

impl RecordingBroker {
    pub fn new(calls: CallLog) -> Arc<Self> {
        Arc::new(Self {
            calls,
            ..Default::default()
        })
    }

    pub fn unreachable(calls: CallLog) -> Arc<Self> {
        Arc::new(Self {
            calls,
            fail_connect: true,
            ..Default::default()
        })
    }

    /// Reports an asynchronous delivery failure for every send of `text`.
    pub fn failing_delivery_of(calls: CallLog, text: &'static str) -> Arc<Self> {
        Arc::new(Self {
            calls,
            fail_delivery_of: Some(text),
            ..Default::default()
        })
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl BrokerClient for RecordingBroker {
    async fn connect(&self, handler: Arc<dyn PublishEventHandler>) -> Result<(), BrokerError> {
        self.calls.lock().push("broker.connect");
        if self.fail_connect {
            return Err(BrokerError::Connect("connection refused".into()));
        }
        *self.handler.lock() = Some(handler);
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

    fn send(&self, message: &OutboundMessage, _: &Destination) -> Result<(), BrokerError> {
        let handler = self.handler.lock().clone().ok_or(BrokerError::NotConnected)?;
        self.sent
            .lock()
            .push((message.sequence(), message.text().to_string()));

        let message_id = MessageId::from_string(format!("msg-{}", message.sequence()));
        let outcome = if Some(message.text()) == self.fail_delivery_of {
            PublishOutcome::Failed {
                message_id,
                cause: BrokerError::Rejected("delivery failed".into()),
                timestamp: Utc::now(),
            }
        } else {
            PublishOutcome::Acknowledged(message_id)
        };
        tokio::spawn(async move { dispatch_outcome(handler.as_ref(), &outcome) });
        Ok(())
    }

    async fn close_session(&self) -> Result<(), BrokerError> {
        self.calls.lock().push("broker.close");
        self.handler.lock().take();
        Ok(())
    }
}

/// Poll `condition` until it holds or a second passes.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
