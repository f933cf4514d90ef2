//! Ingestion source over a length-delimited byte stream.
//!
//! A [`StreamConnector`] opens the raw stream; [`DelimitedStreamSource`]
//! frames it and pushes each frame into the hand-off queue from its own
//! reader task.

use crate::adapters::delimited::DelimitedFrameReader;
use crate::config::{BridgeConfig, Credentials, TrackTerms};
use crate::domain::EventSink;
use crate::error::IngestionError;
use crate::ports::IngestionSource;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// An opened byte stream.
pub type BoxedStream = Box<dyn AsyncBufRead + Send + Unpin>;

/// Parameters sent to the stream endpoint when connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub client_name: String,
    pub track_terms: TrackTerms,
    pub credentials: Credentials,
}

impl StreamRequest {
    #[must_use]
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            client_name: config.stream.client_name.clone(),
            track_terms: config.stream.track_terms.clone(),
            credentials: config.credentials.clone(),
        }
    }
}

/// Opens the raw stream for a [`DelimitedStreamSource`].
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn open(&self, request: &StreamRequest) -> Result<BoxedStream, IngestionError>;

    /// Whether `open` needs a complete set of credentials.
    fn requires_credentials(&self) -> bool {
        true
    }
}

/// Reads the stream from standard input.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConnector;

#[async_trait]
impl StreamConnector for StdinConnector {
    async fn open(&self, request: &StreamRequest) -> Result<BoxedStream, IngestionError> {
        info!(
            client = %request.client_name,
            track = %request.track_terms,
            "Reading delimited stream from stdin"
        );
        Ok(Box::new(BufReader::new(tokio::io::stdin())))
    }

    fn requires_credentials(&self) -> bool {
        false
    }
}

pub struct DelimitedStreamSource<C> {
    connector: C,
    request: StreamRequest,
    max_frame_bytes: usize,
    done: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl<C: StreamConnector> DelimitedStreamSource<C> {
    pub fn new(connector: C, request: StreamRequest, max_frame_bytes: usize) -> Self {
        Self {
            connector,
            request,
            max_frame_bytes,
            done: Arc::new(AtomicBool::new(false)),
            frames: Arc::new(AtomicU64::new(0)),
            reader: Mutex::new(None),
        }
    }

    pub fn from_config(connector: C, config: &BridgeConfig) -> Self {
        Self::new(
            connector,
            StreamRequest::from_config(config),
            config.stream.max_frame_bytes,
        )
    }

    /// Frames delivered to the queue since construction.
    #[must_use]
    pub fn frames_delivered(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<C: StreamConnector> IngestionSource for DelimitedStreamSource<C> {
    async fn connect(&self, sink: EventSink) -> Result<(), IngestionError> {
        if self.reader.lock().is_some() {
            return Err(IngestionError::AlreadyConnected);
        }
        if self.connector.requires_credentials() && !self.request.credentials.is_complete() {
            return Err(IngestionError::MissingCredentials);
        }

        let stream = self.connector.open(&self.request).await?;
        self.done.store(false, Ordering::SeqCst);

        let mut frames = DelimitedFrameReader::new(stream, self.max_frame_bytes);
        let done = self.done.clone();
        let delivered = self.frames.clone();

        let handle = tokio::spawn(async move {
            loop {
                match frames.next_frame().await {
                    Ok(Some(frame)) => {
                        if sink.enqueue(frame).await.is_err() {
                            debug!("Hand-off queue closed, reader exiting");
                            break;
                        }
                        delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(None) => {
                        info!(frames = frames.frames_read(), "Ingestion stream ended");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "Ingestion stream failed");
                        break;
                    }
                }
            }
            done.store(true, Ordering::SeqCst);
        });

        let mut reader = self.reader.lock();
        if reader.is_some() {
            handle.abort();
            return Err(IngestionError::AlreadyConnected);
        }
        *reader = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), IngestionError> {
        let handle = self.reader.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Ingestion reader task failed");
                }
            }
        }
        self.done.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}
