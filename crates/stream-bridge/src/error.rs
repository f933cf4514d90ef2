//! Error types for the stream bridge

use crate::domain::BridgeState;
use thiserror::Error;

/// Errors in bridge configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("Invalid topic: {0}")]
    InvalidTopic(#[from] topic_bus::TopicError),

    #[error("Queue capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("Too many track terms: {count} > {max}")]
    TooManyTrackTerms { count: usize, max: usize },

    #[error("Invalid track term '{term}': {reason}")]
    InvalidTrackTerm { term: String, reason: &'static str },
}

/// Errors from the ingestion side.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Ingestion credentials are incomplete")]
    MissingCredentials,

    #[error("Ingestion source already connected")]
    AlreadyConnected,

    #[error("Failed to open stream: {0}")]
    Connect(String),

    #[error("Stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Frame too large: {size} > {max}")]
    FrameTooLarge { size: usize, max: usize },
}

/// Errors from the broker side.
///
/// Carried by value into publish-result notifications, hence `Clone`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Broker session is not connected")]
    NotConnected,

    #[error("Broker session already connected")]
    AlreadyConnected,

    #[error("Failed to connect to broker: {0}")]
    Connect(String),

    #[error("Invalid destination '{name}': {reason}")]
    InvalidDestination { name: String, reason: String },

    #[error("Broker session closed")]
    SessionClosed,

    #[error("Send rejected: {0}")]
    Rejected(String),

    #[error("No subscribers for destination '{0}'")]
    NoSubscribers(String),
}

impl BrokerError {
    /// Whether the error invalidates the session rather than a single message.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::SessionClosed | Self::Connect(_)
        )
    }
}

/// Errors surfaced by the lifecycle controller.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Broker startup failed: {0}")]
    BrokerStartup(#[source] BrokerError),

    #[error("Ingestion startup failed: {0}")]
    IngestionStartup(#[source] IngestionError),

    #[error("Publish loop failed: {0}")]
    Publish(#[source] BrokerError),

    #[error("Invalid lifecycle state: expected {expected}, found {actual}")]
    InvalidState {
        expected: BridgeState,
        actual: BridgeState,
    },
}

impl BridgeError {
    /// Whether the error happened before the publish loop was entered.
    #[must_use]
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::BrokerStartup(_) | Self::IngestionStartup(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_broker_errors() {
        assert!(BrokerError::NotConnected.is_fatal());
        assert!(BrokerError::SessionClosed.is_fatal());
        assert!(!BrokerError::Rejected("too big".into()).is_fatal());
        assert!(!BrokerError::NoSubscribers("t".into()).is_fatal());
    }

    #[test]
    fn test_startup_classification() {
        assert!(BridgeError::BrokerStartup(BrokerError::NotConnected).is_startup());
        assert!(BridgeError::Config(ConfigError::ZeroQueueCapacity).is_startup());
        assert!(!BridgeError::Publish(BrokerError::SessionClosed).is_startup());
    }

    #[test]
    fn test_error_display() {
        let err = BridgeError::InvalidState {
            expected: BridgeState::Stopped,
            actual: BridgeState::Running,
        };
        assert_eq!(
            err.to_string(),
            "Invalid lifecycle state: expected Stopped, found Running"
        );
    }
}
