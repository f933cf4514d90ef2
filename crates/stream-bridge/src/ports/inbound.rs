//! Inbound Ports (Driving Ports)
//!
//! Publish-result notifications the broker client drives into the bridge.

use crate::error::BrokerError;
use chrono::{DateTime, Utc};
use std::panic::{catch_unwind, AssertUnwindSafe};
use topic_bus::MessageId;
use tracing::error;

/// Publish-result callback (Driving Port)
///
/// Invoked by the broker client on its own context, concurrently with the
/// publish loop. Implementations must return quickly and must not block.
pub trait PublishEventHandler: Send + Sync {
    /// The broker confirmed receipt of a message.
    fn acknowledged(&self, message_id: &MessageId);

    /// The broker could not deliver a message.
    fn failed(&self, message_id: &MessageId, cause: &BrokerError, timestamp: DateTime<Utc>);
}

/// Outcome of one send, as queued by a broker for its callback context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Acknowledged(MessageId),
    Failed {
        message_id: MessageId,
        cause: BrokerError,
        timestamp: DateTime<Utc>,
    },
}

impl PublishOutcome {
    #[must_use]
    pub fn message_id(&self) -> &MessageId {
        match self {
            Self::Acknowledged(id) => id,
            Self::Failed { message_id, .. } => message_id,
        }
    }
}

/// Deliver an outcome to a handler without letting anything escape.
///
/// A panicking handler is logged and swallowed so the broker's callback
/// context survives.
pub fn dispatch_outcome(handler: &dyn PublishEventHandler, outcome: &PublishOutcome) {
    let result = catch_unwind(AssertUnwindSafe(|| match outcome {
        PublishOutcome::Acknowledged(id) => handler.acknowledged(id),
        PublishOutcome::Failed {
            message_id,
            cause,
            timestamp,
        } => handler.failed(message_id, cause, *timestamp),
    }));

    if result.is_err() {
        error!(
            message_id = %outcome.message_id(),
            "Publish result handler panicked; notification dropped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        acks: AtomicUsize,
        failures: AtomicUsize,
    }

    impl PublishEventHandler for Counting {
        fn acknowledged(&self, _: &MessageId) {
            self.acks.fetch_add(1, Ordering::SeqCst);
        }

        fn failed(&self, _: &MessageId, _: &BrokerError, _: DateTime<Utc>) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicking;

    impl PublishEventHandler for Panicking {
        fn acknowledged(&self, _: &MessageId) {
            panic!("handler bug");
        }

        fn failed(&self, _: &MessageId, _: &BrokerError, _: DateTime<Utc>) {
            panic!("handler bug");
        }
    }

    #[test]
    fn test_dispatch_routes_outcomes() {
        let handler = Counting::default();
        dispatch_outcome(&handler, &PublishOutcome::Acknowledged(MessageId::generate()));
        dispatch_outcome(
            &handler,
            &PublishOutcome::Failed {
                message_id: MessageId::generate(),
                cause: BrokerError::NoSubscribers("tweets/raw".into()),
                timestamp: Utc::now(),
            },
        );

        assert_eq!(handler.acks.load(Ordering::SeqCst), 1);
        assert_eq!(handler.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_swallows_panics() {
        let id = MessageId::from_string("m-1");
        dispatch_outcome(&Panicking, &PublishOutcome::Acknowledged(id.clone()));
        dispatch_outcome(
            &Panicking,
            &PublishOutcome::Failed {
                message_id: id,
                cause: BrokerError::Rejected("x".into()),
                timestamp: Utc::now(),
            },
        );
    }
}
