//! # Topic Bus - In-Process Publish/Subscribe Broker
//!
//! A topic-addressed message bus used as the broker transport when the
//! bridge runs without an external broker.
//!
//! ## Topic Model
//!
//! ```text
//!   publish("tweets/en/raw")          subscribe("tweets/*/raw")
//!          │                                   ↑
//!          ▼                                   │
//!   ┌──────────────┐   pattern match    ┌──────────────┐
//!   │  Topic Bus   │ ─────────────────→ │ Subscription │
//!   └──────────────┘                    └──────────────┘
//! ```
//!
//! - Topics are `/`-separated levels with no wildcards.
//! - Patterns may use `*` for exactly one level and a trailing `>` for
//!   one or more remaining levels.
//! - A message published to a topic no subscription matches is dropped.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod message;
pub mod publisher;
pub mod subscriber;
pub mod topic;

// Re-export main types
pub use message::{BusMessage, MessageId};
pub use publisher::{InMemoryTopicBus, TopicPublisher};
pub use subscriber::{MessageStream, Subscription, SubscriptionError};
pub use topic::{Topic, TopicError, TopicPattern};

/// Maximum messages buffered per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum length of a topic or pattern in bytes.
pub const MAX_TOPIC_BYTES: usize = 250;
