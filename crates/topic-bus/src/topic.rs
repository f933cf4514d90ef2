//! # Topics and Subscription Patterns
//!
//! A [`Topic`] is the concrete address a message is published to.
//! A [`TopicPattern`] is what a subscriber listens on and may contain
//! wildcards.

use crate::MAX_TOPIC_BYTES;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Level separator for topics and patterns.
pub const LEVEL_SEPARATOR: char = '/';

/// Single-level wildcard.
const SINGLE_LEVEL: &str = "*";

/// Multi-level wildcard, only valid as the last level.
const MULTI_LEVEL: &str = ">";

/// Errors from topic and pattern parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopicError {
    #[error("Topic is empty")]
    Empty,

    #[error("Topic exceeds maximum length: {len} > {max}")]
    TooLong { len: usize, max: usize },

    #[error("Topic '{0}' contains an empty level")]
    EmptyLevel(String),

    #[error("Topic '{0}' contains a wildcard; wildcards are only valid in subscriptions")]
    WildcardInTopic(String),

    #[error("Pattern '{0}' uses '>' before the last level")]
    MisplacedMultiLevel(String),
}

fn check_shape(raw: &str) -> Result<(), TopicError> {
    if raw.is_empty() {
        return Err(TopicError::Empty);
    }
    if raw.len() > MAX_TOPIC_BYTES {
        return Err(TopicError::TooLong {
            len: raw.len(),
            max: MAX_TOPIC_BYTES,
        });
    }
    if raw.split(LEVEL_SEPARATOR).any(str::is_empty) {
        return Err(TopicError::EmptyLevel(raw.to_string()));
    }
    Ok(())
}

/// A validated publish topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Parse and validate a publish topic.
    pub fn new(raw: impl Into<String>) -> Result<Self, TopicError> {
        let raw = raw.into();
        check_shape(&raw)?;
        if raw
            .split(LEVEL_SEPARATOR)
            .any(|level| level == SINGLE_LEVEL || level == MULTI_LEVEL)
        {
            return Err(TopicError::WildcardInTopic(raw));
        }
        Ok(Self(raw))
    }

    /// The topic as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the levels of the topic.
    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.0.split(LEVEL_SEPARATOR)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

/// A subscription pattern.
///
/// `*` matches exactly one level. A trailing `>` matches one or more
/// remaining levels. Any other level must match literally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPattern(String);

impl TopicPattern {
    /// Parse and validate a subscription pattern.
    pub fn new(raw: impl Into<String>) -> Result<Self, TopicError> {
        let raw = raw.into();
        check_shape(&raw)?;
        let levels: Vec<&str> = raw.split(LEVEL_SEPARATOR).collect();
        let last = levels.len() - 1;
        if levels[..last].iter().any(|level| *level == MULTI_LEVEL) {
            return Err(TopicError::MisplacedMultiLevel(raw));
        }
        Ok(Self(raw))
    }

    /// Pattern matching exactly one topic.
    #[must_use]
    pub fn exact(topic: &Topic) -> Self {
        Self(topic.as_str().to_string())
    }

    /// The pattern as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a topic matches this pattern.
    #[must_use]
    pub fn matches(&self, topic: &Topic) -> bool {
        let mut pattern = self.0.split(LEVEL_SEPARATOR);
        let mut levels = topic.levels();

        loop {
            match (pattern.next(), levels.next()) {
                (Some(MULTI_LEVEL), Some(_)) => return true,
                (Some(MULTI_LEVEL), None) => return false,
                (Some(SINGLE_LEVEL), Some(_)) => continue,
                (Some(expected), Some(actual)) if expected == actual => continue,
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
