//! # Bridge Configuration
//!
//! Loaded once before startup and immutable afterwards.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FB_TOPIC` | required | Publish topic |
//! | `FB_TRACK_TERMS` | empty | Comma separated ingestion filter terms |
//! | `FB_QUEUE_CAPACITY` | `100000` | Hand-off queue bound |
//! | `FB_DONE_CHECK_INTERVAL_MS` | `500` | How often the publish loop polls ingestion for completion |
//! | `FB_MAX_FRAME_BYTES` | `500000` | Largest accepted stream frame |
//! | `FB_CLIENT_NAME` | `firehose-client-01` | Name reported by the ingestion client |
//! | `TWITTER_CONSUMER_KEY` | empty | Ingestion credential |
//! | `TWITTER_CONSUMER_SECRET` | empty | Ingestion credential |
//! | `TWITTER_TOKEN` | empty | Ingestion credential |
//! | `TWITTER_SECRET` | empty | Ingestion credential |

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use topic_bus::Topic;

/// Default hand-off queue bound.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;

/// Default interval between ingestion completion checks.
pub const DEFAULT_DONE_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// Default largest accepted stream frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 500_000;

/// Default ingestion client name.
pub const DEFAULT_CLIENT_NAME: &str = "firehose-client-01";

/// Maximum number of track terms the ingestion filter accepts.
pub const MAX_TRACK_TERMS: usize = 400;

/// Maximum length of a single track term in bytes.
pub const MAX_TRACK_TERM_BYTES: usize = 60;

/// Complete bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Stream and topic settings.
    pub stream: StreamConfig,
    /// Ingestion credentials.
    pub credentials: Credentials,
}

impl BridgeConfig {
    /// Configuration for `topic` with defaults everywhere else.
    #[must_use]
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            stream: StreamConfig::for_topic(topic),
            credentials: Credentials::default(),
        }
    }

    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let topic = get("FB_TOPIC").ok_or(ConfigError::Missing("FB_TOPIC"))?;
        let track_terms = get("FB_TRACK_TERMS")
            .map(|raw| TrackTerms::parse_list(&raw))
            .unwrap_or_default();

        let stream = StreamConfig {
            topic: topic.trim().to_string(),
            track_terms,
            queue_capacity: parse_or("FB_QUEUE_CAPACITY", get("FB_QUEUE_CAPACITY"), DEFAULT_QUEUE_CAPACITY)?,
            done_check_interval: Duration::from_millis(parse_or(
                "FB_DONE_CHECK_INTERVAL_MS",
                get("FB_DONE_CHECK_INTERVAL_MS"),
                DEFAULT_DONE_CHECK_INTERVAL.as_millis() as u64,
            )?),
            max_frame_bytes: parse_or("FB_MAX_FRAME_BYTES", get("FB_MAX_FRAME_BYTES"), DEFAULT_MAX_FRAME_BYTES)?,
            client_name: get("FB_CLIENT_NAME").unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
        };

        let credentials = Credentials {
            consumer_key: lookup("TWITTER_CONSUMER_KEY").unwrap_or_default(),
            consumer_secret: lookup("TWITTER_CONSUMER_SECRET").unwrap_or_default(),
            token: lookup("TWITTER_TOKEN").unwrap_or_default(),
            secret: lookup("TWITTER_SECRET").unwrap_or_default(),
        };

        let config = Self { stream, credentials };
        config.validate()?;
        Ok(config)
    }

    /// Validate every setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stream.validate()
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
        }),
    }
}

/// Stream, queue and topic settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Publish topic name.
    pub topic: String,
    /// Ingestion filter terms.
    pub track_terms: TrackTerms,
    /// Hand-off queue bound.
    pub queue_capacity: usize,
    /// Interval between ingestion completion checks while the queue is idle.
    pub done_check_interval: Duration,
    /// Largest accepted stream frame in bytes.
    pub max_frame_bytes: usize,
    /// Name the ingestion client reports (used in logs).
    pub client_name: String,
}

impl StreamConfig {
    #[must_use]
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            track_terms: TrackTerms::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            done_check_interval: DEFAULT_DONE_CHECK_INTERVAL,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        }
    }

    /// Builder-style method to set the queue capacity
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Builder-style method to set the track terms
    #[must_use]
    pub fn with_track_terms(mut self, terms: TrackTerms) -> Self {
        self.track_terms = terms;
        self
    }

    /// Builder-style method to set the completion check interval
    #[must_use]
    pub fn with_done_check_interval(mut self, interval: Duration) -> Self {
        self.done_check_interval = interval;
        self
    }

    /// The validated publish topic.
    pub fn publish_topic(&self) -> Result<Topic, ConfigError> {
        Ok(Topic::new(self.topic.clone())?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.publish_topic()?;

        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }

        if self.done_check_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "FB_DONE_CHECK_INTERVAL_MS",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.max_frame_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FB_MAX_FRAME_BYTES",
                reason: "must be greater than zero".to_string(),
            });
        }

        self.track_terms.validate()
    }
}

/// Ordered, de-duplicated set of ingestion filter terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTerms(Vec<String>);

impl TrackTerms {
    /// Build from individual terms. Terms are trimmed; duplicates keep
    /// their first position.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for term in terms {
            let term = term.as_ref().trim();
            if !out.iter().any(|t| t == term) {
                out.push(term.to_string());
            }
        }
        Self(out)
    }

    /// Parse a comma separated list, skipping empty entries.
    #[must_use]
    pub fn parse_list(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::trim).filter(|t| !t.is_empty()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.0.len() > MAX_TRACK_TERMS {
            return Err(ConfigError::TooManyTrackTerms {
                count: self.0.len(),
                max: MAX_TRACK_TERMS,
            });
        }
        for term in &self.0 {
            if term.is_empty() {
                return Err(ConfigError::InvalidTrackTerm {
                    term: term.clone(),
                    reason: "empty",
                });
            }
            if term.len() > MAX_TRACK_TERM_BYTES {
                return Err(ConfigError::InvalidTrackTerm {
                    term: term.clone(),
                    reason: "longer than 60 bytes",
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for TrackTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// Ingestion credentials. Opaque to the bridge.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub secret: String,
}

impl Credentials {
    #[must_use]
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        token: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: token.into(),
            secret: secret.into(),
        }
    }

    /// Whether all four parts are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.consumer_key,
            &self.consumer_secret,
            &self.token,
            &self.secret,
        ]
        .iter()
        .all(|part| !part.is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &redact(&self.consumer_secret))
            .field("token", &redact(&self.token))
            .field("secret", &redact(&self.secret))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_lookup(lookup(&[("FB_TOPIC", "tweets/raw")])).unwrap();
        assert_eq!(config.stream.topic, "tweets/raw");
        assert_eq!(config.stream.queue_capacity, 100_000);
        assert_eq!(config.stream.done_check_interval, Duration::from_millis(500));
        assert_eq!(config.stream.max_frame_bytes, 500_000);
        assert_eq!(config.stream.client_name, DEFAULT_CLIENT_NAME);
        assert!(config.stream.track_terms.is_empty());
        assert!(!config.credentials.is_complete());
    }

    #[test]
    fn test_missing_topic() {
        let err = BridgeConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("FB_TOPIC"));
    }

    #[test]
    fn test_full_environment() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("FB_TOPIC", "tweets/raw"),
            ("FB_TRACK_TERMS", "rust, tokio,,rust"),
            ("FB_QUEUE_CAPACITY", "10"),
            ("FB_DONE_CHECK_INTERVAL_MS", "50"),
            ("TWITTER_CONSUMER_KEY", "ck"),
            ("TWITTER_CONSUMER_SECRET", "cs"),
            ("TWITTER_TOKEN", "t"),
            ("TWITTER_SECRET", "s"),
        ]))
        .unwrap();

        assert_eq!(config.stream.queue_capacity, 10);
        assert_eq!(config.stream.done_check_interval, Duration::from_millis(50));
        assert_eq!(
            config.stream.track_terms.iter().collect::<Vec<_>>(),
            vec!["rust", "tokio"]
        );
        assert!(config.credentials.is_complete());
    }

    #[test]
    fn test_invalid_number() {
        let err = BridgeConfig::from_lookup(lookup(&[
            ("FB_TOPIC", "tweets/raw"),
            ("FB_QUEUE_CAPACITY", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "FB_QUEUE_CAPACITY",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = StreamConfig::for_topic("tweets/raw").with_queue_capacity(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroQueueCapacity));
    }

    #[test]
    fn test_wildcard_topic_rejected() {
        let config = StreamConfig::for_topic("tweets/>");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTopic(_))));
    }

    #[test]
    fn test_track_term_limits() {
        let long = "x".repeat(MAX_TRACK_TERM_BYTES + 1);
        assert!(matches!(
            TrackTerms::new([long.as_str()]).validate(),
            Err(ConfigError::InvalidTrackTerm { .. })
        ));

        let many: Vec<String> = (0..=MAX_TRACK_TERMS).map(|i| format!("t{i}")).collect();
        assert!(matches!(
            TrackTerms::new(&many).validate(),
            Err(ConfigError::TooManyTrackTerms { .. })
        ));

        assert!(matches!(
            TrackTerms::new([" "]).validate(),
            Err(ConfigError::InvalidTrackTerm { reason: "empty", .. })
        ));
    }

    #[test]
    fn test_track_terms_display() {
        assert_eq!(TrackTerms::parse_list("a,b , c").to_string(), "a,b,c");
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = Credentials::new("key", "very-secret", "tok", "");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("key"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("tok\""));
        assert!(rendered.contains("<unset>"));
    }
}
