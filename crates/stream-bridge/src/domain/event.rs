//! Pending events captured from the ingestion stream

use std::fmt;

/// One text payload captured at ingestion time, awaiting publish.
///
/// Immutable once created. Owned by the hand-off queue until dequeued.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingEvent(String);

impl PendingEvent {
    /// Capture a text payload.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The payload text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the event, returning its payload.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for PendingEvent {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for PendingEvent {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl fmt::Debug for PendingEvent {
    // Payloads can be large; show a bounded prefix.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 32;
        match self.0.char_indices().nth(PREVIEW) {
            Some((cut, _)) => write!(f, "PendingEvent({:?}… {} bytes)", &self.0[..cut], self.0.len()),
            None => write!(f, "PendingEvent({:?})", self.0),
        }
    }
}
