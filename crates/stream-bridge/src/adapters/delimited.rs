//! Length-delimited stream framing.
//!
//! Each frame is a decimal byte count on its own line followed by exactly
//! that many bytes of UTF-8 payload:
//!
//! ```text
//! 17\r\n
//! {"text":"hello"}\r\n
//! \r\n              <- keep-alive, ignored
//! ```
//!
//! The byte count includes the payload's own trailing `\r\n`, which is
//! trimmed before the frame is returned.

use crate::error::IngestionError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Longest length line echoed back in an error.
const MAX_ECHOED_LINE: usize = 32;

/// Longest length line read before the frame is rejected. A `usize` has at
/// most 20 digits, leaving room for padding and the line terminator.
const MAX_LENGTH_LINE: usize = 32;

/// Reads length-delimited frames from an async buffered reader.
pub struct DelimitedFrameReader<R> {
    reader: R,
    line: String,
    max_frame_bytes: usize,
    frames_read: u64,
}

impl<R: AsyncBufRead + Unpin> DelimitedFrameReader<R> {
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader,
            line: String::new(),
            max_frame_bytes,
            frames_read: 0,
        }
    }

    /// Read the next frame, returning `None` on clean EOF.
    ///
    /// Keep-alive lines and frames that are empty after trimming are
    /// skipped.
    ///
    /// # Errors
    ///
    /// - `FrameTooLarge` when the declared size exceeds the limit
    /// - `MalformedFrame` for a non-numeric or overlong length line, or
    ///   invalid UTF-8
    /// - `Io` when the stream fails or ends inside a frame
    pub async fn next_frame(&mut self) -> Result<Option<String>, IngestionError> {
        loop {
            self.line.clear();
            let n = (&mut self.reader)
                .take(MAX_LENGTH_LINE as u64)
                .read_line(&mut self.line)
                .await?;
            if n == 0 {
                return Ok(None);
            }
            if n == MAX_LENGTH_LINE && !self.line.ends_with('\n') {
                let shown: String = self.line.chars().take(MAX_ECHOED_LINE).collect();
                return Err(IngestionError::MalformedFrame(format!(
                    "length line exceeds {MAX_LENGTH_LINE} bytes: '{shown}'"
                )));
            }

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let size: usize = trimmed.parse().map_err(|_| {
                let shown: String = trimmed.chars().take(MAX_ECHOED_LINE).collect();
                IngestionError::MalformedFrame(format!("invalid length line '{shown}'"))
            })?;
            if size > self.max_frame_bytes {
                return Err(IngestionError::FrameTooLarge {
                    size,
                    max: self.max_frame_bytes,
                });
            }

            let mut body = vec![0u8; size];
            self.reader.read_exact(&mut body).await?;
            let mut text = String::from_utf8(body)
                .map_err(|e| IngestionError::MalformedFrame(e.to_string()))?;

            let end = text.trim_end_matches(['\r', '\n']).len();
            text.truncate(end);
            if text.is_empty() {
                continue;
            }

            self.frames_read += 1;
            return Ok(Some(text));
        }
    }

    /// Frames returned so far.
    #[must_use]
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

/// Frame a payload in the format [`DelimitedFrameReader`] consumes.
#[must_use]
pub fn encode_frame(payload: &str) -> String {
    format!("{}\r\n{payload}\r\n", payload.len() + 2)
}
