//! Prompt-synchronized reads over an unframed shell.
//!
//! The shell gives no message boundaries, so a response is considered
//! complete when the normalized tail of the buffer looks like a prompt.
//! This is a heuristic: output that itself ends a line with `#` or `>`
//! can end a read early.

use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::patterns::PromptMatcher;
use crate::error::Result;
use crate::transport::Shell;

/// Poll cadence and tail window for prompt detection.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Sleep between polls when no prompt has been seen yet.
    pub poll_interval: Duration,

    /// Bytes from the end of the buffer searched for the prompt.
    pub search_depth: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            search_depth: 1000,
        }
    }
}

/// Result of a read operation.
#[derive(Debug)]
pub struct ReadOutcome {
    /// Raw bytes received, escape sequences included.
    pub data: Bytes,

    /// Whether the read ended on a prompt rather than the deadline.
    pub prompt_matched: bool,

    /// Time spent reading.
    pub elapsed: Duration,
}

impl ReadOutcome {
    /// Get the data as a string (lossy UTF-8).
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Drains a shell until a prompt appears or a deadline passes.
#[derive(Debug, Clone, Default)]
pub struct PromptReader {
    config: ReaderConfig,
}

impl PromptReader {
    /// Create a reader with the given polling settings.
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read until `matcher` accepts the buffer tail or `timeout` elapses.
    ///
    /// A deadline is not an error: whatever arrived is returned with
    /// `prompt_matched == false`. A channel that closes before a prompt
    /// was seen is an error.
    pub async fn read_until_prompt<S, M>(
        &self,
        shell: &mut S,
        matcher: &M,
        timeout: Duration,
    ) -> Result<ReadOutcome>
    where
        S: Shell + ?Sized,
        M: PromptMatcher + ?Sized,
    {
        let start = Instant::now();
        let deadline = start + timeout;
        let mut buffer = PatternBuffer::new(self.config.search_depth);

        loop {
            let drained = drain(shell, &mut buffer);

            if buffer.tail_matches(matcher) {
                return Ok(ReadOutcome {
                    data: buffer.take(),
                    prompt_matched: true,
                    elapsed: start.elapsed(),
                });
            }

            // Closed channel without a prompt: surface the transport failure.
            drained?;

            if Instant::now() >= deadline {
                debug!(
                    "no prompt after {:?}, returning {} partial bytes",
                    timeout,
                    buffer.len()
                );
                return Ok(ReadOutcome {
                    data: buffer.take(),
                    prompt_matched: false,
                    elapsed: start.elapsed(),
                });
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

/// Move every chunk the shell has ready into the buffer.
fn drain<S: Shell + ?Sized>(shell: &mut S, buffer: &mut PatternBuffer) -> Result<()> {
    while let Some(chunk) = shell.try_read()? {
        trace!("read chunk: {} bytes, buffer: {} bytes", chunk.len(), buffer.len());
        buffer.extend(&chunk);
    }
    Ok(())
}
