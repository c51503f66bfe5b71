//! Raw output buffer with tail-only prompt search.
//!
//! Raw bytes are kept untouched so the full response can be normalized
//! once at the end. Prompt checks only normalize and search the last
//! `search_depth` bytes, which keeps each poll cheap on large outputs
//! (full `info flat` dumps).

use bytes::{Bytes, BytesMut};

use super::normalize::normalize;
use super::patterns::PromptMatcher;

/// Buffer for accumulating raw shell output.
#[derive(Debug)]
pub struct PatternBuffer {
    /// The accumulated raw output.
    buffer: BytesMut,

    /// How many bytes from the end to search for prompts.
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
        }
    }

    /// Append a raw chunk.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Normalized text of the last `search_depth` raw bytes.
    ///
    /// The window may open in the middle of an escape sequence; any
    /// leftover fragment sits at the start, away from the prompt.
    pub fn tail_text(&self) -> String {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        normalize(&self.buffer[start..])
    }

    /// Check if the normalized tail ends with a prompt.
    pub fn tail_matches<M: PromptMatcher + ?Sized>(&self, matcher: &M) -> bool {
        !self.buffer.is_empty() && matcher.is_match(&self.tail_text())
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the search depth setting.
    pub fn search_depth(&self) -> usize {
        self.search_depth
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
