//! Channel layer: output normalization and prompt-synchronized reads.
//!
//! Turns the raw, unframed byte stream of an interactive shell into
//! complete responses by waiting for the device prompt.

mod buffer;
mod normalize;
mod patterns;
mod reader;

pub use buffer::PatternBuffer;
pub use normalize::normalize;
pub use patterns::{
    CompiledPrompt, DEFAULT_PROMPT_PATTERN, PromptMatcher, compile_prompt_pattern,
    is_prompt_line, is_status_banner,
};
pub use reader::{PromptReader, ReadOutcome, ReaderConfig};
