//! Result type for command execution.

use std::time::Duration;

use crate::channel::{PromptMatcher, is_status_banner, normalize};

/// Output of one command sent through a [`Session`](super::Session).
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The command that was executed.
    pub command: String,

    /// The command body: echo, trailing prompt and status banners removed.
    pub result: String,

    /// Normalized output including echo and prompt.
    pub cleaned_output: String,

    /// The raw output before normalization.
    pub raw_output: String,

    /// Whether the read ended on a prompt. `false` means the deadline
    /// elapsed and the output may be partial.
    pub prompt_matched: bool,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl CommandResult {
    /// Build a result from the raw bytes read after sending `command`.
    pub(crate) fn from_raw<M: PromptMatcher + ?Sized>(
        command: &str,
        raw: &[u8],
        prompt_matched: bool,
        elapsed: Duration,
        prompt: &M,
    ) -> Self {
        let cleaned_output = normalize(raw);
        let result = strip_echo_and_prompt(&cleaned_output, prompt);
        Self {
            command: command.to_string(),
            result,
            cleaned_output,
            raw_output: String::from_utf8_lossy(raw).into_owned(),
            prompt_matched,
            elapsed,
        }
    }

    /// Everything after the echoed command line, prompt included.
    ///
    /// Mode acknowledgements live in the prompt banner, so checks like
    /// "did we enter candidate mode" look here instead of at `result`.
    pub fn response_text(&self) -> &str {
        match self.cleaned_output.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        }
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }

    /// Whether the output ended on a prompt.
    pub fn is_complete(&self) -> bool {
        self.prompt_matched
    }
}

impl std::fmt::Display for CommandResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// Drop the echo line, a trailing prompt line and any status banners.
fn strip_echo_and_prompt<M: PromptMatcher + ?Sized>(cleaned: &str, prompt: &M) -> String {
    let mut lines: Vec<&str> = cleaned
        .split('\n')
        .skip(1)
        .map(|line| line.trim_end_matches('\r'))
        .collect();

    if lines.last().is_some_and(|last| prompt.is_match(last)) {
        lines.pop();
    }

    lines
        .into_iter()
        .filter(|line| !is_status_banner(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
