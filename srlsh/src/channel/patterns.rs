//! Pattern matching utilities for prompt detection.

use std::sync::LazyLock;

use regex::Regex;

/// Default completion signal: the buffer ends in `#` or `>`.
pub const DEFAULT_PROMPT_PATTERN: &str = r"[#>]\s*$";

/// SR Linux status line printed above every prompt, e.g.
/// `--{ + candidate shared default }--[ interface ethernet-1/1 ]--`.
static STATUS_BANNER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^--\{.*\}--").unwrap());

/// The `A:<host>#` prompt line itself.
static PROMPT_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^A:.*#").unwrap());

/// Decides whether accumulated output ends with a complete response.
///
/// Regex by default; swap in a custom implementation for devices whose
/// prompts a regex describes poorly.
pub trait PromptMatcher: Send + Sync {
    /// Returns the byte offset where the match starts, or None.
    fn find_match(&self, text: &str) -> Option<usize>;

    /// Check if the text ends with a prompt.
    fn is_match(&self, text: &str) -> bool {
        self.find_match(text).is_some()
    }
}

/// Regex-based prompt matcher (the default implementation).
impl PromptMatcher for Regex {
    fn find_match(&self, text: &str) -> Option<usize> {
        self.find(text).map(|m| m.start())
    }
}

/// A compiled prompt pattern with optional negative matches.
#[derive(Debug, Clone)]
pub struct CompiledPrompt {
    /// The main pattern to match.
    pattern: Regex,

    /// Substrings that must NOT be present in the tested text.
    not_contains: Vec<String>,
}

impl CompiledPrompt {
    /// Create a new compiled prompt, anchoring it at end of buffer.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: compile_prompt_pattern(pattern)?,
            not_contains: Vec::new(),
        })
    }

    /// Create a compiled prompt with negative patterns.
    pub fn with_not_contains(pattern: &str, not_contains: Vec<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: compile_prompt_pattern(pattern)?,
            not_contains,
        })
    }

    /// Get a reference to the underlying regex.
    pub fn regex(&self) -> &Regex {
        &self.pattern
    }
}

impl Default for CompiledPrompt {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_PROMPT_PATTERN).unwrap(),
            not_contains: Vec::new(),
        }
    }
}

impl PromptMatcher for CompiledPrompt {
    fn find_match(&self, text: &str) -> Option<usize> {
        if self.not_contains.iter().any(|nc| text.contains(nc.as_str())) {
            return None;
        }
        self.pattern.find(text).map(|m| m.start())
    }
}

/// Compile a prompt pattern string into a regex.
///
/// Anchors to end of buffer unless the pattern already ends with `$`.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let pattern = if pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("{}\\s*$", pattern)
    };

    Regex::new(&pattern)
}

/// Whether a line is the bracketed `--{ ... }--` status banner.
pub fn is_status_banner(line: &str) -> bool {
    STATUS_BANNER.is_match(line)
}

/// Whether a line is an `A:<host>#` prompt line.
pub fn is_prompt_line(line: &str) -> bool {
    PROMPT_LINE.is_match(line)
}
