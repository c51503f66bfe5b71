//! Drift between intended `set` statements and what a device reports.
//!
//! Statements are compared as opaque lines. Two statements that configure
//! the same thing with different spelling count as different.

use std::collections::BTreeSet;

use serde::Serialize;

/// Sorted, deduplicated set of `set ` statements.
///
/// Lines are trimmed and runs of whitespace outside double quotes are
/// collapsed to one space. Anything not starting with `set ` is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementSet(BTreeSet<String>);

impl StatementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line if it is a `set` statement. Returns whether it was new.
    pub fn insert(&mut self, line: &str) -> bool {
        let line = line.trim();
        if !line.starts_with("set ") {
            return false;
        }
        self.0.insert(normalize_statement(line))
    }

    /// Whether the normalized form of `statement` is present.
    pub fn contains(&self, statement: &str) -> bool {
        self.0.contains(&normalize_statement(statement.trim()))
    }

    /// Number of distinct statements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no statements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Statements in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Statements in `self` but not in `other`, sorted.
    pub fn difference(&self, other: &StatementSet) -> Vec<String> {
        self.0.difference(&other.0).cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for StatementSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for line in iter {
            set.insert(line.as_ref());
        }
        set
    }
}

/// Collapse whitespace runs outside double-quoted strings.
fn normalize_statement(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quoted = false;
    let mut pending_space = false;

    for c in line.chars() {
        if !quoted && c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if c == '"' {
            quoted = !quoted;
        }
        out.push(c);
    }
    out
}

/// Result of comparing intended and observed configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    /// Intended statements the device does not have.
    pub missing: Vec<String>,

    /// Device statements that are not intended.
    pub extra: Vec<String>,

    pub has_drift: bool,

    /// `+ ` lines for missing, then `- ` lines for extra.
    pub diff: String,
}

/// Compare intended statements with observed ones.
pub fn compare<I, O>(intended: I, observed: O) -> DriftReport
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    O: IntoIterator,
    O::Item: AsRef<str>,
{
    let intended: StatementSet = intended.into_iter().collect();
    let observed: StatementSet = observed.into_iter().collect();

    let missing = intended.difference(&observed);
    let extra = observed.difference(&intended);

    let diff = missing
        .iter()
        .map(|s| format!("+ {}", s))
        .chain(extra.iter().map(|s| format!("- {}", s)))
        .collect::<Vec<_>>()
        .join("\n");

    DriftReport {
        has_drift: !missing.is_empty() || !extra.is_empty(),
        missing,
        extra,
        diff,
    }
}

/// Read an intended-configuration file: trimmed, non-blank lines that are
/// not `#` comments.
pub fn parse_intended(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
