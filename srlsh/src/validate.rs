//! Offline syntax checks and the validation report.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static STATEMENT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(set|delete)\s+/").unwrap());

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    /// Malformed statement, found without a device.
    Syntax,

    /// The device rejected the statement.
    Validation,

    /// The statement refers to something the device does not have.
    Reference,

    /// The device could not be reached for reference checks.
    Connection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,

    /// 1-based line in the input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total_commands: usize,
    pub valid_commands: usize,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub summary: ValidationSummary,
}

impl ValidationReport {
    /// Build a report, deriving `valid` and the summary counts.
    pub fn new(
        total_commands: usize,
        errors: Vec<ValidationIssue>,
        warnings: Vec<ValidationIssue>,
    ) -> Self {
        Self {
            valid: errors.is_empty(),
            summary: ValidationSummary {
                total_commands,
                valid_commands: total_commands.saturating_sub(errors.len()),
                errors: errors.len(),
                warnings: warnings.len(),
            },
            errors,
            warnings,
        }
    }
}

/// Trimmed statements with their 1-based line numbers, skipping blank
/// lines and `#` comments.
pub fn numbered_commands<S: AsRef<str>>(lines: &[S]) -> Vec<(usize, String)> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| (i + 1, line.as_ref().trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| (n, line.to_string()))
        .collect()
}

/// Check that every statement is a `set` or `delete` with an absolute path.
pub fn validate_syntax<S: AsRef<str>>(lines: &[S]) -> Vec<ValidationIssue> {
    numbered_commands(lines)
        .into_iter()
        .filter_map(|(line, command)| {
            let message = if !command.starts_with("set ") && !command.starts_with("delete ") {
                "Command must start with \"set\" or \"delete\""
            } else if !STATEMENT_PATH.is_match(&command) {
                "Command must include a path starting with /"
            } else {
                return None;
            };
            Some(ValidationIssue {
                kind: IssueKind::Syntax,
                line: Some(line),
                command: Some(command),
                message: message.to_string(),
            })
        })
        .collect()
}
