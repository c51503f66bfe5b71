//! Heuristic classification of device responses.
//!
//! SR Linux reports problems as free text, so errors are recognized by
//! keyword. Device messages that use other wording are missed; swap in
//! a stricter [`ResponseClassifier`] when a software release needs it.

/// How the device reacted to one statement or commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No problem markers found.
    Ok,

    /// The statement refers to something that does not exist yet.
    ReferenceWarning { marker: String },

    /// The device refused the statement or commit.
    Rejected { marker: String },
}

impl Classification {
    /// Whether the response was clean.
    pub fn is_ok(&self) -> bool {
        matches!(self, Classification::Ok)
    }
}

/// Maps response text to a [`Classification`].
pub trait ResponseClassifier: Send + Sync {
    /// Classify the response to a configuration statement.
    fn classify(&self, output: &str) -> Classification;

    /// Classify the response to `commit now`.
    fn classify_commit(&self, output: &str) -> Classification;
}

/// Case-insensitive substring matching against fixed vocabularies.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    reference_markers: Vec<String>,
    rejection_markers: Vec<String>,
    commit_failure_markers: Vec<String>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self {
            reference_markers: vec!["not found".into(), "does not exist".into()],
            rejection_markers: vec!["error".into(), "invalid".into()],
            commit_failure_markers: vec!["error".into(), "failed".into()],
        }
    }
}

impl KeywordClassifier {
    /// Classifier with the SR Linux marker vocabularies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker that flags a dangling reference.
    pub fn with_reference_marker(mut self, marker: impl Into<String>) -> Self {
        self.reference_markers.push(marker.into().to_lowercase());
        self
    }

    /// Add a marker that flags a rejected statement.
    pub fn with_rejection_marker(mut self, marker: impl Into<String>) -> Self {
        self.rejection_markers.push(marker.into().to_lowercase());
        self
    }

    /// Add a marker that flags a failed commit.
    pub fn with_commit_failure_marker(mut self, marker: impl Into<String>) -> Self {
        self.commit_failure_markers.push(marker.into().to_lowercase());
        self
    }
}

fn first_marker<'a>(haystack: &str, markers: &'a [String]) -> Option<&'a String> {
    markers.iter().find(|m| haystack.contains(m.as_str()))
}

impl ResponseClassifier for KeywordClassifier {
    fn classify(&self, output: &str) -> Classification {
        let lowered = output.to_lowercase();

        // Reference markers win so "Error: ... does not exist" reads as a
        // dangling reference rather than a generic rejection.
        if let Some(marker) = first_marker(&lowered, &self.reference_markers) {
            return Classification::ReferenceWarning {
                marker: marker.clone(),
            };
        }
        if let Some(marker) = first_marker(&lowered, &self.rejection_markers) {
            return Classification::Rejected {
                marker: marker.clone(),
            };
        }
        Classification::Ok
    }

    fn classify_commit(&self, output: &str) -> Classification {
        let lowered = output.to_lowercase();
        match first_marker(&lowered, &self.commit_failure_markers) {
            Some(marker) => Classification::Rejected {
                marker: marker.clone(),
            },
            None => Classification::Ok,
        }
    }
}
