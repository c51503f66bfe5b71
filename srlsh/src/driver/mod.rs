//! High-level session API.
//!
//! [`Session`] runs commands over a prompt-synchronized shell;
//! [`CandidateSession`] wraps configuration changes in an
//! `enter candidate` ... `quit` transaction.

mod builder;
pub mod candidate;
pub mod classify;
pub(crate) mod response;
mod session;

pub use builder::SessionBuilder;
pub use candidate::{CandidateSession, FinalizeOutcome, TransactionState, clean_diff, has_changes};
pub use classify::{Classification, KeywordClassifier, ResponseClassifier};
pub use response::CommandResult;
pub use session::{ConfigFormat, ConfigResult, ConfigSource, Session};
