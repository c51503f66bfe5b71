//! # srlsh
//!
//! Async engine for driving the SR Linux interactive CLI over SSH.
//!
//! SR Linux exposes a human-oriented shell with no message framing. srlsh
//! turns it into a request/response protocol:
//!
//! - Async SSH connections via russh
//! - ANSI/control sequence normalization of PTY output
//! - Prompt-synchronized reads with a tail-only pattern search
//! - Candidate-mode transactions (enter, apply, diff, commit or discard, quit)
//! - Drift comparison between intended and running `set` statements
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use srlsh::SessionBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), srlsh::Error> {
//!     let mut session = SessionBuilder::new("172.20.20.2")
//!         .username("admin")
//!         .password("NokiaSrl1!")
//!         .build()?;
//!
//!     let result = session
//!         .send_config(&["set / interface ethernet-1/1 admin-state enable"], true)
//!         .await?;
//!     println!("changed: {}", result.changed);
//!
//!     session.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod drift;
pub mod driver;
pub mod error;
pub mod transport;
pub mod validate;

// Re-export main types for convenience
pub use drift::{DriftReport, StatementSet, compare, parse_intended};
pub use driver::{
    CandidateSession, CommandResult, ConfigFormat, ConfigResult, ConfigSource, KeywordClassifier,
    ResponseClassifier, Session, SessionBuilder,
};
pub use error::{Error, Result};
pub use transport::{AuthMethod, DeviceParams, HostKeyVerification, SshConfig};
pub use validate::{ValidationReport, validate_syntax};
