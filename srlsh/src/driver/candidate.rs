//! Candidate-mode configuration transactions.
//!
//! A transaction is a guard holding `&mut Session`, so nothing else can
//! talk to the device while the candidate is open:
//! - [`CandidateSession::enter`] sends `enter candidate`
//! - `commit()`, `discard()`, `finalize()` and `leave()` consume the guard
//!   and always end with `quit`
//! - any failing step discards the candidate and quits before the error
//!   is returned, unless the channel is already gone
//!
//! # Example
//!
//! ```rust,no_run
//! use srlsh::{CandidateSession, SessionBuilder};
//!
//! # async fn example() -> Result<(), srlsh::Error> {
//! let mut session = SessionBuilder::new("leaf1")
//!     .username("admin")
//!     .password("NokiaSrl1!")
//!     .build()?;
//!
//! let mut txn = CandidateSession::enter(&mut session).await?;
//! txn.apply(&["set / system name host-name leaf1"]).await?;
//! let diff = txn.compute_diff().await?;
//! println!("{}", diff);
//! txn.finalize(&diff, true).await?;
//!
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use log::{debug, warn};

use super::classify::Classification;
use super::response::CommandResult;
use super::session::Session;
use crate::channel::{is_prompt_line, is_status_banner};
use crate::error::{ChannelError, DriverError, Error, Result, TransactionError};
use crate::transport::{Connector, SshConnector};

/// Diff lines that name one of these are treated as configuration changes
/// when the diff carries any `+` or `-`.
const CHANGE_DOMAINS: [&str; 4] = ["interface", "network-instance", "protocols", "system"];

/// Where a candidate transaction stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Candidate entered; statements may be sent.
    Entered,

    /// `commit now` succeeded.
    Committed,

    /// `discard now` sent.
    Discarded,

    /// Left without committing or discarding.
    Left,

    /// Torn down after a failed step.
    Aborted,
}

/// What [`CandidateSession::finalize`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub changed: bool,
    pub committed: bool,
}

/// Guard for one `enter candidate` ... `quit` transaction.
pub struct CandidateSession<'a, C: Connector = SshConnector> {
    session: &'a mut Session<C>,
    state: TransactionState,
    discard_on_abort: bool,
}

impl<'a, C: Connector> CandidateSession<'a, C> {
    /// Enter candidate mode.
    ///
    /// The device must acknowledge with a candidate banner. If it does
    /// not, no exit is sent and [`TransactionError::CandidateEntry`] is
    /// returned.
    pub async fn enter(session: &'a mut Session<C>) -> Result<Self> {
        debug!("{}: enter candidate", session.host());
        let response = session.execute_command("enter candidate").await?;

        if !response.response_text().to_lowercase().contains("candidate") {
            return Err(TransactionError::CandidateEntry {
                host: session.host().to_string(),
                output: response.response_text().trim().to_string(),
            }
            .into());
        }

        Ok(Self {
            session,
            state: TransactionState::Entered,
            discard_on_abort: true,
        })
    }

    /// Mark this visit as read-only: cleanup after a failed step only
    /// quits, leaving the shared candidate untouched.
    pub fn read_only(mut self) -> Self {
        self.discard_on_abort = false;
        self
    }

    /// Current transaction state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// The device address.
    pub fn host(&self) -> &str {
        self.session.host()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.state != TransactionState::Entered {
            return Err(DriverError::TransactionFinished {
                host: self.session.host().to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Run a command inside the candidate. A transport failure tears the
    /// transaction down.
    ///
    /// Never reconnects: a candidate does not survive its channel.
    pub async fn execute(&mut self, command: &str) -> Result<CommandResult> {
        self.ensure_active()?;
        match self.session.execute_connected(command).await {
            Ok(response) => Ok(response),
            Err(e) => {
                self.abandon().await;
                Err(e)
            }
        }
    }

    /// Send one statement and classify the response without acting on it.
    pub async fn send_statement(
        &mut self,
        statement: &str,
    ) -> Result<(CommandResult, Classification)> {
        let response = self.execute(statement.trim()).await?;
        let verdict = self.session.classifier().classify(&response.result);
        Ok((response, verdict))
    }

    /// Send statements in order, skipping blank ones.
    ///
    /// The first response that is not clean stops the batch: the rest are
    /// not sent, the candidate is discarded and left, and
    /// [`TransactionError::Rejected`] names the offending statement.
    pub async fn apply<S: AsRef<str>>(&mut self, statements: &[S]) -> Result<Vec<CommandResult>> {
        let mut responses = Vec::with_capacity(statements.len());

        for statement in statements {
            let statement = statement.as_ref().trim();
            if statement.is_empty() {
                continue;
            }

            let (response, verdict) = self.send_statement(statement).await?;
            if !verdict.is_ok() {
                debug!(
                    "{}: statement rejected ({:?}): {}",
                    self.host(),
                    verdict,
                    statement
                );
                self.abandon().await;
                return Err(TransactionError::Rejected {
                    host: self.host().to_string(),
                    statement: statement.to_string(),
                    output: response.result,
                }
                .into());
            }
            responses.push(response);
        }

        Ok(responses)
    }

    /// Ask the device what the candidate changes, cleaned of prompt noise.
    pub async fn compute_diff(&mut self) -> Result<String> {
        let response = self.execute("diff").await?;
        Ok(clean_diff(&response.cleaned_output))
    }

    /// Commit when `diff` shows changes and `commit` is requested,
    /// otherwise discard. Always leaves candidate mode.
    pub async fn finalize(mut self, diff: &str, commit: bool) -> Result<FinalizeOutcome> {
        let changed = has_changes(diff);
        debug!(
            "{}: finalize (changed: {}, commit requested: {})",
            self.host(),
            changed,
            commit
        );

        if changed && commit {
            let response = self.execute("commit now").await?;
            let verdict = self.session.classifier().classify_commit(&response.result);
            if !verdict.is_ok() {
                self.abandon().await;
                return Err(TransactionError::CommitFailed {
                    host: self.host().to_string(),
                    output: response.result,
                }
                .into());
            }
            self.exit(TransactionState::Committed).await?;
        } else {
            self.execute("discard now").await?;
            self.exit(TransactionState::Discarded).await?;
        }

        Ok(FinalizeOutcome {
            changed,
            committed: changed && commit,
        })
    }

    /// Compute the diff, then commit if it shows changes.
    pub async fn commit(mut self) -> Result<FinalizeOutcome> {
        let diff = self.compute_diff().await?;
        self.finalize(&diff, true).await
    }

    /// Discard the candidate and leave.
    pub async fn discard(mut self) -> Result<()> {
        self.execute("discard now").await?;
        self.exit(TransactionState::Discarded).await
    }

    /// Leave candidate mode without discarding. Used for read-only visits.
    pub async fn leave(mut self) -> Result<()> {
        self.ensure_active()?;
        self.exit(TransactionState::Left).await
    }

    /// Send `quit` and record the final state.
    ///
    /// A channel that closes in response to `quit` counts as a clean exit.
    async fn exit(&mut self, state: TransactionState) -> Result<()> {
        self.state = state;
        match self.session.execute_connected("quit").await {
            Ok(_) => Ok(()),
            Err(Error::Channel(ChannelError::Closed)) => {
                debug!("{}: channel closed on quit", self.host());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort discard and quit after a failure. Errors are logged,
    /// not returned.
    ///
    /// Nothing is sent once the channel has closed; the device dropped the
    /// candidate with it.
    async fn abandon(&mut self) {
        if self.state != TransactionState::Entered {
            return;
        }
        self.state = TransactionState::Aborted;

        if !self.session.is_connected() {
            debug!("{}: channel gone, skipping candidate cleanup", self.host());
            return;
        }
        if self.discard_on_abort {
            if let Err(e) = self.session.execute_connected("discard now").await {
                warn!("{}: discard during cleanup failed: {}", self.host(), e);
            }
            if !self.session.is_connected() {
                return;
            }
        }
        if let Err(e) = self.session.execute_connected("quit").await {
            if !matches!(e, Error::Channel(ChannelError::Closed)) {
                warn!("{}: quit during cleanup failed: {}", self.host(), e);
            }
        }
    }
}

impl<C: Connector> Drop for CandidateSession<'_, C> {
    fn drop(&mut self) {
        if self.state == TransactionState::Entered {
            warn!(
                "candidate transaction on {} dropped without commit/discard/leave",
                self.session.host()
            );
        }
    }
}

/// Strip prompt noise from `diff` output.
///
/// Drops status banners, `A:...#` prompt lines, the echoed `diff` and blank
/// lines. Residue with no alphanumeric or bracket characters is reported
/// as no diff at all.
pub fn clean_diff(output: &str) -> String {
    let kept: Vec<&str> = output
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !is_status_banner(line) && !is_prompt_line(line))
        .filter(|line| line.trim() != "diff" && !line.trim().is_empty())
        .collect();

    let cleaned = kept.join("\n").trim().to_string();
    if !cleaned
        .chars()
        .any(|c| c.is_alphanumeric() || matches!(c, '{' | '}' | '[' | ']'))
    {
        return String::new();
    }
    cleaned
}

/// Whether a cleaned diff describes a configuration change.
///
/// True when some line is a unary `+`/`-` line (not a `+++`/`---`
/// header), or when a line names one of the top-level domains while the
/// diff contains any `+` or `-` at all. The second rule is loose: a hyphen
/// inside `network-instance` is enough.
pub fn has_changes(diff: &str) -> bool {
    if diff.is_empty() {
        return false;
    }
    let any_marker = diff.contains('+') || diff.contains('-');

    diff.lines().any(|line| {
        let trimmed = line.trim();
        let unary = (trimmed.starts_with('+') || trimmed.starts_with('-'))
            && !trimmed.starts_with("+++")
            && !trimmed.starts_with("---");
        unary || (any_marker && CHANGE_DOMAINS.iter().any(|d| line.contains(d)))
    })
}
