//! One interactive CLI conversation with an SR Linux device.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use serde::Serialize;

use super::candidate::CandidateSession;
use super::classify::{Classification, ResponseClassifier};
use super::response::CommandResult;
use crate::channel::{PromptMatcher, PromptReader, is_prompt_line, is_status_banner};
use crate::drift::{self, DriftReport};
use crate::error::{ChannelError, DriverError, Error, Result, TransportError};
use crate::transport::{Connector, Shell, SshConfig, SshConnector};
use crate::validate::{self, IssueKind, ValidationIssue, ValidationReport};

/// Which datastore `get_config` reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// The active configuration.
    #[default]
    Running,

    /// The shared candidate, read without discarding it.
    Candidate,
}

/// Output format of `info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// One `set` statement per line (`info flat`).
    #[default]
    Flat,

    /// `info json`.
    Json,

    /// Indented tree (`info`).
    Hierarchical,
}

impl ConfigFormat {
    /// The `info` command for this format, optionally scoped to `path`.
    pub fn command(self, path: Option<&str>) -> String {
        let base = match self {
            ConfigFormat::Flat => "info flat",
            ConfigFormat::Json => "info json",
            ConfigFormat::Hierarchical => "info",
        };
        match path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => format!("{} {}", base, path),
            None => base.to_string(),
        }
    }
}

/// Outcome of [`Session::send_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigResult {
    /// The candidate differed from running after applying the batch.
    pub changed: bool,

    /// `commit now` was sent and succeeded.
    pub committed: bool,

    /// Statements sent, in order.
    pub commands: Vec<String>,

    /// Cleaned `diff` output; empty when nothing changed.
    pub diff: String,
}

/// A prompt-synchronized CLI session.
///
/// Commands are strictly sequential: every method that talks to the
/// device takes `&mut self`. Release the session with
/// [`disconnect`](Self::disconnect) when done.
pub struct Session<C: Connector = SshConnector> {
    config: SshConfig,
    connector: C,
    shell: Option<C::Shell>,
    reader: PromptReader,
    prompt: Arc<dyn PromptMatcher>,
    classifier: Arc<dyn ResponseClassifier>,
    command_timeout: Duration,
    require_prompt: bool,
}

impl<C: Connector> Session<C> {
    pub(crate) fn new(
        config: SshConfig,
        connector: C,
        reader: PromptReader,
        prompt: Arc<dyn PromptMatcher>,
        classifier: Arc<dyn ResponseClassifier>,
        command_timeout: Duration,
        require_prompt: bool,
    ) -> Self {
        Self {
            config,
            connector,
            shell: None,
            reader,
            prompt,
            classifier,
            command_timeout,
            require_prompt,
        }
    }

    /// The device address, as used in error messages.
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Connection settings this session was built with.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// How long a command waits for the prompt.
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Change the prompt wait for subsequent commands.
    pub fn set_command_timeout(&mut self, timeout: Duration) {
        self.command_timeout = timeout;
    }

    /// Whether a shell is currently open.
    pub fn is_connected(&self) -> bool {
        self.shell.is_some()
    }

    pub(crate) fn classifier(&self) -> &dyn ResponseClassifier {
        &*self.classifier
    }

    /// Open the connection and shell. No-op when already connected.
    ///
    /// The login banner and first prompt are read and discarded.
    pub async fn connect(&mut self) -> Result<()> {
        if self.shell.is_some() {
            return Ok(());
        }

        debug!("connecting to {}", self.config.socket_addr());
        let mut shell = self
            .connector
            .connect(&self.config)
            .await
            .map_err(|e| connection_failed(&self.config.host, e))?;

        let banner = match self
            .reader
            .read_until_prompt(&mut shell, &*self.prompt, self.command_timeout)
            .await
        {
            Ok(banner) => banner,
            Err(e) => {
                if let Err(close_err) = shell.close().await {
                    warn!("close after failed login on {}: {}", self.config.host, close_err);
                }
                return Err(connection_failed(&self.config.host, e));
            }
        };

        if !banner.prompt_matched {
            debug!(
                "no prompt in login banner from {} ({} bytes)",
                self.config.host,
                banner.data.len()
            );
        }

        self.shell = Some(shell);
        debug!("connected to {}", self.config.host);
        Ok(())
    }

    /// Close the shell and connection. Safe when never connected.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut shell) = self.shell.take() {
            debug!("disconnecting from {}", self.config.host);
            shell.close().await?;
        }
        Ok(())
    }

    /// Forget a shell whose channel already closed.
    async fn release(&mut self) {
        if let Some(mut shell) = self.shell.take() {
            debug!("channel to {} closed, releasing session", self.config.host);
            if let Err(e) = shell.close().await {
                trace!("close of dead shell failed: {}", e);
            }
        }
    }

    /// Send one command and read its output up to the next prompt.
    ///
    /// Connects first if needed. Errors the device prints stay in the
    /// result text; only transport failures (and a missing prompt when
    /// `require_prompt` is set) are returned as errors.
    pub async fn execute_command(&mut self, command: &str) -> Result<CommandResult> {
        self.connect().await?;
        self.execute_connected(command).await
    }

    /// Like [`execute_command`](Self::execute_command), but never opens a
    /// connection. Fails with [`TransportError::Disconnected`] when no
    /// shell is open.
    pub(crate) async fn execute_connected(&mut self, command: &str) -> Result<CommandResult> {
        let result = self.exchange(command).await;
        if let Err(Error::Channel(ChannelError::Closed)) = &result {
            self.release().await;
        }
        result
    }

    async fn exchange(&mut self, command: &str) -> Result<CommandResult> {
        let Some(shell) = self.shell.as_mut() else {
            return Err(TransportError::Disconnected.into());
        };

        trace!("{} <- {:?}", self.config.host, command);
        shell.send(format!("{}\n", command).as_bytes()).await?;

        let outcome = self
            .reader
            .read_until_prompt(shell, &*self.prompt, self.command_timeout)
            .await?;

        if !outcome.prompt_matched {
            if self.require_prompt {
                return Err(DriverError::ReadTimeout {
                    host: self.config.host.clone(),
                    command: command.to_string(),
                    timeout: self.command_timeout,
                }
                .into());
            }
            warn!(
                "{}: no prompt after '{}' within {:?}, output may be partial",
                self.config.host, command, self.command_timeout
            );
        }

        Ok(CommandResult::from_raw(
            command,
            &outcome.data,
            outcome.prompt_matched,
            outcome.elapsed,
            &*self.prompt,
        ))
    }

    /// Run commands one after another, stopping at the first error.
    pub async fn execute_commands<S: AsRef<str>>(
        &mut self,
        commands: &[S],
    ) -> Result<Vec<CommandResult>> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.execute_command(command.as_ref()).await?);
        }
        Ok(results)
    }

    /// Retrieve configuration as text.
    ///
    /// Status banners, prompt lines and blank lines are removed.
    pub async fn get_config(
        &mut self,
        source: ConfigSource,
        format: ConfigFormat,
        path: Option<&str>,
    ) -> Result<String> {
        let command = format.command(path);

        let response = match source {
            ConfigSource::Running => self.execute_command(&command).await?,
            ConfigSource::Candidate => {
                let mut txn = CandidateSession::enter(self).await?.read_only();
                let response = txn.execute(&command).await?;
                txn.leave().await?;
                response
            }
        };

        Ok(config_lines(&response.result))
    }

    /// Apply `statements` in a candidate transaction, commit if anything
    /// changed and `commit` is set, otherwise discard.
    pub async fn send_config<S: AsRef<str>>(
        &mut self,
        statements: &[S],
        commit: bool,
    ) -> Result<ConfigResult> {
        self.connect().await?;

        let commands = non_blank(statements);
        if commands.is_empty() {
            return Ok(ConfigResult::default());
        }

        let mut txn = CandidateSession::enter(self).await?;
        txn.apply(&commands).await?;
        let diff = txn.compute_diff().await?;
        let outcome = txn.finalize(&diff, commit).await?;

        Ok(ConfigResult {
            changed: outcome.changed,
            committed: outcome.committed,
            commands,
            diff,
        })
    }

    /// Show what `statements` would change, then discard them.
    pub async fn check_config_diff<S: AsRef<str>>(&mut self, statements: &[S]) -> Result<String> {
        let mut txn = CandidateSession::enter(self).await?;
        txn.apply(statements).await?;
        let diff = txn.compute_diff().await?;
        txn.discard().await?;
        Ok(diff)
    }

    /// Compare intended `set` statements with `info flat <path>` from the
    /// running configuration. `path` defaults to `/`.
    pub async fn compare_running<S: AsRef<str>>(
        &mut self,
        intended: &[S],
        path: Option<&str>,
    ) -> Result<DriftReport> {
        let observed = self
            .get_config(
                ConfigSource::Running,
                ConfigFormat::Flat,
                Some(path.unwrap_or("/")),
            )
            .await?;

        Ok(drift::compare(intended, observed.lines()))
    }

    /// Check statements for syntax and, optionally, against the device.
    ///
    /// Device checks apply every statement in a candidate transaction that
    /// is always discarded. Connection trouble is reported as a warning,
    /// never as an error.
    pub async fn validate_config<S: AsRef<str>>(
        &mut self,
        statements: &[S],
        check_references: bool,
    ) -> ValidationReport {
        let commands = validate::numbered_commands(statements);
        let mut errors = validate::validate_syntax(statements);
        let mut warnings = Vec::new();

        if check_references && !commands.is_empty() {
            if let Err(e) = self
                .check_against_device(&commands, &mut errors, &mut warnings)
                .await
            {
                debug!("{}: reference check aborted: {}", self.config.host, e);
                warnings.push(ValidationIssue {
                    kind: IssueKind::Connection,
                    line: None,
                    command: None,
                    message: format!("Could not validate references: {}", e),
                });
            }
        }

        ValidationReport::new(commands.len(), errors, warnings)
    }

    async fn check_against_device(
        &mut self,
        commands: &[(usize, String)],
        errors: &mut Vec<ValidationIssue>,
        warnings: &mut Vec<ValidationIssue>,
    ) -> Result<()> {
        let mut txn = CandidateSession::enter(self).await?;

        for (line, command) in commands {
            let (response, verdict) = txn.send_statement(command).await?;
            let issue = |kind| ValidationIssue {
                kind,
                line: Some(*line),
                command: Some(command.clone()),
                message: response.result.clone(),
            };
            match verdict {
                Classification::Ok => {}
                Classification::ReferenceWarning { .. } => {
                    warnings.push(issue(IssueKind::Reference))
                }
                Classification::Rejected { .. } => errors.push(issue(IssueKind::Validation)),
            }
        }

        txn.discard().await
    }
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        if self.shell.is_some() {
            warn!(
                "session to {} dropped while connected; call disconnect()",
                self.config.host
            );
        }
    }
}

fn connection_failed(host: &str, source: Error) -> Error {
    DriverError::ConnectionFailed {
        host: host.to_string(),
        source: Box::new(source),
    }
    .into()
}

fn non_blank<S: AsRef<str>>(statements: &[S]) -> Vec<String> {
    statements
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn config_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_end())
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !is_status_banner(line) && !is_prompt_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SessionBuilder;
    use crate::error::TransactionError;
    use crate::transport::mock::{MockConnector, MockDevice};
    use tokio_test::{assert_err, assert_ok};

    const BOGUS: &str = "set / interface ethernet-1/1 bogus-opt enable";
    const ADMIN_UP: &str = "set / interface ethernet-1/1 admin-state enable";
    const DIFF_ADMIN_UP: &str = "      interface ethernet-1/1 {\n+         admin-state enable\n      }";

    fn session(device: &MockDevice) -> Session<MockConnector> {
        let _ = env_logger::builder().is_test(true).try_init();
        SessionBuilder::new("srl1")
            .username("admin")
            .danger_disable_host_key_verification()
            .build_with(device.connector())
            .unwrap()
    }

    /// Commands sent after `after`, exclusive.
    fn sent_after(device: &MockDevice, after: &str) -> Vec<String> {
        let sent = device.sent();
        let pos = sent.iter().position(|c| c == after).unwrap();
        sent[pos + 1..].to_vec()
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_is_idempotent() {
        let device = MockDevice::new();
        let mut s = session(&device);

        assert_ok!(s.connect().await);
        assert_ok!(s.connect().await);
        assert_eq!(device.connects(), 1);
        assert!(s.is_connected());

        assert_ok!(s.disconnect().await);
        assert_ok!(s.disconnect().await);
        assert_eq!(device.closes(), 1);
        assert!(!s.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_without_connect() {
        let device = MockDevice::new();
        let mut s = session(&device);
        assert_ok!(s.disconnect().await);
        assert_eq!(device.closes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_is_connection_error() {
        let device = MockDevice::new().fail_auth();
        let mut s = session(&device);

        let err = s.execute_command("show version").await.unwrap_err();
        match err {
            Error::Driver(DriverError::ConnectionFailed { host, source }) => {
                assert_eq!(host, "srl1");
                assert!(matches!(
                    *source,
                    Error::Transport(TransportError::AuthenticationFailed { .. })
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!s.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_command_auto_connects_and_strips() {
        let device = MockDevice::new()
            .colored()
            .chunked(5)
            .reply("show version", "Hostname          : srl1\nSoftware Version  : v24.10.1");
        let mut s = session(&device);

        let r = s.execute_command("show version").await.unwrap();
        assert_eq!(device.connects(), 1);
        assert!(r.prompt_matched);
        assert_eq!(
            r.result,
            "Hostname          : srl1\nSoftware Version  : v24.10.1"
        );
        assert!(!r.result.contains("--{"));

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_error_is_text_not_failure() {
        let device = MockDevice::new().reply("show versoin", "Error: Unknown token 'versoin'");
        let mut s = session(&device);

        let r = s.execute_command("show versoin").await.unwrap();
        assert!(r.contains("Unknown token"));

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_read_returned_at_deadline() {
        let device = MockDevice::new().stall("show system logging", "line one");
        let mut s = session(&device);

        let r = s.execute_command("show system logging").await.unwrap();
        assert!(!r.prompt_matched);
        assert_eq!(r.result, "line one");
        assert!(r.elapsed >= Duration::from_secs(30));

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_require_prompt_turns_deadline_into_error() {
        let device = MockDevice::new().stall("show system logging", "line one");
        let mut s = SessionBuilder::new("srl1")
            .username("admin")
            .require_prompt(true)
            .command_timeout(Duration::from_secs(2))
            .build_with(device.connector())
            .unwrap();

        let err = s.execute_command("show system logging").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Driver(DriverError::ReadTimeout { ref command, .. }) if command == "show system logging"
        ));

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_commands_in_order() {
        let device = MockDevice::new()
            .reply("show version", "v24.10.1")
            .reply("show interface brief", "ethernet-1/1 up");
        let mut s = session(&device);

        let results = s
            .execute_commands(&["show version", "show interface brief"])
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].result, "ethernet-1/1 up");
        assert_eq!(device.sent(), vec!["show version", "show interface brief"]);

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_config_commits_changes() {
        let device = MockDevice::new()
            .reply("diff", DIFF_ADMIN_UP)
            .reply("commit now", "All changes have been committed. Leaving candidate mode.");
        let mut s = session(&device);

        let result = s.send_config(&[ADMIN_UP], true).await.unwrap();
        assert!(result.changed);
        assert!(result.committed);
        assert_eq!(result.commands, vec![ADMIN_UP]);
        assert!(result.diff.contains("+         admin-state enable"));
        assert_eq!(
            device.sent(),
            vec!["enter candidate", ADMIN_UP, "diff", "commit now", "quit"]
        );
        assert!(!device.in_candidate());

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_config_without_commit_discards() {
        let device = MockDevice::new().reply("diff", DIFF_ADMIN_UP);
        let mut s = session(&device);

        let result = s.send_config(&[ADMIN_UP], false).await.unwrap();
        assert!(result.changed);
        assert!(!result.committed);
        assert_eq!(device.count("commit now"), 0);
        assert_eq!(sent_after(&device, "diff"), vec!["discard now", "quit"]);

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_banner_only_diff_is_not_committed() {
        // The device prints nothing for `diff`; the response is the echo and
        // the status banner.
        let device = MockDevice::new();
        let mut s = session(&device);

        let result = s.send_config(&[ADMIN_UP], true).await.unwrap();
        assert!(!result.changed);
        assert!(!result.committed);
        assert_eq!(result.diff, "");
        assert_eq!(device.count("commit now"), 0);
        assert_eq!(sent_after(&device, "diff"), vec!["discard now", "quit"]);

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_statement_aborts_batch() {
        let device = MockDevice::new().reply(BOGUS, "Error: invalid option 'bogus-opt'");
        let mut s = session(&device);

        let statements = [
            BOGUS,
            "set / interface ethernet-1/2 admin-state enable",
            "set / interface ethernet-1/3 admin-state enable",
        ];
        let err = s.send_config(&statements, true).await.unwrap_err();

        match err {
            Error::Transaction(TransactionError::Rejected {
                host,
                statement,
                output,
            }) => {
                assert_eq!(host, "srl1");
                assert_eq!(statement, BOGUS);
                assert!(output.contains("bogus-opt"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(sent_after(&device, BOGUS), vec!["discard now", "quit"]);
        assert_eq!(device.count("commit now"), 0);
        assert!(!device.in_candidate());

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_failure_discards_and_exits() {
        let device = MockDevice::new()
            .reply("diff", DIFF_ADMIN_UP)
            .reply("commit now", "Error: commit failed: validation error");
        let mut s = session(&device);

        let err = s.send_config(&[ADMIN_UP], true).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::CommitFailed { .. })
        ));
        assert_eq!(sent_after(&device, "commit now"), vec!["discard now", "quit"]);

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_candidate_entry_failure_sends_no_exit() {
        let device = MockDevice::new().refuse_candidate();
        let mut s = session(&device);

        let err = assert_err!(s.send_config(&[ADMIN_UP], true).await);
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::CandidateEntry { .. })
        ));
        assert_eq!(device.sent(), vec!["enter candidate"]);

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_skips_candidate() {
        let device = MockDevice::new();
        let mut s = session(&device);

        let result = s.send_config(&["", "   "], true).await.unwrap();
        assert_eq!(result, ConfigResult::default());
        assert!(device.sent().is_empty());
        assert!(s.is_connected());

        s.disconnect().await.unwrap();
    }

    fn outcome(result: &Result<ConfigResult>) -> &'static str {
        match result {
            Ok(r) if r.committed => "committed",
            Ok(r) if r.changed => "discarded",
            Ok(_) => "unchanged",
            Err(Error::Transaction(TransactionError::Rejected { .. })) => "rejected",
            Err(Error::Transaction(TransactionError::CommitFailed { .. })) => "commit failed",
            Err(_) => "other error",
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_and_exit_balance() {
        // Every outcome of apply leaves the device back in running mode with
        // one quit per enter.
        let cases: Vec<(MockDevice, Vec<&str>, bool, &str)> = vec![
            (MockDevice::new(), vec![ADMIN_UP], true, "unchanged"),
            (
                MockDevice::new().reply("diff", DIFF_ADMIN_UP),
                vec![ADMIN_UP],
                true,
                "committed",
            ),
            (
                MockDevice::new().reply("diff", DIFF_ADMIN_UP),
                vec![ADMIN_UP],
                false,
                "discarded",
            ),
            (
                MockDevice::new().reply(BOGUS, "Error: invalid option"),
                vec![ADMIN_UP, BOGUS, ADMIN_UP],
                true,
                "rejected",
            ),
            (
                MockDevice::new().reply(ADMIN_UP, "Error: path does not exist"),
                vec![ADMIN_UP],
                true,
                "rejected",
            ),
            (
                MockDevice::new()
                    .reply("diff", DIFF_ADMIN_UP)
                    .reply("commit now", "commit failed"),
                vec![ADMIN_UP],
                true,
                "commit failed",
            ),
        ];

        for (device, statements, commit, expected) in cases {
            let mut s = session(&device);
            let result = s.send_config(&statements, commit).await;
            assert_eq!(outcome(&result), expected, "statements: {statements:?}");

            assert_eq!(device.count("enter candidate"), 1);
            assert_eq!(device.count("quit"), 1);
            assert_eq!(device.sent().last().map(String::as_str), Some("quit"));
            assert!(!device.in_candidate());

            s.disconnect().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_config_diff_always_discards() {
        let device = MockDevice::new().reply("diff", DIFF_ADMIN_UP);
        let mut s = session(&device);

        let diff = s.check_config_diff(&[ADMIN_UP]).await.unwrap();
        assert!(diff.contains("admin-state enable"));
        assert_eq!(device.count("commit now"), 0);
        assert_eq!(sent_after(&device, "diff"), vec!["discard now", "quit"]);

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_config_formats() {
        let device = MockDevice::new()
            .reply("info flat /interface", "set / interface ethernet-1/1 admin-state enable\n\n")
            .reply("info json", "{\n  \"interface\": []\n}");
        let mut s = session(&device);

        let flat = s
            .get_config(ConfigSource::Running, ConfigFormat::Flat, Some("/interface"))
            .await
            .unwrap();
        assert_eq!(flat, "set / interface ethernet-1/1 admin-state enable");

        let json = s
            .get_config(ConfigSource::Running, ConfigFormat::Json, None)
            .await
            .unwrap();
        assert!(json.starts_with('{'));

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_candidate_config_leaves_without_discard() {
        let device = MockDevice::new().reply("info", "    interface ethernet-1/1 {\n    }");
        let mut s = session(&device);

        let text = s
            .get_config(ConfigSource::Candidate, ConfigFormat::Hierarchical, None)
            .await
            .unwrap();
        assert!(text.contains("interface ethernet-1/1"));
        assert_eq!(device.sent(), vec!["enter candidate", "info", "quit"]);

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_compare_running_on_empty_device() {
        let device = MockDevice::new();
        let mut s = session(&device);

        let report = s.compare_running(&[ADMIN_UP], None).await.unwrap();
        assert!(report.has_drift);
        assert_eq!(report.missing, vec![ADMIN_UP]);
        assert!(report.extra.is_empty());
        assert_eq!(report.diff, format!("+ {}", ADMIN_UP));
        assert_eq!(device.sent(), vec!["info flat /"]);

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_config_against_device() {
        let missing_ref = "set / network-instance default interface ethernet-1/99.0";
        let device = MockDevice::new()
            .reply(BOGUS, "Error: invalid option 'bogus-opt'")
            .reply(missing_ref, "Error: interface ethernet-1/99.0 does not exist");
        let mut s = session(&device);

        let report = s
            .validate_config(&["# uplinks", ADMIN_UP, BOGUS, missing_ref, "show version"], true)
            .await;

        assert!(!report.valid);
        assert_eq!(report.summary.total_commands, 4);
        assert_eq!(report.summary.errors, 2);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.summary.valid_commands, 2);

        let kinds: Vec<_> = report.errors.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&IssueKind::Syntax));
        assert!(kinds.contains(&IssueKind::Validation));
        assert_eq!(report.warnings[0].kind, IssueKind::Reference);
        assert_eq!(report.warnings[0].line, Some(4));

        // every statement sent, nothing committed
        assert_eq!(device.count(missing_ref), 1);
        assert_eq!(device.count("commit now"), 0);
        assert_eq!(device.sent().last().map(String::as_str), Some("quit"));

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_config_connection_failure_is_warning() {
        let device = MockDevice::new().fail_auth();
        let mut s = session(&device);

        let report = s.validate_config(&[ADMIN_UP], true).await;
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, IssueKind::Connection);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_that_closes_channel_releases_session() {
        let device = MockDevice::new()
            .close_on("quit")
            .reply("diff", DIFF_ADMIN_UP);
        let mut s = session(&device);

        let result = s.send_config(&[ADMIN_UP], true).await.unwrap();
        assert!(result.committed);

        // the next command reconnects
        s.execute_command("show version").await.unwrap();
        assert_eq!(device.connects(), 2);

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_lost_mid_apply_does_not_reconnect() {
        let device = MockDevice::new().close_on(ADMIN_UP);
        let mut s = session(&device);

        let err = s.send_config(&[ADMIN_UP, BOGUS], true).await.unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::Closed)));
        assert_eq!(device.connects(), 1);
        assert_eq!(device.sent(), vec!["enter candidate", ADMIN_UP]);
        assert!(!s.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout_mid_apply_discards_and_exits() {
        let device = MockDevice::new().stall(ADMIN_UP, "");
        let mut s = SessionBuilder::new("srl1")
            .username("admin")
            .require_prompt(true)
            .command_timeout(Duration::from_secs(2))
            .build_with(device.connector())
            .unwrap();

        let err = s.send_config(&[ADMIN_UP, BOGUS], true).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Driver(DriverError::ReadTimeout { ref command, .. }) if command == ADMIN_UP
        ));
        assert_eq!(sent_after(&device, ADMIN_UP), vec!["discard now", "quit"]);
        assert_eq!(device.connects(), 1);
        assert!(!device.in_candidate());

        s.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_candidate_read_keeps_shared_candidate() {
        let device = MockDevice::new().stall("info", "    interface ethernet-1/1 {");
        let mut s = SessionBuilder::new("srl1")
            .username("admin")
            .require_prompt(true)
            .command_timeout(Duration::from_secs(2))
            .build_with(device.connector())
            .unwrap();

        let err = s
            .get_config(ConfigSource::Candidate, ConfigFormat::Hierarchical, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::ReadTimeout { .. })));
        assert_eq!(device.count("discard now"), 0);
        assert_eq!(device.sent(), vec!["enter candidate", "info", "quit"]);

        s.disconnect().await.unwrap();
    }

    #[test]
    fn test_config_result_serializes() {
        let result = ConfigResult {
            changed: true,
            committed: true,
            commands: vec![ADMIN_UP.to_string()],
            diff: "+ admin-state enable".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["changed"], true);
        assert_eq!(json["commands"][0], ADMIN_UP);
    }

    #[test]
    fn test_format_commands() {
        assert_eq!(ConfigFormat::Flat.command(None), "info flat");
        assert_eq!(ConfigFormat::Json.command(Some("/system")), "info json /system");
        assert_eq!(ConfigFormat::Hierarchical.command(Some("  ")), "info");
    }
}
