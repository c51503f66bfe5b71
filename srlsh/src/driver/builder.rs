//! Builder for creating sessions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use super::classify::{KeywordClassifier, ResponseClassifier};
use super::session::Session;
use crate::channel::{CompiledPrompt, PromptMatcher, PromptReader, ReaderConfig};
use crate::error::{ChannelError, DriverError, Result};
use crate::transport::{AuthMethod, Connector, HostKeyVerification, SshConfig, SshConnector};

/// Builder for constructing a [`Session`].
///
/// # Example
///
/// ```rust,no_run
/// use srlsh::SessionBuilder;
///
/// # async fn example() -> Result<(), srlsh::Error> {
/// let mut session = SessionBuilder::new("172.20.20.2")
///     .username("admin")
///     .password("NokiaSrl1!")
///     .build()?;
///
/// let version = session.execute_command("show version").await?;
/// println!("{}", version.result);
/// session.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    timeout: Duration,
    idle_timeout: Duration,
    command_timeout: Duration,
    terminal_width: u32,
    terminal_height: u32,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    prompt_pattern: Option<String>,
    prompt_matcher: Option<Arc<dyn PromptMatcher>>,
    reader: ReaderConfig,
    require_prompt: bool,
    classifier: Option<Arc<dyn ResponseClassifier>>,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            command_timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            prompt_pattern: None,
            prompt_matcher: None,
            reader: ReaderConfig::default(),
            require_prompt: false,
            classifier: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Set the deadline for connecting and authenticating (default: 30s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the SSH inactivity timeout (default: 300s).
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set how long each command waits for the prompt (default: 30s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a known_hosts file other than `~/.ssh/known_hosts`.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Accept any host key. Only for disposable lab devices.
    pub fn danger_disable_host_key_verification(mut self) -> Self {
        self.host_key_verification = HostKeyVerification::Disabled;
        self
    }

    /// Override the prompt regex. Anchored at end of buffer when compiled.
    pub fn prompt_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.prompt_pattern = Some(pattern.into());
        self
    }

    /// Use a custom completion predicate instead of a regex.
    pub fn prompt_matcher(mut self, matcher: impl PromptMatcher + 'static) -> Self {
        self.prompt_matcher = Some(Arc::new(matcher));
        self
    }

    /// Set the sleep between reads while waiting for a prompt (default: 100ms).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.reader.poll_interval = interval;
        self
    }

    /// Set how many trailing bytes are searched for the prompt (default: 1000).
    pub fn search_depth(mut self, depth: usize) -> Self {
        self.reader.search_depth = depth;
        self
    }

    /// Fail commands with [`DriverError::ReadTimeout`] when no prompt is
    /// seen, instead of returning the partial output.
    pub fn require_prompt(mut self, require: bool) -> Self {
        self.require_prompt = require;
        self
    }

    /// Replace the keyword classifier used on configuration responses.
    pub fn classifier(mut self, classifier: impl ResponseClassifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Resolve the SSH connection settings.
    pub fn ssh_config(&self) -> Result<SshConfig> {
        if self.host.trim().is_empty() {
            return Err(DriverError::InvalidConfig {
                message: "Host is required".to_string(),
            }
            .into());
        }

        let username = self.username.clone().ok_or_else(|| DriverError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;

        Ok(SshConfig {
            host: self.host.clone(),
            port: self.port,
            username,
            auth: self.auth.clone(),
            timeout: self.timeout,
            idle_timeout: self.idle_timeout,
            terminal_width: self.terminal_width,
            terminal_height: self.terminal_height,
            host_key_verification: self.host_key_verification.clone(),
            known_hosts_path: self.known_hosts_path.clone(),
        })
    }

    /// Build an SSH session.
    ///
    /// Does not connect; the first command (or an explicit
    /// [`connect`](Session::connect)) opens the connection.
    pub fn build(self) -> Result<Session> {
        self.build_with(SshConnector)
    }

    /// Build a session on a custom connector.
    pub fn build_with<C: Connector>(self, connector: C) -> Result<Session<C>> {
        let config = self.ssh_config()?;

        if self.command_timeout.is_zero() {
            return Err(DriverError::InvalidConfig {
                message: "Command timeout must be non-zero".to_string(),
            }
            .into());
        }

        if self.reader.search_depth == 0 {
            return Err(DriverError::InvalidConfig {
                message: "Search depth must be non-zero".to_string(),
            }
            .into());
        }

        let prompt: Arc<dyn PromptMatcher> = match (self.prompt_matcher, self.prompt_pattern) {
            (Some(matcher), _) => matcher,
            (None, Some(pattern)) => {
                Arc::new(CompiledPrompt::new(&pattern).map_err(ChannelError::from)?)
            }
            (None, None) => Arc::new(CompiledPrompt::default()),
        };

        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(KeywordClassifier::default()));

        Ok(Session::new(
            config,
            connector,
            PromptReader::new(self.reader),
            prompt,
            classifier,
            self.command_timeout,
            self.require_prompt,
        ))
    }
}
