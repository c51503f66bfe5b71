//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys.
    Strict,

    /// Accept and learn unknown keys, reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. Lab use only.
    Disabled,
}

/// SSH connection configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// Deadline for TCP connect, handshake and authentication.
    pub timeout: Duration,

    /// SSH inactivity timeout for the shell.
    pub idle_timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Authentication method for SSH connections.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// No authentication (for testing only).
    None,

    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

/// Connection parameters as they appear in inventory or playbook data.
///
/// Converts into a [`SessionBuilder`](crate::driver::SessionBuilder) with
/// [`into_builder`](Self::into_builder).
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceParams {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub private_key: Option<PathBuf>,

    /// Timeout in seconds, used for both connecting and command reads.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_port() -> u16 {
    22
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl DeviceParams {
    /// Build a session builder from these parameters.
    pub fn into_builder(self) -> crate::driver::SessionBuilder {
        let timeout = Duration::from_secs(self.timeout);
        let mut builder = crate::driver::SessionBuilder::new(self.host)
            .port(self.port)
            .username(self.username)
            .timeout(timeout)
            .command_timeout(timeout);

        if let Some(password) = self.password {
            builder = builder.password(password);
        } else if let Some(path) = self.private_key {
            builder = builder.private_key(path);
        }

        builder
    }
}
