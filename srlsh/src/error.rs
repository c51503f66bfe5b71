//! Error types for srlsh.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for srlsh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Candidate transaction errors
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// TCP connection to the host could not be established
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host is not present in known_hosts and strict checking is enabled
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (shell I/O, prompt patterns).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Channel closed by the remote side
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Session-level errors (lifecycle, read policy, builder validation).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Opening the transport or shell failed
    #[error("Failed to connect to {host}: {source}")]
    ConnectionFailed {
        host: String,
        #[source]
        source: Box<Error>,
    },

    /// No prompt was seen before the deadline and the session requires one
    #[error("No prompt from {host} within {timeout:?} after '{command}'")]
    ReadTimeout {
        host: String,
        command: String,
        timeout: Duration,
    },

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A candidate transaction step was attempted after the transaction ended
    #[error("Candidate transaction on {host} already finished")]
    TransactionFinished { host: String },
}

/// Device-reported failures converted from response text.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// The device did not acknowledge `enter candidate`
    #[error("{host}: failed to enter candidate mode: {output}")]
    CandidateEntry { host: String, output: String },

    /// A statement was rejected while applying a batch
    #[error("{host}: configuration rejected at '{statement}': {output}")]
    Rejected {
        host: String,
        statement: String,
        output: String,
    },

    /// `commit now` reported a failure
    #[error("{host}: commit failed: {output}")]
    CommitFailed { host: String, output: String },
}

/// Result type alias using srlsh's Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error was produced by the transport or shell channel
    /// rather than classified from device output.
    pub fn is_transport(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Channel(_) => true,
            Error::Driver(DriverError::ConnectionFailed { .. }) => true,
            _ => false,
        }
    }
}
