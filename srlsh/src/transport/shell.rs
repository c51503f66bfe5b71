//! The minimal contract the session engine needs from a transport.

use std::future::Future;

use super::config::SshConfig;
use crate::error::Result;

/// One interactive shell on an authenticated connection.
///
/// The engine only ever sends raw text, polls for whatever bytes are
/// available, and closes. Framing is the reader's job, not the shell's.
pub trait Shell: Send {
    /// Write raw bytes to the shell.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Return the next chunk of bytes if one is already available.
    ///
    /// Never waits. `Ok(None)` means nothing is buffered right now;
    /// a closed channel with nothing left to read is an error.
    fn try_read(&mut self) -> Result<Option<Vec<u8>>>;

    /// Close the shell and then its connection.
    ///
    /// Must be safe to call more than once.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens a connection and an interactive shell on it.
pub trait Connector: Send + Sync {
    type Shell: Shell;

    /// Open the connection and invoke the shell. Never retries.
    fn connect(&self, config: &SshConfig) -> impl Future<Output = Result<Self::Shell>> + Send;
}
