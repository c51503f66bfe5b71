//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level SSH connection management,
//! handling connection setup, authentication, and shell creation.
//! The session engine sees it only through the [`Connector`] and
//! [`Shell`] traits.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod shell;
mod ssh;

pub use config::{AuthMethod, DeviceParams, HostKeyVerification, SshConfig};
pub use shell::{Connector, Shell};
pub use ssh::{SshConnector, SshShell, SshTransport};
