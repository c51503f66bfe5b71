//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;
use tokio::net::TcpStream;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use super::shell::{Connector, Shell};
use crate::error::{ChannelError, Result, TransportError};

/// Authenticated SSH connection wrapping a russh client handle.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Configuration used for this connection.
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate.
    ///
    /// The whole sequence (TCP, handshake, auth) shares `config.timeout`.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        tokio::time::timeout(config.timeout, Self::connect_inner(config.clone()))
            .await
            .map_err(|_| TransportError::Timeout(config.timeout))?
    }

    async fn connect_inner(config: SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.idle_timeout),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("connecting to {}", config.socket_addr());

        let stream = TcpStream::connect((config.host.as_str(), config.port))
            .await
            .map_err(|source| TransportError::ConnectionFailed {
                host: config.host.clone(),
                port: config.port,
                source,
            })?;

        let mut session = client::connect_stream(ssh_config, stream, handler)
            .await
            .map_err(|e| {
                // Prefer the detailed host-key error over russh's generic UnknownKey
                let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
                stored.unwrap_or(TransportError::Ssh(e))
            })?;

        Self::authenticate(&mut session, &config).await?;

        debug!("authenticated to {} as {}", config.host, config.username);

        Ok(Self { session, config })
    }

    /// Open a PTY channel and start an interactive shell on it.
    ///
    /// On failure the connection is torn down before returning.
    pub async fn open_shell(self) -> Result<SshShell> {
        let (width, height) = (self.config.terminal_width, self.config.terminal_height);

        let channel = match self.session.channel_open_session().await {
            Ok(channel) => channel,
            Err(e) => {
                let _ = self.close().await;
                return Err(TransportError::Ssh(e).into());
            }
        };

        let requested = async {
            channel
                .request_pty(true, "xterm", width, height, 0, 0, &[])
                .await?;
            channel.request_shell(true).await
        }
        .await;

        let mut shell = SshShell {
            channel: Some(channel),
            transport: Some(self),
            eof: false,
        };

        if let Err(e) = requested {
            let _ = shell.close().await;
            return Err(ChannelError::Ssh(e).into());
        }

        Ok(shell)
    }

    /// Authenticate with the server.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let success = match &config.auth {
            AuthMethod::None => session
                .authenticate_none(&config.username)
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::Password(password) => session
                .authenticate_password(&config.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// Interactive shell channel plus the connection that carries it.
///
/// Both halves are optional so teardown works on partially-built shells
/// and repeated `close()` calls are no-ops.
pub struct SshShell {
    channel: Option<Channel<Msg>>,
    transport: Option<SshTransport>,
    eof: bool,
}

impl Shell for SshShell {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let channel = self.channel.as_ref().ok_or(ChannelError::Closed)?;
        channel.data(data).await.map_err(ChannelError::Ssh)?;
        Ok(())
    }

    fn try_read(&mut self) -> Result<Option<Vec<u8>>> {
        let channel = self.channel.as_mut().ok_or(ChannelError::Closed)?;
        if self.eof {
            return Err(ChannelError::Closed.into());
        }

        loop {
            // Channel::wait is a plain mpsc receive, so dropping the
            // unfinished future loses nothing.
            match channel.wait().now_or_never() {
                None => return Ok(None),
                Some(None) => {
                    self.eof = true;
                    return Err(ChannelError::Closed.into());
                }
                Some(Some(ChannelMsg::Data { data })) => return Ok(Some(data.to_vec())),
                Some(Some(ChannelMsg::ExtendedData { data, .. })) => {
                    return Ok(Some(data.to_vec()));
                }
                Some(Some(ChannelMsg::Eof | ChannelMsg::Close)) => {
                    debug!("remote closed shell channel");
                    self.eof = true;
                    return Err(ChannelError::Closed.into());
                }
                Some(Some(other)) => trace!("ignoring channel message: {:?}", other),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                debug!("shell channel close failed: {}", e);
            }
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }
}

/// Connector producing real SSH shells.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    type Shell = SshShell;

    async fn connect(&self, config: &SshConfig) -> Result<SshShell> {
        let transport = SshTransport::connect(config.clone()).await?;
        transport.open_shell().await
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Detailed host-key error for connect() to surface.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// `Ok(true)` if matched, `Ok(false)` if the host is not listed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
