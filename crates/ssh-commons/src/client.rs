//! SFTP Transfer Client
//!
//! Performs exactly one authenticated remote read or write per call. Every
//! call builds its own session and channel and tears both down before
//! returning, on success and on every failure path.

use crate::ssh::RusshConnector;
use crate::transport::{
    ClientContext, Connector, FileChannel, RemoteSession, TransportResult, SFTP_SUBSYSTEM,
};
use crate::{ClientConfig, Error, Result};
use bytes::{Bytes, BytesMut};
use std::path::PathBuf;
use tokio::io::AsyncRead;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Caller-supplied connection parameters for one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Remote username
    pub user: String,
    /// Remote host name or address
    pub host: String,
    /// Remote SSH port
    pub port: u16,
    /// Known-hosts trust file used to verify the server host key
    pub known_hosts_path: PathBuf,
    /// Private key file used for public key authentication
    pub private_key_path: PathBuf,
}

impl ConnectionParams {
    /// Create connection parameters
    pub fn new(
        user: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        known_hosts_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            port,
            known_hosts_path: known_hosts_path.into(),
            private_key_path: private_key_path.into(),
        }
    }
}

type SessionOf<C> = <<C as Connector>::Context as ClientContext>::Session;

/// SFTP transfer client
///
/// Generic over the SSH collaborator; defaults to the russh backend.
pub struct TransferClient<C = RusshConnector> {
    connector: C,
    config: ClientConfig,
}

impl TransferClient<RusshConnector> {
    /// Create a client with default timeouts
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with the given configuration
    pub const fn with_config(config: ClientConfig) -> Self {
        Self::with_connector(RusshConnector::new(), config)
    }
}

impl Default for TransferClient<RusshConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> TransferClient<C> {
    /// Create a client driving a custom collaborator
    pub const fn with_connector(connector: C, config: ClientConfig) -> Self {
        Self { connector, config }
    }

    /// Active configuration
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Collaborator in use
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Read a remote file fully into memory
    ///
    /// # Errors
    ///
    /// - [`Error::SessionCreation`] if the session could not be set up; no
    ///   network connection is attempted in that case.
    /// - [`Error::Read`] if connecting or fetching failed.
    pub async fn read_file(&self, params: &ConnectionParams, remote_path: &str) -> Result<Bytes> {
        let span = transfer_span("sftp_read", params, remote_path);

        async move {
            let mut scope = TransferScope::new(self.create_session(params)?);

            let outcome: TransportResult<Bytes> = async {
                let channel = scope.open_sftp(&self.config).await?;
                let mut sink = BytesMut::new();
                channel.get(remote_path, &mut sink).await?;
                Ok(sink.freeze())
            }
            .await;

            scope.close().await;

            match outcome {
                Ok(data) => {
                    info!(event = "file_read", bytes = data.len(), "Remote file read");
                    Ok(data)
                }
                Err(cause) => {
                    warn!(event = "file_read_failed", error = %cause, "Remote file read failed");
                    Err(Error::Read(cause))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Stream `data` to a remote file, creating or overwriting it
    ///
    /// The remote parent directory must already exist.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionCreation`] if the session could not be set up.
    /// - [`Error::Write`] if connecting or storing failed.
    pub async fn write_file<R>(
        &self,
        params: &ConnectionParams,
        remote_path: &str,
        mut data: R,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let span = transfer_span("sftp_write", params, remote_path);

        async move {
            let mut scope = TransferScope::new(self.create_session(params)?);

            let outcome: TransportResult<()> = async {
                let channel = scope.open_sftp(&self.config).await?;
                channel.put(&mut data, remote_path).await
            }
            .await;

            scope.close().await;

            match outcome {
                Ok(()) => {
                    info!(event = "file_written", "Remote file written");
                    Ok(())
                }
                Err(cause) => {
                    warn!(event = "file_write_failed", error = %cause, "Remote file write failed");
                    Err(Error::Write(cause))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Build a fresh context, register trust file and identity, and request a session
    fn create_session(&self, params: &ConnectionParams) -> Result<SessionOf<C>> {
        let setup = || -> TransportResult<SessionOf<C>> {
            let mut context = self.connector.new_context();
            context.set_known_hosts(&params.known_hosts_path)?;
            context.add_identity(&params.private_key_path)?;
            context.session(&params.user, &params.host, params.port)
        };

        setup().map_err(|cause| {
            error!(
                event = "session_creation_failed",
                error = %cause,
                known_hosts = ?params.known_hosts_path,
                private_key = ?params.private_key_path,
                "Failed to create SSH session"
            );
            Error::SessionCreation(cause)
        })
    }
}

fn transfer_span(name: &'static str, params: &ConnectionParams, remote_path: &str) -> tracing::Span {
    info_span!(
        "transfer",
        operation = name,
        transfer_id = %Uuid::new_v4(),
        user = %params.user,
        host = %params.host,
        port = params.port,
        remote_path = %remote_path,
    )
}

/// Session and optional channel owned by one call
///
/// `close` releases the channel (if one was opened) and then the session.
struct TransferScope<S: RemoteSession> {
    session: S,
    channel: Option<S::Channel>,
}

impl<S: RemoteSession> TransferScope<S> {
    const fn new(session: S) -> Self {
        Self {
            session,
            channel: None,
        }
    }

    async fn open_sftp(&mut self, config: &ClientConfig) -> TransportResult<&mut S::Channel> {
        self.session
            .connect(config.session_connect_timeout())
            .await?;
        debug!(event = "session_connected", "SSH session connected");

        let opened = self.session.open_channel(SFTP_SUBSYSTEM).await?;
        let channel = self.channel.insert(opened);
        channel.connect(config.channel_connect_timeout()).await?;
        debug!(event = "channel_connected", "SFTP channel connected");

        Ok(channel)
    }

    async fn close(mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.disconnect().await;
        }
        self.session.disconnect().await;
        debug!(event = "transfer_closed", "Channel and session released");
    }
}

