//! russh-backed SSH/SFTP collaborator
//!
//! Implements the [`crate::transport`] traits on top of `russh` (transport,
//! host-key verification, public key authentication) and `russh-sftp`
//! (SFTP subsystem client).

use crate::error::TransportError;
use crate::transport::{
    ClientContext, Connector, FileChannel, RemoteSession, TransportResult,
};
use async_trait::async_trait;
use bytes::BytesMut;
use russh::client::{self, Handle, Msg};
use russh::keys::{self, HashAlg, PrivateKey, PrivateKeyWithHashAlg, PublicKey};
use russh::{Channel, Disconnect};
use russh_sftp::client::SftpSession;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Connector producing russh client contexts
#[derive(Debug, Default, Clone, Copy)]
pub struct RusshConnector;

impl RusshConnector {
    /// Create a connector
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for RusshConnector {
    type Context = RusshContext;

    fn new_context(&self) -> Self::Context {
        RusshContext::default()
    }
}

/// Trust store and identity registrations for one call
#[derive(Default)]
pub struct RusshContext {
    known_hosts: Option<PathBuf>,
    identity: Option<Arc<PrivateKey>>,
}

impl ClientContext for RusshContext {
    type Session = RusshSession;

    fn set_known_hosts(&mut self, path: &Path) -> TransportResult<()> {
        let entries = validate_known_hosts(path)?;
        debug!(
            event = "known_hosts_registered",
            path = ?path,
            entries,
            "Known hosts file registered"
        );
        self.known_hosts = Some(path.to_path_buf());
        Ok(())
    }

    fn add_identity(&mut self, path: &Path) -> TransportResult<()> {
        let key = keys::load_secret_key(path, None).map_err(|e| TransportError::PrivateKey {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!(
            event = "identity_registered",
            path = ?path,
            algorithm = %key.algorithm(),
            "Private key identity registered"
        );
        self.identity = Some(Arc::new(key));
        Ok(())
    }

    fn session(&self, user: &str, host: &str, port: u16) -> TransportResult<RusshSession> {
        if user.is_empty() {
            return Err(TransportError::InvalidArgument("username is empty".to_string()));
        }
        if host.is_empty() {
            return Err(TransportError::InvalidArgument("host is empty".to_string()));
        }

        let known_hosts = self
            .known_hosts
            .clone()
            .ok_or_else(|| TransportError::InvalidArgument("no known hosts file registered".to_string()))?;
        let identity = self
            .identity
            .clone()
            .ok_or_else(|| TransportError::InvalidArgument("no identity registered".to_string()))?;

        Ok(RusshSession {
            user: user.to_string(),
            host: host.to_string(),
            port,
            known_hosts,
            identity,
            handle: None,
        })
    }
}

/// Check that a known-hosts file is readable and well formed
///
/// Returns the number of host key entries. A missing file holds no entries.
/// Entries whose key blob cannot be decoded are skipped with a warning; lines
/// missing the host, key type or key fields are rejected.
fn validate_known_hosts(path: &Path) -> TransportResult<usize> {
    let invalid = |reason: String| TransportError::KnownHosts {
        path: path.display().to_string(),
        reason,
    };

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                event = "known_hosts_missing",
                path = ?path,
                "Known hosts file does not exist; every host key will be rejected"
            );
            return Ok(0);
        }
        Err(e) => return Err(invalid(e.to_string())),
    };

    let mut entries = 0;
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace().peekable();
        // @cert-authority / @revoked
        if fields.peek().is_some_and(|f| f.starts_with('@')) {
            fields.next();
        }

        let (Some(_hosts), Some(_key_type), Some(blob)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid(format!("malformed entry on line {}", index + 1)));
        };

        match keys::parse_public_key_base64(blob) {
            Ok(_) => entries += 1,
            Err(e) => warn!(
                event = "known_hosts_entry_skipped",
                path = ?path,
                line = index + 1,
                error = %e,
                "Skipping undecodable known hosts entry"
            ),
        }
    }

    Ok(entries)
}

/// Verifies server host keys against the registered known-hosts file
struct HostKeyVerifier {
    host: String,
    port: u16,
    known_hosts: PathBuf,
}

impl client::Handler for HostKeyVerifier {
    type Error = TransportError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let known = keys::check_known_hosts_path(
            &self.host,
            self.port,
            server_public_key,
            &self.known_hosts,
        )
        .map_err(|e| {
            warn!(
                event = "host_key_mismatch",
                host = %self.host,
                port = self.port,
                error = %e,
                "Server host key does not match known hosts"
            );
            self.rejected()
        })?;

        if known {
            debug!(event = "host_key_verified", host = %self.host, port = self.port, "Host key verified");
            Ok(true)
        } else {
            warn!(
                event = "host_key_unknown",
                host = %self.host,
                port = self.port,
                "Server host key not present in known hosts"
            );
            Err(self.rejected())
        }
    }
}

impl HostKeyVerifier {
    fn rejected(&self) -> TransportError {
        TransportError::HostKeyRejected {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// One SSH session; unconnected until [`RemoteSession::connect`] succeeds
pub struct RusshSession {
    user: String,
    host: String,
    port: u16,
    known_hosts: PathBuf,
    identity: Arc<PrivateKey>,
    handle: Option<Handle<HostKeyVerifier>>,
}

/// TCP connect, host-key verification and public key authentication
async fn handshake(
    user: &str,
    host: &str,
    port: u16,
    known_hosts: &Path,
    identity: Arc<PrivateKey>,
) -> TransportResult<Handle<HostKeyVerifier>> {
    let verifier = HostKeyVerifier {
        host: host.to_string(),
        port,
        known_hosts: known_hosts.to_path_buf(),
    };
    let config = Arc::new(client::Config::default());

    let mut handle = client::connect(config, (host, port), verifier).await?;

    // SHA-512 signatures for RSA keys; other algorithms sign natively
    let hash_alg = if identity.algorithm().is_rsa() {
        Some(HashAlg::Sha512)
    } else {
        None
    };
    let auth = handle
        .authenticate_publickey(user, PrivateKeyWithHashAlg::new(identity, hash_alg))
        .await?;

    if !auth.success() {
        return Err(TransportError::AuthenticationRejected(user.to_string()));
    }

    Ok(handle)
}

#[async_trait]
impl RemoteSession for RusshSession {
    type Channel = RusshChannel;

    async fn connect(&mut self, timeout: Duration) -> TransportResult<()> {
        let attempt = handshake(
            &self.user,
            &self.host,
            self.port,
            &self.known_hosts,
            self.identity.clone(),
        );
        let handle = tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| {
                TransportError::timeout(format!("session connect to {}:{}", self.host, self.port))
            })??;

        debug!(
            event = "session_authenticated",
            host = %self.host,
            port = self.port,
            user = %self.user,
            "SSH session authenticated"
        );
        self.handle = Some(handle);
        Ok(())
    }

    async fn open_channel(&mut self, subsystem: &str) -> TransportResult<RusshChannel> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| TransportError::not_connected("session"))?;

        let channel = handle.channel_open_session().await?;

        Ok(RusshChannel {
            subsystem: subsystem.to_string(),
            pending: Some(channel),
            sftp: None,
        })
    }

    async fn disconnect(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
            {
                warn!(event = "session_disconnect_failed", error = %e, "Session disconnect failed");
            }
        }
    }
}

/// SFTP channel; `pending` until the subsystem starts, then `sftp`
pub struct RusshChannel {
    subsystem: String,
    pending: Option<Channel<Msg>>,
    sftp: Option<SftpSession>,
}

impl RusshChannel {
    fn sftp(&self) -> TransportResult<&SftpSession> {
        self.sftp
            .as_ref()
            .ok_or_else(|| TransportError::not_connected("sftp channel"))
    }
}

#[async_trait]
impl FileChannel for RusshChannel {
    async fn connect(&mut self, timeout: Duration) -> TransportResult<()> {
        let subsystem = self.subsystem.clone();
        let pending = &mut self.pending;

        let start = async move {
            let channel = pending
                .as_ref()
                .ok_or_else(|| TransportError::not_connected("channel"))?;
            channel.request_subsystem(true, &subsystem).await?;

            let channel = pending
                .take()
                .ok_or_else(|| TransportError::not_connected("channel"))?;
            Ok::<_, TransportError>(SftpSession::new(channel.into_stream()).await?)
        };

        let sftp = tokio::time::timeout(timeout, start)
            .await
            .map_err(|_| TransportError::timeout(format!("{} channel connect", self.subsystem)))??;

        self.sftp = Some(sftp);
        Ok(())
    }

    async fn get(&mut self, path: &str, sink: &mut BytesMut) -> TransportResult<()> {
        let mut file = self.sftp()?.open(path).await?;

        loop {
            if file.read_buf(sink).await? == 0 {
                break;
            }
        }

        debug!(event = "sftp_get", path = %path, bytes = sink.len(), "Fetched remote file");
        Ok(())
    }

    async fn put(
        &mut self,
        source: &mut (dyn AsyncRead + Unpin + Send),
        path: &str,
    ) -> TransportResult<()> {
        let mut file = self.sftp()?.create(path).await?;

        let written = tokio::io::copy(source, &mut file).await?;
        file.shutdown().await?;

        debug!(event = "sftp_put", path = %path, bytes = written, "Stored remote file");
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(sftp) = self.sftp.take() {
            if let Err(e) = sftp.close().await {
                warn!(event = "channel_close_failed", error = %e, "SFTP channel close failed");
            }
        }
        if let Some(channel) = self.pending.take() {
            if let Err(e) = channel.close().await {
                warn!(event = "channel_close_failed", error = %e, "Channel close failed");
            }
        }
    }
}
