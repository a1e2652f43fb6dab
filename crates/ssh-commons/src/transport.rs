//! SSH/SFTP collaborator interface
//!
//! The transfer client drives the underlying SSH library through these
//! traits only. [`crate::ssh`] provides the russh-backed implementation;
//! tests substitute recording fakes.
//!
//! Lifecycle of one call:
//!
//! ```text
//! Connector::new_context
//!   -> ClientContext::{set_known_hosts, add_identity, session}
//!   -> RemoteSession::connect -> RemoteSession::open_channel("sftp")
//!   -> FileChannel::connect -> FileChannel::{get | put}
//!   -> FileChannel::disconnect -> RemoteSession::disconnect
//! ```

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::BytesMut;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncRead;

/// Subsystem name requested for file-transfer channels
pub const SFTP_SUBSYSTEM: &str = "sftp";

/// Result type alias for collaborator calls
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Factory for fresh client contexts; one context is built per call
pub trait Connector: Send + Sync {
    /// Context type produced by this connector
    type Context: ClientContext;

    /// Build a new, unconfigured client context
    fn new_context(&self) -> Self::Context;
}

/// Library client context holding trust store and identity registrations
pub trait ClientContext: Send {
    /// Session type handed out by this context
    type Session: RemoteSession;

    /// Register the known-hosts trust file used for host-key verification
    ///
    /// A file that does not exist registers an empty trust store; the server
    /// host key is then rejected when the session connects.
    ///
    /// # Errors
    ///
    /// Fails if an existing trust file cannot be read or parsed.
    fn set_known_hosts(&mut self, path: &Path) -> TransportResult<()>;

    /// Register the private key identity used for authentication
    ///
    /// # Errors
    ///
    /// Fails if the key file cannot be read or decoded.
    fn add_identity(&mut self, path: &Path) -> TransportResult<()>;

    /// Request an unconnected session for `user@host:port`
    ///
    /// # Errors
    ///
    /// Fails if the arguments are rejected or no identity is registered.
    fn session(&self, user: &str, host: &str, port: u16) -> TransportResult<Self::Session>;
}

/// Authenticated transport connection to a remote host
#[async_trait]
pub trait RemoteSession: Send {
    /// Channel type opened over this session
    type Channel: FileChannel;

    /// Connect, verify the host key and authenticate within `timeout`
    async fn connect(&mut self, timeout: Duration) -> TransportResult<()>;

    /// Open a sub-channel for the named subsystem
    async fn open_channel(&mut self, subsystem: &str) -> TransportResult<Self::Channel>;

    /// Tear the session down. Never fails; safe on an unconnected session.
    async fn disconnect(&mut self);
}

/// File-transfer sub-connection over a [`RemoteSession`]
#[async_trait]
pub trait FileChannel: Send {
    /// Start the subsystem on the channel within `timeout`
    async fn connect(&mut self, timeout: Duration) -> TransportResult<()>;

    /// Fetch the full contents of `path` into `sink`
    async fn get(&mut self, path: &str, sink: &mut BytesMut) -> TransportResult<()>;

    /// Store everything readable from `source` at `path`, overwriting it
    async fn put(
        &mut self,
        source: &mut (dyn AsyncRead + Unpin + Send),
        path: &str,
    ) -> TransportResult<()>;

    /// Close the channel. Never fails; safe on an unconnected channel.
    async fn disconnect(&mut self);
}
