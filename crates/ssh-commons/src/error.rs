//! Error types for SFTP transfers
//!
//! Failures are reported at the call boundary as one of three fixed-message
//! kinds (session creation, read, write), each wrapping the [`TransportError`]
//! raised by the SSH/SFTP collaborator.

use thiserror::Error;

/// Result type alias for transfer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Call-boundary error types
#[derive(Error, Debug)]
pub enum Error {
    /// Client context setup, known-hosts registration, identity registration
    /// or session acquisition failed. Raised before any network connection.
    #[error("Error creating SSH session")]
    SessionCreation(#[source] TransportError),

    /// Session connect, channel open/connect or fetch failed during a read
    #[error("Error reading file over SFTP")]
    Read(#[source] TransportError),

    /// Session connect, channel open/connect or store failed during a write
    #[error("Error writing file over SFTP")]
    Write(#[source] TransportError),

    /// Invalid or unreadable client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The blocking facade could not start its runtime
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl Error {
    /// Collaborator failure wrapped by a transfer error, if any
    pub const fn transport_cause(&self) -> Option<&TransportError> {
        match self {
            Self::SessionCreation(cause) | Self::Read(cause) | Self::Write(cause) => Some(cause),
            Self::Config(_) | Self::Runtime(_) => None,
        }
    }
}

/// Failures raised by the SSH/SFTP collaborator
#[derive(Error, Debug)]
pub enum TransportError {
    /// I/O error (local stream, socket)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SSH protocol error
    #[error("SSH error: {0}")]
    Ssh(String),

    /// SFTP subsystem error
    #[error("SFTP error: {0}")]
    Sftp(String),

    /// Private key could not be loaded
    #[error("Invalid private key {path}: {reason}")]
    PrivateKey {
        /// Key file path
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// Known-hosts trust file could not be read or parsed
    #[error("Invalid known hosts file {path}: {reason}")]
    KnownHosts {
        /// Trust file path
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// Server host key is unknown or does not match the trust file
    #[error("Host key rejected for {host}:{port}")]
    HostKeyRejected {
        /// Remote host
        host: String,
        /// Remote port
        port: u16,
    },

    /// Server rejected public key authentication
    #[error("Authentication rejected for user {0}")]
    AuthenticationRejected(String),

    /// Connect step exceeded its time limit
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Caller-supplied argument rejected by the library
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted in the wrong lifecycle state
    #[error("Not connected: {0}")]
    NotConnected(String),
}

impl TransportError {
    /// Check if the failure was a connect timeout
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Create timeout error with context
    pub fn timeout(context: impl Into<String>) -> Self {
        Self::Timeout(context.into())
    }

    /// Create not-connected error with context
    pub fn not_connected(context: impl Into<String>) -> Self {
        Self::NotConnected(context.into())
    }
}

impl From<russh::Error> for TransportError {
    fn from(err: russh::Error) -> Self {
        Self::Ssh(err.to_string())
    }
}

impl From<russh::keys::Error> for TransportError {
    fn from(err: russh::keys::Error) -> Self {
        Self::Ssh(err.to_string())
    }
}

impl From<russh_sftp::client::error::Error> for TransportError {
    fn from(err: russh_sftp::client::error::Error) -> Self {
        Self::Sftp(err.to_string())
    }
}
