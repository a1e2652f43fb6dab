//! # ssh-commons
//!
//! Minimal SFTP file transfer helper built on `russh` and `russh-sftp`.
//!
//! Each call opens an authenticated SSH session verified against a
//! known-hosts file, starts one SFTP channel, performs a single read or
//! write, and disconnects channel then session before returning.
//!
//! ## Features
//!
//! - Read a remote file into memory ([`TransferClient::read_file`])
//! - Stream data to a remote file ([`TransferClient::write_file`])
//! - Blocking facade ([`BlockingTransferClient`])
//! - Pluggable SSH collaborator ([`transport`]) for testing without network I/O
//! - Configurable session and channel connect timeouts (default 5000 ms)

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod ssh;
pub mod transport;

pub use blocking::BlockingTransferClient;
pub use client::{ConnectionParams, TransferClient};
pub use config::{ClientConfig, LogFormat, LoggingConfig};
pub use error::{Error, Result, TransportError};
pub use ssh::RusshConnector;
