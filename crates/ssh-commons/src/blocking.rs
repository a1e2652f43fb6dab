//! Blocking facade over [`TransferClient`]
//!
//! Each call blocks the calling thread until the transfer completes, fails
//! or a connect step times out.

use crate::client::{ConnectionParams, TransferClient};
use crate::ssh::RusshConnector;
use crate::transport::Connector;
use crate::{ClientConfig, Result};
use bytes::Bytes;
use std::io::{ErrorKind, Read};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::runtime::{Builder, Runtime};

/// Synchronous SFTP transfer client
pub struct BlockingTransferClient<C = RusshConnector> {
    inner: TransferClient<C>,
    runtime: Runtime,
}

impl BlockingTransferClient<RusshConnector> {
    /// Create a client with default timeouts
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Runtime`] if the runtime cannot be started.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with the given configuration
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Runtime`] if the runtime cannot be started.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_connector(RusshConnector::new(), config)
    }
}

impl<C: Connector> BlockingTransferClient<C> {
    /// Create a client driving a custom collaborator
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Runtime`] if the runtime cannot be started.
    pub fn with_connector(connector: C, config: ClientConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            inner: TransferClient::with_connector(connector, config),
            runtime,
        })
    }

    /// Underlying async client
    pub const fn inner(&self) -> &TransferClient<C> {
        &self.inner
    }

    /// Read a remote file fully into memory
    ///
    /// # Errors
    ///
    /// See [`TransferClient::read_file`].
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn read_file(&self, params: &ConnectionParams, remote_path: &str) -> Result<Bytes> {
        self.runtime.block_on(self.inner.read_file(params, remote_path))
    }

    /// Stream `data` to a remote file, creating or overwriting it
    ///
    /// # Errors
    ///
    /// See [`TransferClient::write_file`].
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn write_file<R>(&self, params: &ConnectionParams, remote_path: &str, data: R) -> Result<()>
    where
        R: Read + Send + Unpin,
    {
        self.runtime
            .block_on(self.inner.write_file(params, remote_path, ReadAdapter(data)))
    }
}

/// Presents a `std::io::Read` as an `AsyncRead`
///
/// Reads complete inline; only used on the facade's own runtime thread.
struct ReadAdapter<R>(R);

impl<R: Read + Unpin> AsyncRead for ReadAdapter<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        loop {
            match this.0.read(buf.initialize_unfilled()) {
                Ok(n) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Poll::Ready(Err(e)),
            }
        }
    }
}
