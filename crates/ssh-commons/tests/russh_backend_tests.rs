//! russh backend tests
//!
//! Exercise session setup against real key and known-hosts files, and the
//! connect paths against local sockets and an in-process russh server that
//! rejects every authentication attempt.

use russh::keys::PrivateKey;
use russh::server;
use ssh_commons::{ClientConfig, ConnectionParams, Error, TransferClient, TransportError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const HOST_KEY: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIP2k6sWT1I5dz8O9bSKvijjR0Tf7GcgYHXosol/Zv5oP";

/// Public half of `tests/fixtures/ssh_host_ed25519_key`
const SERVER_HOST_KEY: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIPw+kLWdxa2i6N0g7fAf0WNPRdfXSCufm6Cye4ABCAAu";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn fixture_key() -> PathBuf {
    fixture("id_ed25519")
}

fn known_hosts_with(entries: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    for entry in entries {
        writeln!(file, "{entry}").expect("Failed to write known hosts");
    }
    file
}

fn known_hosts() -> NamedTempFile {
    known_hosts_with(&[format!("127.0.0.1 {HOST_KEY}")])
}

fn fast_client() -> TransferClient {
    TransferClient::with_config(ClientConfig {
        session_connect_timeout_ms: 300,
        channel_connect_timeout_ms: 300,
        ..ClientConfig::default()
    })
}

/// Server handler that keeps the default (rejecting) authentication methods
struct RejectingHandler;

impl server::Handler for RejectingHandler {
    type Error = russh::Error;
}

/// Serve SSH on an ephemeral local port with the fixture host key
async fn spawn_server() -> (u16, JoinHandle<()>) {
    let host_key = PrivateKey::read_openssh_file(&fixture("ssh_host_ed25519_key"))
        .expect("Failed to load host key");
    let config = Arc::new(server::Config {
        keys: vec![host_key],
        auth_rejection_time: Duration::ZERO,
        auth_rejection_time_initial: Some(Duration::ZERO),
        ..Default::default()
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let port = listener.local_addr().expect("no local addr").port();

    let task = tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let config = Arc::clone(&config);
            tokio::spawn(async move {
                if let Ok(session) = server::run_stream(config, socket, RejectingHandler).await {
                    let _ = session.await;
                }
            });
        }
    });

    (port, task)
}

fn server_params(port: u16, known_hosts: &Path) -> ConnectionParams {
    ConnectionParams::new("user", "127.0.0.1", port, known_hosts, fixture_key())
}

#[tokio::test]
async fn test_unknown_host_key_is_rejected_on_read() {
    let (port, server) = spawn_server().await;
    // Only an entry for a different host/port
    let hosts = known_hosts();

    let err = TransferClient::new()
        .read_file(&server_params(port, hosts.path()), "file")
        .await
        .expect_err("read should fail");

    assert!(
        matches!(err, Error::Read(TransportError::HostKeyRejected { port: p, .. }) if p == port),
        "unexpected error: {err:?}"
    );

    server.abort();
}

#[tokio::test]
async fn test_changed_host_key_is_rejected_on_write() {
    let (port, server) = spawn_server().await;
    let hosts = known_hosts_with(&[format!("[127.0.0.1]:{port} {HOST_KEY}")]);

    let err = TransferClient::new()
        .write_file(&server_params(port, hosts.path()), "file", &b"data"[..])
        .await
        .expect_err("write should fail");

    assert!(
        matches!(err, Error::Write(TransportError::HostKeyRejected { .. })),
        "unexpected error: {err:?}"
    );

    server.abort();
}

#[tokio::test]
async fn test_missing_known_hosts_rejects_host_at_connect() {
    let (port, server) = spawn_server().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let params = server_params(port, &dir.path().join("missing_known_hosts"));

    let err = TransferClient::new()
        .read_file(&params, "file")
        .await
        .expect_err("read should fail");

    assert!(
        matches!(err, Error::Read(TransportError::HostKeyRejected { .. })),
        "unexpected error: {err:?}"
    );

    server.abort();
}

#[tokio::test]
async fn test_trusted_host_key_reaches_authentication() {
    let (port, server) = spawn_server().await;
    let hosts = known_hosts_with(&[
        format!("127.0.0.1 {HOST_KEY}"),
        format!("[127.0.0.1]:{port} {SERVER_HOST_KEY}"),
    ]);

    let err = TransferClient::new()
        .read_file(&server_params(port, hosts.path()), "file")
        .await
        .expect_err("read should fail");

    assert!(
        matches!(err, Error::Read(TransportError::AuthenticationRejected(ref user)) if user == "user"),
        "unexpected error: {err:?}"
    );

    server.abort();
}

#[tokio::test]
async fn test_malformed_private_key_is_session_creation_error() {
    let hosts = known_hosts();
    let mut key = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(key, "not a private key").expect("Failed to write key");

    let params = ConnectionParams::new("user", "127.0.0.1", 22, hosts.path(), key.path());

    let err = fast_client()
        .write_file(&params, "file", &b""[..])
        .await
        .expect_err("write should fail");

    assert!(matches!(
        err,
        Error::SessionCreation(TransportError::PrivateKey { .. })
    ));
}

#[tokio::test]
async fn test_empty_host_is_session_creation_error() {
    let hosts = known_hosts();
    let params = ConnectionParams::new("user", "", 22, hosts.path(), fixture_key());

    let err = fast_client()
        .read_file(&params, "file")
        .await
        .expect_err("read should fail");

    assert!(matches!(
        err,
        Error::SessionCreation(TransportError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_refused_connection_is_read_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
        listener.local_addr().expect("no local addr").port()
    };
    let hosts = known_hosts();
    let params = ConnectionParams::new("user", "127.0.0.1", port, hosts.path(), fixture_key());

    let err = fast_client()
        .read_file(&params, "file")
        .await
        .expect_err("read should fail");

    assert!(matches!(err, Error::Read(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_silent_server_times_out_session_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let port = listener.local_addr().expect("no local addr").port();

    // Accept and hold connections without ever sending an SSH banner
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let hosts = known_hosts();
    let params = ConnectionParams::new("user", "127.0.0.1", port, hosts.path(), fixture_key());

    let err = fast_client()
        .write_file(&params, "file", &b"data"[..])
        .await
        .expect_err("write should fail");

    assert!(matches!(err, Error::Write(_)));
    assert!(
        err.transport_cause().is_some_and(TransportError::is_timeout),
        "unexpected cause: {err:?}"
    );

    server.abort();
}
