//! Integration tests for the server lifecycle.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use yoshimi::{ServerHandle, ShutdownOutcome};
use yoshimi_core::{Error, ServerConfig};

fn fixture_key() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("test_host_key")
}

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.host_key = fixture_key();
    config.gate.secret = "open-sesame".to_string();
    config.script.path = PathBuf::from("/bin/echo");
    config
}

#[tokio::test]
async fn test_missing_host_key_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.server.host_key = dir.path().join("no_such_key");

    let err = ServerHandle::start(config).await.unwrap_err();
    assert!(matches!(err, Error::HostKey(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn test_port_in_use_fails_to_start() {
    let server = ServerHandle::start(test_config()).await.unwrap();

    let mut config = test_config();
    config.server.port = server.local_addr().port();
    let err = ServerHandle::start(config).await.unwrap_err();
    assert!(matches!(err, Error::Bind { .. }), "unexpected error: {err}");

    server.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_stop_without_connections_is_graceful() {
    let server = ServerHandle::start(test_config()).await.unwrap();
    assert_ne!(server.local_addr().port(), 0);
    assert_eq!(server.registry().count(), 0);

    let outcome = server.stop(Duration::from_secs(5)).await;
    assert_eq!(outcome, ShutdownOutcome::Graceful);
}

#[tokio::test]
async fn test_server_sends_ssh_banner() {
    let server = ServerHandle::start(test_config()).await.unwrap();
    let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();

    let mut buf = [0u8; 8];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("no banner")
        .unwrap();
    assert_eq!(&buf, b"SSH-2.0-");

    drop(stream);
    server.stop(Duration::from_secs(5)).await;
}

#[tokio::test]
async fn test_stalled_connection_is_closed_within_bound() {
    let server = ServerHandle::start(test_config()).await.unwrap();
    let addr = server.local_addr();

    // Connects but never speaks SSH.
    let mut stream = TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let outcome = server.stop(Duration::from_millis(200)).await;
    assert_eq!(outcome, ShutdownOutcome::Forced);
    assert!(started.elapsed() < Duration::from_secs(5));

    // The server side is gone: reads drain the banner, then hit EOF or reset.
    let mut sink = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut sink)).await;
    assert!(read.is_ok(), "connection was not closed");

    // No new connections after stop.
    assert!(TcpStream::connect(addr).await.is_err());
}
