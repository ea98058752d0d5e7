//! Live server tests
//!
//! Exercise command execution, authentication and the SFTP backend against a
//! real SSH server.
//!
//! ## Prerequisites
//!
//! - `OWLSH_TEST_HOST`: server host (tests are skipped when unset)
//! - `OWLSH_TEST_PORT`: server port, defaults to 22
//! - `OWLSH_TEST_USER`: login user
//! - `OWLSH_TEST_PASSWORD` and/or `OWLSH_TEST_KEY`: credentials
//!
//! The SFTP tests work in a scratch directory under `/tmp` on the server and
//! remove it afterwards.

use owlsh_client::{
    download_file, upload_file, Client, ConnectOptions, Error, RemoteFs, SftpBackend,
};
use owlsh_core::SshConfig;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

/// Server settings from the environment, or `None` to skip
fn live_config() -> Option<SshConfig> {
    let Ok(host) = std::env::var("OWLSH_TEST_HOST") else {
        eprintln!("OWLSH_TEST_HOST not set, skipping live server test");
        return None;
    };
    let user = std::env::var("OWLSH_TEST_USER").expect("OWLSH_TEST_USER must be set");
    let port = std::env::var("OWLSH_TEST_PORT")
        .ok()
        .map_or(22, |p| p.parse().expect("OWLSH_TEST_PORT must be a port number"));

    let mut config = SshConfig::new(host, user).with_port(port);
    if let Ok(password) = std::env::var("OWLSH_TEST_PASSWORD") {
        config = config.with_password(password);
    }
    if let Ok(key) = std::env::var("OWLSH_TEST_KEY") {
        config = config.with_key_file(PathBuf::from(key));
    }
    Some(config)
}

fn options() -> ConnectOptions {
    ConnectOptions {
        connect_timeout: Duration::from_secs(10),
        ..ConnectOptions::default()
    }
}

async fn connect(config: SshConfig) -> Client {
    Client::connect(config, &options())
        .await
        .expect("Failed to connect to test server")
}

/// Unique scratch directory name on the server
fn scratch_dir() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("/tmp/owlsh-test-{}-{nanos}", std::process::id())
}

#[tokio::test]
async fn test_execute_collects_output() {
    let Some(config) = live_config() else { return };
    let client = connect(config).await;

    let output = client.execute("echo 'Hello, World!'").await.unwrap();
    assert_eq!(output.stdout, b"Hello, World!\n");
    assert_eq!(output.exit_status, Some(0));

    let output = client.execute("echo oops 1>&2").await.unwrap();
    assert_eq!(output.stderr, b"oops\n");
    assert_eq!(output.combined_lossy(), "oops\n");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_execute_nonzero_exit() {
    let Some(config) = live_config() else { return };
    let client = connect(config).await;

    match client.execute("echo partial; exit 3").await {
        Err(Error::CommandFailed { status, output }) => {
            assert_eq!(status, 3);
            assert_eq!(output, "partial\n");
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let Some(config) = live_config() else { return };
    let config = SshConfig::new(config.host, config.username)
        .with_port(config.port)
        .with_password("owlsh-definitely-not-the-password");

    let result = Client::connect(config, &options()).await;
    assert!(
        matches!(result, Err(Error::Authentication(_))),
        "expected Authentication error"
    );
}

#[tokio::test]
async fn test_sftp_backend_round_trip() {
    let Some(config) = live_config() else { return };
    let client = connect(config).await;
    let backend = SftpBackend::open(&client).await.unwrap();

    let home = backend.canonicalize(".").await.unwrap();
    assert!(home.starts_with('/'));

    let dir = scratch_dir();
    backend.create_dir(&dir).await.unwrap();
    assert!(backend.stat(&dir).await.unwrap().is_dir);

    let local_dir = TempDir::new().unwrap();
    let source = local_dir.path().join("upload.txt");
    std::fs::write(&source, b"owlsh round trip\n").unwrap();

    let remote = format!("{dir}/upload.txt");
    assert_eq!(backend.upload(&source, &remote).await.unwrap(), 17);

    let entries = backend.read_dir(&dir).await.unwrap();
    assert!(entries.iter().all(|e| e.name != "." && e.name != ".."));
    let entry = entries
        .iter()
        .find(|e| e.name == "upload.txt")
        .expect("uploaded file missing from listing");
    assert!(!entry.is_dir);
    assert_eq!(entry.size, 17);

    // A directory as the source must leave the remote file intact
    let result = backend.upload(local_dir.path(), &remote).await;
    assert!(matches!(result, Err(Error::Usage(_))));
    assert_eq!(backend.stat(&remote).await.unwrap().size, 17);

    let copy = local_dir.path().join("copy.txt");
    assert_eq!(backend.download(&remote, &copy).await.unwrap(), 17);
    assert_eq!(std::fs::read(&copy).unwrap(), b"owlsh round trip\n");

    let missing = backend.stat(&format!("{dir}/absent")).await;
    assert!(matches!(missing, Err(Error::FileNotFound(_))));

    backend.remove_file(&remote).await.unwrap();
    backend.close().await.unwrap();

    client.execute(&format!("rmdir {dir}")).await.unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_one_shot_transfers() {
    let Some(config) = live_config() else { return };
    let client = connect(config).await;

    let dir = scratch_dir();
    client.execute(&format!("mkdir {dir}")).await.unwrap();

    let local_dir = TempDir::new().unwrap();
    let source = local_dir.path().join("data.bin");
    let payload: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();
    std::fs::write(&source, &payload).unwrap();

    let remote = format!("{dir}/data.bin");
    assert_eq!(upload_file(&client, &source, &remote).await.unwrap(), 100_000);

    let copy = local_dir.path().join("data.copy");
    assert_eq!(download_file(&client, &remote, &copy).await.unwrap(), 100_000);
    assert_eq!(std::fs::read(&copy).unwrap(), payload);

    client.execute(&format!("rm -r {dir}")).await.unwrap();
    client.close().await.unwrap();
}
