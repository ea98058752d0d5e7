//! Remote file system access over SFTP
//!
//! [`RemoteFs`] is the seam between the interactive SFTP shell and the
//! `russh-sftp` session, so the shell can be driven against other
//! implementations.

use crate::{Client, Error, Result};
use async_trait::async_trait;
use russh_sftp::client::SftpSession;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// A directory entry or stat result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Remote file operations used by the SFTP shell
///
/// Paths are absolute or relative to the server's initial directory.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Resolve `path` to an absolute path on the server
    async fn canonicalize(&self, path: &str) -> Result<String>;

    /// List a directory, without `.` and `..`
    async fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    async fn stat(&self, path: &str) -> Result<RemoteEntry>;

    async fn create_dir(&self, path: &str) -> Result<()>;

    async fn remove_file(&self, path: &str) -> Result<()>;

    /// Copy a remote file to `local`, returning the number of bytes copied
    async fn download(&self, remote: &str, local: &Path) -> Result<u64>;

    /// Copy `local` to a remote file, returning the number of bytes copied
    async fn upload(&self, local: &Path, remote: &str) -> Result<u64>;
}

/// [`RemoteFs`] over an SFTP subsystem channel
pub struct SftpBackend {
    session: SftpSession,
}

impl SftpBackend {
    /// Open an `sftp` subsystem channel on `client`.
    pub async fn open(client: &Client) -> Result<Self> {
        let channel = client.open_channel().await?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| Error::Sftp(format!("failed to request SFTP subsystem: {e}")))?;

        let session = SftpSession::new(channel.into_stream()).await?;
        debug!(event = "sftp_opened", target = %client.target(), "SFTP session opened");

        Ok(Self { session })
    }

    pub async fn close(self) -> Result<()> {
        self.session.close().await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteFs for SftpBackend {
    async fn canonicalize(&self, path: &str) -> Result<String> {
        Ok(self.session.canonicalize(path).await?)
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let entries = self.session.read_dir(path).await?;
        Ok(entries
            .filter(|entry| is_listed(&entry.file_name()))
            .map(|entry| RemoteEntry {
                name: entry.file_name(),
                is_dir: entry.file_type().is_dir(),
                size: entry.metadata().size.unwrap_or(0),
            })
            .collect())
    }

    async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        let metadata = self.session.metadata(path).await?;
        Ok(RemoteEntry {
            name: file_name(path).to_string(),
            is_dir: metadata.is_dir(),
            size: metadata.size.unwrap_or(0),
        })
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        Ok(self.session.create_dir(path).await?)
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        Ok(self.session.remove_file(path).await?)
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<u64> {
        let mut remote_file = self.session.open(remote).await?;
        let mut local_file = File::create(local).await?;

        let bytes = tokio::io::copy(&mut remote_file, &mut local_file).await?;
        local_file.flush().await?;

        debug!(
            event = "download",
            remote = %remote,
            local = %local.display(),
            bytes,
            "Downloaded file"
        );
        Ok(bytes)
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<u64> {
        // Creating the remote file truncates it, so check the source first
        let mut local_file = open_upload_source(local).await?;
        let mut remote_file = self.session.create(remote).await?;

        let bytes = tokio::io::copy(&mut local_file, &mut remote_file).await?;
        remote_file.shutdown().await?;

        debug!(
            event = "upload",
            local = %local.display(),
            remote = %remote,
            bytes,
            "Uploaded file"
        );
        Ok(bytes)
    }
}

/// Upload a single file on its own SFTP session.
pub async fn upload_file(client: &Client, local: &Path, remote: &str) -> Result<u64> {
    let backend = SftpBackend::open(client).await?;
    let result = backend.upload(local, remote).await;
    backend.close().await?;

    let bytes = result?;
    info!(
        event = "upload_complete",
        local = %local.display(),
        remote = %remote,
        bytes,
        "Upload complete"
    );
    Ok(bytes)
}

/// Download a single file on its own SFTP session.
pub async fn download_file(client: &Client, remote: &str, local: &Path) -> Result<u64> {
    let backend = SftpBackend::open(client).await?;
    let result = backend.download(remote, local).await;
    backend.close().await?;

    let bytes = result?;
    info!(
        event = "download_complete",
        remote = %remote,
        local = %local.display(),
        bytes,
        "Download complete"
    );
    Ok(bytes)
}

/// Open `local` for upload, rejecting anything that is not a regular file.
async fn open_upload_source(local: &Path) -> Result<File> {
    let file = File::open(local).await?;
    if !file.metadata().await?.is_file() {
        return Err(Error::usage(format!(
            "{} is not a regular file",
            local.display()
        )));
    }
    Ok(file)
}

/// Directory listings leave out the `.` and `..` entries
fn is_listed(name: &str) -> bool {
    name != "." && name != ".."
}

/// Last component of a `/`-separated remote path, ignoring trailing slashes
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/var/log/syslog"), "syslog");
        assert_eq!(file_name("notes.txt"), "notes.txt");
        assert_eq!(file_name("dir/sub/"), "sub");
        assert_eq!(file_name("/"), "");
    }

    #[tokio::test]
    async fn test_upload_source_must_be_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_upload_source(dir.path()).await;
        assert!(matches!(result, Err(Error::Usage(msg)) if msg.contains("not a regular file")));

        let file = dir.path().join("payload.bin");
        std::fs::write(&file, b"data").unwrap();
        assert!(open_upload_source(&file).await.is_ok());

        let missing = open_upload_source(&dir.path().join("absent")).await;
        assert!(matches!(missing, Err(Error::Io(_))));
    }

    #[test]
    fn test_listing_skips_dot_entries() {
        let names = [".", "..", ".bashrc", "..data", "notes.txt"];
        let listed: Vec<&str> = names.into_iter().filter(|n| is_listed(n)).collect();
        assert_eq!(listed, vec![".bashrc", "..data", "notes.txt"]);
    }
}
