//! Interactive SFTP shell
//!
//! Parses `sftp>` command lines into [`SftpCommand`] values and runs them
//! against a [`RemoteFs`], keeping a client-side remote working directory
//! that relative paths resolve against.

use crate::sftp::{file_name, RemoteFs, SftpBackend};
use crate::{Client, Error, Result};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

const PROMPT: &str = "sftp> ";
const SEPARATOR: &str = "----------------------------------------";

const HELP: &str = "\
Available SFTP commands:
  ls [dir]              - list remote directory contents
  pwd                   - print remote working directory
  cd <dir>              - change remote working directory
  get <remote> [local]  - download a file
  put <local> [remote]  - upload a file
  mkdir <dir>           - create a remote directory
  rm <file>             - remove a remote file
  help                  - show this help
  exit/quit             - leave the SFTP session
";

/// A parsed SFTP shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SftpCommand {
    Help,
    Ls { path: String },
    Pwd,
    Cd { path: String },
    Get { remote: String, local: PathBuf },
    Put { local: PathBuf, remote: String },
    Mkdir { path: String },
    Rm { path: String },
    Exit,
}

impl SftpCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// `Error::Usage` when a required argument is missing,
    /// `Error::UnknownCommand` for anything not in the command table.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = parts.collect();
        let first = args.first().copied();

        let command = match name {
            "help" => Self::Help,
            "ls" | "dir" => Self::Ls {
                path: first.unwrap_or(".").to_string(),
            },
            "pwd" => Self::Pwd,
            "cd" => Self::Cd {
                path: required(first, "Please specify a directory to change to")?,
            },
            "get" => {
                let remote = required(first, "Please specify the remote file to download")?;
                let local = match args.get(1) {
                    Some(local) => PathBuf::from(local),
                    None => default_local_name(&remote)?,
                };
                Self::Get { remote, local }
            }
            "put" => {
                let local =
                    PathBuf::from(required(first, "Please specify the local file to upload")?);
                let remote = match args.get(1) {
                    Some(remote) => (*remote).to_string(),
                    None => default_remote_name(&local)?,
                };
                Self::Put { local, remote }
            }
            "mkdir" => Self::Mkdir {
                path: required(first, "Please specify the directory to create")?,
            },
            "rm" => Self::Rm {
                path: required(first, "Please specify the file to remove")?,
            },
            "exit" | "quit" => Self::Exit,
            other => return Err(Error::UnknownCommand(other.to_string())),
        };

        Ok(Some(command))
    }
}

fn required(arg: Option<&str>, message: &str) -> Result<String> {
    arg.map(str::to_string).ok_or_else(|| Error::usage(message))
}

fn default_local_name(remote: &str) -> Result<PathBuf> {
    match file_name(remote) {
        "" | "." | ".." => Err(Error::usage(format!(
            "Cannot derive a local file name from '{remote}', please specify one"
        ))),
        name => Ok(PathBuf::from(name)),
    }
}

fn default_remote_name(local: &Path) -> Result<String> {
    local
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::usage(format!(
                "Cannot derive a remote file name from '{}', please specify one",
                local.display()
            ))
        })
}

/// Whether the shell should keep reading commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// SFTP shell state: the remote file system plus the working directory
pub struct SftpShell<F> {
    fs: F,
    cwd: String,
    target: String,
}

impl<F: RemoteFs> SftpShell<F> {
    /// Start in the server's initial directory, or `/` if it cannot be resolved.
    pub async fn new(fs: F, target: impl Into<String>) -> Self {
        let cwd = match fs.canonicalize(".").await {
            Ok(cwd) => cwd,
            Err(e) => {
                warn!(error = %e, "Could not resolve remote working directory, using /");
                "/".to_string()
            }
        };

        Self {
            fs,
            cwd,
            target: target.into(),
        }
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn into_inner(self) -> F {
        self.fs
    }

    /// Resolve `path` against the working directory and normalize `.`/`..`.
    pub fn resolve(&self, path: &str) -> String {
        let joined = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", self.cwd, path)
        };
        normalize(&joined)
    }

    /// Run one command, writing its output to `out`.
    pub async fn execute<O>(&mut self, command: &SftpCommand, out: &mut O) -> Result<Flow>
    where
        O: AsyncWrite + Unpin,
    {
        match command {
            SftpCommand::Help => out.write_all(HELP.as_bytes()).await?,
            SftpCommand::Ls { path } => {
                let dir = self.resolve(path);
                let mut entries = self.fs.read_dir(&dir).await?;
                entries.sort_by(|a, b| a.name.cmp(&b.name));

                let mut listing = format!("Contents of {dir}:\n");
                for entry in &entries {
                    let kind = if entry.is_dir { 'd' } else { '-' };
                    listing.push_str(&format!("{kind} {:>8} {}\n", entry.size, entry.name));
                }
                out.write_all(listing.as_bytes()).await?;
            }
            SftpCommand::Pwd => out.write_all(format!("{}\n", self.cwd).as_bytes()).await?,
            SftpCommand::Cd { path } => {
                let target = self.fs.canonicalize(&self.resolve(path)).await?;
                let entry = self.fs.stat(&target).await?;
                if !entry.is_dir {
                    return Err(Error::NotADirectory(path.clone()));
                }
                debug!(from = %self.cwd, to = %target, "Changing remote directory");
                self.cwd = target;
            }
            SftpCommand::Get { remote, local } => {
                let remote = self.resolve(remote);
                out.write_all(
                    format!("Downloading {remote} to {}...\n", local.display()).as_bytes(),
                )
                .await?;
                let bytes = self.fs.download(&remote, local).await?;
                out.write_all(format!("Transferred {bytes} bytes\n").as_bytes())
                    .await?;
            }
            SftpCommand::Put { local, remote } => {
                let remote = self.resolve(remote);
                out.write_all(
                    format!("Uploading {} to {remote}...\n", local.display()).as_bytes(),
                )
                .await?;
                let bytes = self.fs.upload(local, &remote).await?;
                out.write_all(format!("Transferred {bytes} bytes\n").as_bytes())
                    .await?;
            }
            SftpCommand::Mkdir { path } => {
                self.fs.create_dir(&self.resolve(path)).await?;
                out.write_all(format!("Directory {path} created\n").as_bytes())
                    .await?;
            }
            SftpCommand::Rm { path } => {
                self.fs.remove_file(&self.resolve(path)).await?;
                out.write_all(format!("File {path} removed\n").as_bytes())
                    .await?;
            }
            SftpCommand::Exit => {
                out.write_all(b"Goodbye!\n").await?;
                return Ok(Flow::Exit);
            }
        }

        Ok(Flow::Continue)
    }

    /// Read and run commands until `exit`/`quit` or end of input.
    ///
    /// Command errors are printed as `Error: ...` and the loop continues.
    pub async fn run<I, O>(&mut self, mut input: I, out: &mut O) -> Result<()>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        out.write_all(
            format!(
                "Entering SFTP interactive mode, type 'help' for available commands\n\
                 Connected to: {}\n\
                 Remote directory: {}\n\
                 {SEPARATOR}\n",
                self.target, self.cwd
            )
            .as_bytes(),
        )
        .await?;

        let mut buf = Vec::new();
        loop {
            out.write_all(PROMPT.as_bytes()).await?;
            out.flush().await?;

            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                out.write_all(b"\nGoodbye!\n").await?;
                break;
            }

            // Non-UTF-8 bytes are replaced rather than ending the session
            let line = String::from_utf8_lossy(&buf);
            let outcome = match SftpCommand::parse(&line) {
                Ok(Some(command)) => self.execute(&command, out).await,
                Ok(None) => continue,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => {
                    if !e.is_client_error() {
                        warn!(error = %e, "SFTP command failed");
                    }
                    out.write_all(format!("Error: {e}\n").as_bytes()).await?;
                }
            }
        }

        out.flush().await?;
        Ok(())
    }
}

/// Run the interactive SFTP shell on stdin/stdout.
pub async fn start_sftp_session(client: &Client) -> Result<()> {
    let backend = SftpBackend::open(client).await?;
    let mut shell = SftpShell::new(backend, client.target()).await;

    let mut stdout = tokio::io::stdout();
    let result = shell.run(BufReader::new(tokio::io::stdin()), &mut stdout).await;

    shell.into_inner().close().await?;
    result
}

/// Lexically normalize an absolute `/`-separated path.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    format!("/{}", parts.join("/"))
}
