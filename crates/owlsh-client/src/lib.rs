//! # owlsh client
//!
//! SSH and SFTP client sessions built on `russh` and `russh-sftp`.
//!
//! ## Features
//!
//! - Password and public key authentication
//! - Interactive shell with PTY and window resize
//! - Line-oriented remote command mode
//! - Interactive SFTP shell (`ls`, `cd`, `get`, `put`, `mkdir`, `rm`, `pwd`)
//! - One-shot upload and download

pub mod cli;
pub mod client;
pub mod error;
pub mod exec;
pub mod logging;
pub mod repl;
pub mod sftp;
pub mod shell;

pub use client::{Client, CommandOutput, ConnectOptions};
pub use error::{Error, Result};
pub use exec::{run_command_session, CommandRunner};
pub use repl::{start_sftp_session, Flow, SftpCommand, SftpShell};
pub use sftp::{download_file, upload_file, RemoteEntry, RemoteFs, SftpBackend};
pub use shell::start_shell;
