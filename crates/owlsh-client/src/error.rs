//! Error types for SSH and SFTP client operations

use owlsh_core::ConfigError;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::protocol::StatusCode;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Client error types
#[derive(Error, Debug)]
pub enum Error {
    /// Local I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection configuration rejected before dialing
    #[error("Configuration validation failed: {0}")]
    Config(#[from] ConfigError),

    /// SSH protocol error
    #[error("SSH error: {0}")]
    Ssh(String),

    /// Private key could not be read or decoded
    #[error("Failed to load private key: {0}")]
    KeyLoad(String),

    /// SFTP subsystem error
    #[error("SFTP error: {0}")]
    Sftp(String),

    /// Every configured authentication method was rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// TCP connect or SSH handshake failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation exceeded its time limit
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Pseudo-terminal or local terminal setup failed
    #[error("Terminal error: {0}")]
    Pty(String),

    /// Remote command exited with a non-zero status
    #[error("Command exited with status {status}")]
    CommandFailed {
        /// Remote exit status
        status: u32,
        /// Combined stdout and stderr
        output: String,
    },

    /// SSH channel closed before the operation completed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Remote file or directory does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Remote access denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Interactive command is missing an argument
    #[error("{0}")]
    Usage(String),

    /// Interactive command is not recognised
    #[error("Unknown command: {0}, type 'help' for a list of commands")]
    UnknownCommand(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if error is recoverable
    ///
    /// `true` if reconnecting and retrying could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::Connection(_) | Error::ChannelClosed(_)
        )
    }

    /// Check if error is due to user input
    ///
    /// Interactive sessions report these and keep running.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Usage(_)
                | Error::UnknownCommand(_)
                | Error::FileNotFound(_)
                | Error::PermissionDenied(_)
                | Error::NotADirectory(_)
                | Error::CommandFailed { .. }
        )
    }

    /// Create timeout error with context
    pub fn timeout(context: impl Into<String>) -> Self {
        Error::Timeout(context.into())
    }

    /// Create channel closed error
    pub fn channel_closed(context: impl Into<String>) -> Self {
        Error::ChannelClosed(context.into())
    }

    /// Create usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }
}

impl From<russh::Error> for Error {
    fn from(err: russh::Error) -> Self {
        Error::Ssh(err.to_string())
    }
}

impl From<russh::keys::Error> for Error {
    fn from(err: russh::keys::Error) -> Self {
        Error::KeyLoad(err.to_string())
    }
}

impl From<SftpError> for Error {
    fn from(err: SftpError) -> Self {
        match err {
            SftpError::Status(status) if matches!(status.status_code, StatusCode::NoSuchFile) => {
                Error::FileNotFound(status.error_message)
            }
            SftpError::Status(status)
                if matches!(status.status_code, StatusCode::PermissionDenied) =>
            {
                Error::PermissionDenied(status.error_message)
            }
            other => Error::Sftp(other.to_string()),
        }
    }
}
