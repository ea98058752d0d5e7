use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Host must not be empty")]
    MissingHost,

    #[error("Username must not be empty")]
    MissingUsername,

    #[error("Port must be in the range 1-65535 (got {0})")]
    InvalidPort(u16),

    #[error("Either a password or a private key file must be provided")]
    MissingCredentials,

    #[error("Private key file does not exist: {}", .0.display())]
    KeyFileNotFound(PathBuf),

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
