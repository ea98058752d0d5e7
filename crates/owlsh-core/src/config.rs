//! Connection and client configuration
//!
//! [`SshConfig`] is the validated set of connection parameters handed to the
//! connection factory. [`ClientConfig`] is the on-disk TOML format that the
//! binaries merge with their command-line flags before building an
//! [`SshConfig`].

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;
use std::path::{Path, PathBuf};

/// Standard SSH port
pub const DEFAULT_PORT: u16 = 22;

/// Connection parameters for a single SSH server
#[derive(Clone, PartialEq, Eq)]
pub struct SshConfig {
    /// Server address, e.g. `192.168.1.100` or `example.com`
    pub host: String,
    /// Server port
    pub port: u16,
    /// Login user
    pub username: String,
    /// Password for password authentication
    pub password: Option<String>,
    /// Private key file for public key authentication
    pub key_file: Option<PathBuf>,
}

impl SshConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: None,
            key_file: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_key_file(mut self, key_file: impl Into<PathBuf>) -> Self {
        self.key_file = Some(key_file.into());
        self
    }

    /// Check that the configuration is complete enough to attempt a connection.
    ///
    /// # Errors
    ///
    /// Returns the first failed check: empty host, empty username, port 0,
    /// no credentials at all, or a key file that does not exist.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }

        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingUsername);
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if !self.has_password_auth() && !self.has_key_auth() {
            return Err(ConfigError::MissingCredentials);
        }

        if let Some(key_file) = self.key_file.as_ref().filter(|_| self.has_key_auth()) {
            if !key_file.exists() {
                return Err(ConfigError::KeyFileNotFound(key_file.clone()));
            }
        }

        Ok(())
    }

    /// `host:port`, with IPv6 literals bracketed.
    pub fn address(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn has_key_auth(&self) -> bool {
        self.key_file
            .as_ref()
            .is_some_and(|path| !path.as_os_str().is_empty())
    }

    pub fn has_password_auth(&self) -> bool {
        self.password.as_ref().is_some_and(|p| !p.is_empty())
    }
}

impl fmt::Display for SshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.address())
    }
}

impl fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .finish()
    }
}

/// Client configuration file
///
/// Every field is optional in the file; connection fields are usually
/// supplied or overridden on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address
    #[serde(default)]
    pub host: Option<String>,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login user
    #[serde(default)]
    pub username: Option<String>,

    /// Login password
    #[serde(default)]
    pub password: Option<String>,

    /// Private key file, `~` is expanded
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// TCP connect and SSH handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Terminal type requested for interactive shells
    #[serde(default = "default_term")]
    pub term: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (text or json)
    pub format: LogFormat,
    /// Optional log file path (logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text logging for human readability
    Text,
    /// JSON structured logging
    Json,
}

/// Connection values given on the command line; `Some` wins over the file.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub key_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
            username: None,
            password: None,
            key_file: None,
            connect_timeout_secs: default_connect_timeout(),
            term: default_term(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the client-side settings that are not part of [`SshConfig`]
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.term.trim().is_empty() {
            return Err(ConfigError::Invalid("term must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn merge_overrides(mut self, overrides: ConnectionOverrides) -> Self {
        if overrides.host.is_some() {
            self.host = overrides.host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if overrides.username.is_some() {
            self.username = overrides.username;
        }
        if overrides.password.is_some() {
            self.password = overrides.password;
        }
        if overrides.key_file.is_some() {
            self.key_file = overrides.key_file;
        }
        self
    }

    /// Whether both a host and a user are known
    pub fn has_target(&self) -> bool {
        let present =
            |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.host) && present(&self.username)
    }

    pub fn ssh_config(&self) -> SshConfig {
        SshConfig {
            host: self.host.clone().unwrap_or_default(),
            port: self.port,
            username: self.username.clone().unwrap_or_default(),
            password: self.password.clone().filter(|p| !p.is_empty()),
            key_file: self.key_file.as_deref().map(expand_tilde),
        }
    }
}

/// Replace a leading `~` with the value of `$HOME`.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = std::env::var_os("HOME") {
            let rest = path.strip_prefix("~").unwrap_or(path);
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_term() -> String {
    "xterm".to_string()
}
