//! # owlsh core
//!
//! Configuration types shared by the owlsh client library and binaries.

pub mod config;
pub mod error;

pub use config::{
    expand_tilde, ClientConfig, ConnectionOverrides, LogFormat, LoggingConfig, SshConfig,
    DEFAULT_PORT,
};
pub use error::{ConfigError, Result};
