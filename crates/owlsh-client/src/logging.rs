//! Tracing subscriber setup for the owlsh binaries

use crate::{Error, Result};
use owlsh_core::{LogFormat, LoggingConfig};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const VERBOSE_FILTER: &str = "debug,russh=info";

/// Filter directive for the given settings; `--verbose` beats the config file.
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        VERBOSE_FILTER.to_string()
    } else {
        config.level.clone()
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level. When a log file is configured
/// the returned guard must be kept alive until exit so buffered lines are
/// flushed.
///
/// # Errors
///
/// Fails if the log directory cannot be created or a subscriber is already
/// installed.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let directive = filter_directive(config, verbose);
    let filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    let Some(log_file) = config.file.as_deref() else {
        let installed = match config.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .try_init(),
        };
        installed.map_err(|e| Error::Other(format!("failed to initialize logging: {e}")))?;
        return Ok(None);
    };

    let directory = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = log_file
        .file_name()
        .ok_or_else(|| Error::Other(format!("log file has no file name: {}", log_file.display())))?;

    std::fs::create_dir_all(directory)?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(non_blocking)
            .with_current_span(true)
            .with_span_list(true)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(non_blocking)
            .with_ansi(false)
            .try_init(),
    };
    installed.map_err(|e| Error::Other(format!("failed to initialize logging: {e}")))?;

    Ok(Some(guard))
}
