//! Interactive remote shell
//!
//! Requests a PTY sized to the local terminal when stdin is a terminal, puts
//! the local terminal into raw mode, and pumps stdin/stdout/stderr through a
//! shell channel until the remote side closes it.

use crate::{Client, Error, Result};
use crossterm::terminal;
use russh::ChannelMsg;
use std::io::IsTerminal;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

const STDIN_BUFFER_SIZE: usize = 4096;

/// Restores cooked mode when dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()
            .map_err(|e| Error::Pty(format!("failed to enable raw mode: {e}")))?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!(error = %e, "Failed to restore terminal mode");
        }
    }
}

/// Local terminal resize notifications (SIGWINCH)
struct ResizeWatcher {
    #[cfg(unix)]
    signal: Option<tokio::signal::unix::Signal>,
}

impl ResizeWatcher {
    fn new(enabled: bool) -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let signal = if enabled {
                signal(SignalKind::window_change())
                    .inspect_err(|e| warn!(error = %e, "Window resize events unavailable"))
                    .ok()
            } else {
                None
            };
            Self { signal }
        }

        #[cfg(not(unix))]
        {
            let _ = enabled;
            Self {}
        }
    }

    async fn changed(&mut self) {
        #[cfg(unix)]
        if let Some(signal) = self.signal.as_mut() {
            if signal.recv().await.is_some() {
                return;
            }
            self.signal = None;
        }

        std::future::pending::<()>().await;
    }
}

/// Run an interactive shell on `client` until the remote side exits.
///
/// Returns the remote exit status when the server reports one.
///
/// # Errors
///
/// `Error::Pty` when the local terminal cannot be queried or switched to raw
/// mode, SSH errors when the channel fails.
pub async fn start_shell(client: &Client, term: &str) -> Result<Option<u32>> {
    let mut channel = client.open_channel().await?;

    let mut pty = false;
    if std::io::stdin().is_terminal() {
        match terminal::size() {
            Ok((cols, rows)) => {
                debug!(term = %term, cols, rows, "Requesting PTY");
                channel
                    .request_pty(true, term, u32::from(cols), u32::from(rows), 0, 0, &[])
                    .await
                    .map_err(|e| Error::Pty(format!("failed to request PTY: {e}")))?;
                pty = true;
            }
            Err(e) => warn!(error = %e, "Could not read terminal size, continuing without PTY"),
        }
    }

    channel.request_shell(true).await?;
    info!(event = "shell_started", target = %client.target(), pty, "Remote shell started");

    let _raw_mode = if pty { Some(RawModeGuard::enable()?) } else { None };
    let mut resize = ResizeWatcher::new(pty);

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();
    let mut buf = vec![0u8; STDIN_BUFFER_SIZE];
    let mut stdin_closed = false;
    let mut exit_status = None;

    loop {
        tokio::select! {
            read = stdin.read(&mut buf), if !stdin_closed => {
                match read? {
                    0 => {
                        stdin_closed = true;
                        channel.eof().await?;
                    }
                    n => channel.data(&buf[..n]).await?,
                }
            }
            () = resize.changed() => {
                if let Ok((cols, rows)) = terminal::size() {
                    debug!(cols, rows, "Terminal resized");
                    channel.window_change(u32::from(cols), u32::from(rows), 0, 0).await?;
                }
            }
            msg = channel.wait() => {
                match msg {
                    Some(ChannelMsg::Data { ref data }) => {
                        stdout.write_all(data).await?;
                        stdout.flush().await?;
                    }
                    Some(ChannelMsg::ExtendedData { ref data, ext: 1 }) => {
                        stderr.write_all(data).await?;
                        stderr.flush().await?;
                    }
                    Some(ChannelMsg::ExitStatus { exit_status: status }) => {
                        exit_status = Some(status);
                        if !stdin_closed {
                            stdin_closed = true;
                            channel.eof().await?;
                        }
                    }
                    Some(ChannelMsg::Close) | None => break,
                    Some(_) => {}
                }
            }
        }
    }

    info!(event = "shell_ended", exit_status = ?exit_status, "Remote shell ended");
    Ok(exit_status)
}
