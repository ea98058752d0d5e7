//! Line-oriented remote command mode
//!
//! Each line read from the user is run as a separate remote command and its
//! combined output is printed. No PTY is involved, so this works with piped
//! input as well as from a terminal.

use crate::{Client, CommandOutput, Error, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

const PROMPT: &str = "$ ";
const SEPARATOR: &str = "----------------------------------------";

/// Something that can run a remote command
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<CommandOutput>;
}

#[async_trait]
impl CommandRunner for Client {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        self.execute(command).await
    }
}

/// Read commands from `input` until `exit`, `quit` or end of input.
///
/// Command failures are printed and the loop continues; only I/O errors on
/// `input` or `output` end the session early.
pub async fn run_command_session<R, I, O>(
    runner: &R,
    target: &str,
    mut input: I,
    output: &mut O,
) -> Result<()>
where
    R: CommandRunner + ?Sized,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    output
        .write_all(
            format!(
                "Interactive command mode, type 'exit' to quit\n\
                 Connected to: {target}\n\
                 {SEPARATOR}\n"
            )
            .as_bytes(),
        )
        .await?;

    let mut buf = Vec::new();
    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            output.write_all(b"\nGoodbye!\n").await?;
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        let command = line.trim();
        if command == "exit" || command == "quit" {
            output.write_all(b"Goodbye!\n").await?;
            break;
        }
        if command.is_empty() {
            continue;
        }

        match runner.run(command).await {
            Ok(result) => output.write_all(&result.combined).await?,
            Err(Error::CommandFailed { status, output: text }) => {
                output.write_all(text.as_bytes()).await?;
                output
                    .write_all(format!("Command failed: exit status {status}\n").as_bytes())
                    .await?;
            }
            Err(e) => {
                debug!(error = %e, command = %command, "Remote command failed");
                output
                    .write_all(format!("Command failed: {e}\n").as_bytes())
                    .await?;
            }
        }
    }

    output.flush().await?;
    Ok(())
}
