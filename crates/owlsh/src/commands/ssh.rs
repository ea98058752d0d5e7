use anyhow::{Context, Result};
use owlsh_client::{start_shell, Client};
use tracing::info;

/// Run an interactive shell and return the process exit code to use.
pub async fn run(client: &Client, term: &str) -> Result<i32> {
    let exit_status = start_shell(client, term)
        .await
        .context("SSH session ended abnormally")?;

    info!(exit_status = ?exit_status, "SSH session finished");

    Ok(exit_status.map_or(0, |status| i32::try_from(status).unwrap_or(1)))
}
