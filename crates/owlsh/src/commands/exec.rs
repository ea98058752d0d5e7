use anyhow::{Context, Result};
use owlsh_client::{run_command_session, Client};
use tokio::io::BufReader;

pub async fn run(client: &Client) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    run_command_session(
        client,
        &client.target(),
        BufReader::new(tokio::io::stdin()),
        &mut stdout,
    )
    .await
    .context("Command session failed")
}
