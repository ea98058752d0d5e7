use anyhow::{Context, Result};
use owlsh_client::{start_sftp_session, Client};

pub async fn run(client: &Client) -> Result<()> {
    start_sftp_session(client)
        .await
        .context("SFTP session failed")
}
