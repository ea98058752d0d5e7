//! owlsh SFTP binary
//!
//! Run with: cargo run --bin owlsh-sftp -- -H <host> -u <user> [--upload <local> --remote <path>]

use anyhow::Context;
use clap::Parser;
use owlsh_client::cli::{usage_examples, ConnectionArgs};
use owlsh_client::{download_file, logging, start_sftp_session, upload_file, Client, ConnectOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "owlsh-sftp")]
#[command(author, version, about = "SFTP file transfer client", long_about = None)]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Local file to upload (requires --remote)
    #[arg(long, conflicts_with = "download")]
    upload: Option<PathBuf>,

    /// Local destination for a download (requires --remote)
    #[arg(long)]
    download: Option<PathBuf>,

    /// Remote file path for --upload / --download
    #[arg(long)]
    remote: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.connection.client_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if !config.has_target() {
        eprintln!("Error: host and user are required\n");
        eprintln!("{}", usage_examples("owlsh-sftp"));
        return ExitCode::FAILURE;
    }

    let _log_guard = match logging::init(&config.logging, args.connection.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(event = "sftp_failed", error = %e, "SFTP operation failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, config: &owlsh_core::ClientConfig) -> anyhow::Result<()> {
    let ssh_config = config.ssh_config();
    let client = Client::connect(ssh_config, &ConnectOptions::from(config))
        .await
        .context("Failed to create SSH client")?;

    let result = transfer(args, &client).await;

    client.close().await.context("Disconnect failed")?;
    result
}

async fn transfer(args: &Args, client: &Client) -> anyhow::Result<()> {
    match (&args.upload, &args.download, &args.remote) {
        (Some(local), _, Some(remote)) => {
            println!("Uploading {} to {remote}...", local.display());
            let bytes = upload_file(client, local, remote)
                .await
                .context("File upload failed")?;
            println!("Upload complete ({bytes} bytes)");
        }
        (_, Some(local), Some(remote)) => {
            println!("Downloading {remote} to {}...", local.display());
            let bytes = download_file(client, remote, local)
                .await
                .context("File download failed")?;
            println!("Download complete ({bytes} bytes)");
        }
        _ => {
            println!("Starting SFTP session to {}...", client.config());
            start_sftp_session(client)
                .await
                .context("SFTP session failed")?;
        }
    }
    Ok(())
}
