mod commands;

use clap::{Parser, ValueEnum};
use owlsh_client::cli::{usage_examples, ConnectionArgs};
use owlsh_client::{logging, Client, ConnectOptions};
use tracing::error;

#[derive(Parser)]
#[command(name = "owlsh")]
#[command(about = "SSH client with interactive shell and SFTP modes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Session mode
    #[arg(short, long, value_enum, default_value_t = Mode::Ssh)]
    mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Interactive remote shell
    Ssh,
    /// Interactive SFTP file transfer
    Sftp,
    /// Run one remote command per input line
    Exec,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli.connection.client_config()?;
    if !config.has_target() {
        eprintln!("Error: host and user are required\n");
        eprintln!("{}", usage_examples("owlsh"));
        std::process::exit(1);
    }

    let log_guard = logging::init(&config.logging, cli.connection.verbose)?;

    let ssh_config = config.ssh_config();
    let target = ssh_config.to_string();
    let client = match Client::connect(ssh_config, &ConnectOptions::from(&config)).await {
        Ok(client) => client,
        Err(e) => {
            error!(
                event = "connect_failed",
                target = %target,
                error = %e,
                "Failed to create SSH client"
            );
            eprintln!("Failed to create SSH client: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.mode {
        Mode::Ssh => {
            println!("Connecting to {target}...");
            commands::ssh::run(&client, &config.term).await
        }
        Mode::Sftp => {
            println!("Starting SFTP session to {target}...");
            commands::sftp::run(&client).await.map(|()| 0)
        }
        Mode::Exec => commands::exec::run(&client).await.map(|()| 0),
    };

    if let Err(e) = client.close().await {
        error!(event = "disconnect_failed", error = %e, "Disconnect failed");
    }

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    };

    // A pending stdin read would keep the runtime alive, so exit directly
    drop(log_guard);
    std::process::exit(code);
}
