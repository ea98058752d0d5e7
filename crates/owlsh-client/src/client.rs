//! SSH connection factory
//!
//! Wraps `russh` client setup: configuration validation, TCP connect and
//! handshake under a timeout, password and public key authentication, and
//! remote command execution on session channels.

use crate::{Error, Result};
use owlsh_core::{ClientConfig, SshConfig};
use russh::client::{Handle, Handler, Msg};
use russh::keys::{HashAlg, PrivateKey, PrivateKeyWithHashAlg, PublicKey};
use russh::{Channel, ChannelMsg, Disconnect};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default TCP connect and handshake timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport options that are not part of the connection identity
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Upper bound for TCP connect plus SSH handshake
    pub connect_timeout: Duration,
    /// Interval between SSH keepalive requests
    pub keepalive_interval: Option<Duration>,
    /// Close the connection after this long without traffic
    pub inactivity_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive_interval: Some(Duration::from_secs(30)),
            inactivity_timeout: None,
        }
    }
}

impl From<&ClientConfig> for ConnectOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            ..Self::default()
        }
    }
}

/// Output of a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// stdout and stderr interleaved in arrival order
    pub combined: Vec<u8>,
    pub exit_status: Option<u32>,
}

impl CommandOutput {
    pub fn combined_lossy(&self) -> String {
        String::from_utf8_lossy(&self.combined).into_owned()
    }

    pub fn success(&self) -> bool {
        self.exit_status.is_none_or(|status| status == 0)
    }
}

/// Host keys are accepted as presented; trust management is left to the user.
pub(crate) struct ClientHandler {
    host: String,
}

impl Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        debug!(
            event = "host_key_accepted",
            host = %self.host,
            algorithm = %server_public_key.algorithm().as_str(),
            fingerprint = %server_public_key.fingerprint(HashAlg::Sha256),
            "Accepting server host key without verification"
        );
        Ok(true)
    }
}

/// An authenticated SSH connection
pub struct Client {
    handle: Handle<ClientHandler>,
    config: SshConfig,
}

impl Client {
    /// Validate `config`, connect and authenticate.
    ///
    /// # Errors
    ///
    /// `Error::Config` when validation fails, `Error::KeyLoad` when the key
    /// file cannot be decoded, `Error::Timeout` / `Error::Connection` when the
    /// server cannot be reached, `Error::Authentication` when every configured
    /// method is rejected.
    pub async fn connect(config: SshConfig, options: &ConnectOptions) -> Result<Self> {
        config.validate()?;

        // Decode the key before dialing so a bad key file fails fast
        let key = load_private_key(&config)?;

        let ssh_config = Arc::new(russh::client::Config {
            inactivity_timeout: options.inactivity_timeout,
            keepalive_interval: options.keepalive_interval,
            ..Default::default()
        });

        let handler = ClientHandler {
            host: config.host.clone(),
        };

        info!(
            event = "connecting",
            address = %config.address(),
            username = %config.username,
            "Connecting to SSH server"
        );

        let address = (config.host.clone(), config.port);
        let connect = russh::client::connect(ssh_config, address, handler);
        let mut handle = timeout(options.connect_timeout, connect)
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "connecting to {} after {}s",
                    config.address(),
                    options.connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::Connection(format!("{}: {e}", config.address())))?;

        authenticate(&mut handle, &config, key).await?;

        info!(
            event = "connected",
            address = %config.address(),
            username = %config.username,
            "SSH connection established"
        );

        Ok(Self { handle, config })
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// `user@host`, used in session banners
    pub fn target(&self) -> String {
        format!("{}@{}", self.config.username, self.config.host)
    }

    /// Open a new session channel on this connection.
    pub async fn open_channel(&self) -> Result<Channel<Msg>> {
        self.handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Ssh(format!("failed to open session channel: {e}")))
    }

    /// Run a single command and collect its output.
    ///
    /// # Errors
    ///
    /// `Error::CommandFailed` carries the collected output when the command
    /// exits with a non-zero status. `Error::ChannelClosed` when the channel
    /// ends without reporting an exit status.
    pub async fn execute(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self.open_channel().await?;
        debug!(event = "exec", command = %command, "Executing remote command");
        channel.exec(true, command).await?;

        let mut output = CommandOutput::default();
        let mut signal = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => {
                    output.stdout.extend_from_slice(data);
                    output.combined.extend_from_slice(data);
                }
                ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                    output.stderr.extend_from_slice(data);
                    output.combined.extend_from_slice(data);
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    output.exit_status = Some(exit_status);
                }
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    signal = Some(format!("{signal_name:?}"));
                }
                _ => {}
            }
        }

        debug!(
            event = "exec_completed",
            command = %command,
            exit_status = ?output.exit_status,
            bytes = output.combined.len(),
            "Remote command completed"
        );

        command_result(output, signal)
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Disconnect from the server. No-op on a closed connection.
    pub async fn close(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }

        info!(event = "disconnecting", address = %self.config.address(), "Disconnecting");
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(Error::from)
    }
}

/// A command that ends without an exit status was killed or its channel dropped.
fn command_result(output: CommandOutput, signal: Option<String>) -> Result<CommandOutput> {
    match (output.exit_status, signal) {
        (Some(_), _) if output.success() => Ok(output),
        (Some(status), _) => Err(Error::CommandFailed {
            status,
            output: output.combined_lossy(),
        }),
        (None, Some(signal)) => Err(Error::channel_closed(format!(
            "command terminated by signal {signal}"
        ))),
        (None, None) => Err(Error::channel_closed(
            "command ended without an exit status",
        )),
    }
}

fn load_private_key(config: &SshConfig) -> Result<Option<PrivateKey>> {
    if !config.has_key_auth() {
        return Ok(None);
    }

    match config.key_file.as_deref() {
        Some(path) => {
            let key = russh::keys::load_secret_key(path, None)
                .map_err(|e| Error::KeyLoad(format!("{}: {e}", path.display())))?;
            Ok(Some(key))
        }
        None => Ok(None),
    }
}

/// Try password first, then the private key. The first accepted method wins.
async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    config: &SshConfig,
    key: Option<PrivateKey>,
) -> Result<()> {
    let mut attempted = Vec::new();

    if let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) {
        attempted.push("password");
        let result = handle
            .authenticate_password(config.username.as_str(), password)
            .await?;
        if result.success() {
            debug!(event = "auth_success", method = "password", "Authenticated");
            return Ok(());
        }
        warn!(
            event = "auth_rejected",
            method = "password",
            username = %config.username,
            "Password authentication rejected"
        );
    }

    if let Some(key) = key {
        attempted.push("publickey");
        let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
        let result = handle
            .authenticate_publickey(
                config.username.as_str(),
                PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
            )
            .await?;
        if result.success() {
            debug!(event = "auth_success", method = "publickey", "Authenticated");
            return Ok(());
        }
        warn!(
            event = "auth_rejected",
            method = "publickey",
            username = %config.username,
            "Public key authentication rejected"
        );
    }

    Err(Error::Authentication(format!(
        "server rejected {} for user {}",
        attempted.join(", "),
        config.username
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use owlsh_core::ConfigError;

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = SshConfig::new("", "root").with_password("pw");
        let result = Client::connect(config, &ConnectOptions::default()).await;
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MissingHost))
        ));

        let config = SshConfig::new("example.com", "root");
        let result = Client::connect(config, &ConnectOptions::default()).await;
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MissingCredentials))
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_unparseable_key() {
        let key = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(key.path(), "not a private key").unwrap();

        let config = SshConfig::new("127.0.0.1", "root").with_key_file(key.path());
        let result = Client::connect(config, &ConnectOptions::default()).await;
        assert!(matches!(result, Err(Error::KeyLoad(_))));
    }

    #[test]
    fn test_load_generated_key() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("id_ed25519");
        let generated = std::process::Command::new("ssh-keygen")
            .args(["-q", "-t", "ed25519", "-N", "", "-C", "owlsh@test", "-f"])
            .arg(&key_path)
            .status();
        if !generated.is_ok_and(|status| status.success()) {
            eprintln!("ssh-keygen not available, skipping");
            return;
        }

        let config = SshConfig::new("example.com", "root").with_key_file(&key_path);
        let key = load_private_key(&config).unwrap().unwrap();
        assert_eq!(key.algorithm().as_str(), "ssh-ed25519");

        let password_only = SshConfig::new("example.com", "root").with_password("pw");
        assert!(load_private_key(&password_only).unwrap().is_none());
    }

    #[test]
    fn test_command_result() {
        let ok = CommandOutput {
            combined: b"hi\n".to_vec(),
            exit_status: Some(0),
            ..CommandOutput::default()
        };
        assert_eq!(command_result(ok.clone(), None).unwrap(), ok);

        let failed = CommandOutput {
            combined: b"ls: cannot access 'x'\n".to_vec(),
            exit_status: Some(2),
            ..CommandOutput::default()
        };
        match command_result(failed, None) {
            Err(Error::CommandFailed { status, output }) => {
                assert_eq!(status, 2);
                assert_eq!(output, "ls: cannot access 'x'\n");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }

        let killed = command_result(CommandOutput::default(), Some("KILL".to_string()));
        assert!(matches!(killed, Err(Error::ChannelClosed(msg)) if msg.contains("KILL")));

        let dropped = command_result(CommandOutput::default(), None);
        assert!(matches!(dropped, Err(Error::ChannelClosed(_))));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = SshConfig::new("127.0.0.1", "root")
            .with_port(port)
            .with_password("pw");
        let options = ConnectOptions {
            connect_timeout: Duration::from_secs(5),
            ..ConnectOptions::default()
        };
        let result = Client::connect(config, &options).await;
        assert!(matches!(
            result,
            Err(Error::Connection(_) | Error::Timeout(_))
        ));
    }

    #[test]
    fn test_connect_options_from_client_config() {
        let config = ClientConfig {
            connect_timeout_secs: 7,
            ..ClientConfig::default()
        };
        let options = ConnectOptions::from(&config);
        assert_eq!(options.connect_timeout, Duration::from_secs(7));
        assert_eq!(ConnectOptions::default().connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn test_command_output_success() {
        let mut output = CommandOutput::default();
        assert!(output.success());
        output.exit_status = Some(0);
        assert!(output.success());
        output.exit_status = Some(2);
        assert!(!output.success());

        output.combined = b"hello\n".to_vec();
        assert_eq!(output.combined_lossy(), "hello\n");
    }
}
