//! Command-line connection flags shared by the owlsh binaries

use clap::Args;
use owlsh_core::{ClientConfig, ConnectionOverrides};
use std::path::PathBuf;

/// Connection flags; anything given here overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Server host (required unless set in the config file)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Server port [default: 22]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Username (required unless set in the config file)
    #[arg(short, long = "user")]
    pub user: Option<String>,

    /// Password
    #[arg(long = "pass")]
    pub pass: Option<String>,

    /// Path to SSH private key
    #[arg(short = 'i', long = "key")]
    pub key: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ConnectionArgs {
    pub fn overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            host: self.host.clone(),
            port: self.port,
            username: self.user.clone(),
            password: self.pass.clone(),
            key_file: self.key.clone(),
        }
    }

    /// Load the config file (if one was given) and apply the flags on top.
    pub fn client_config(&self) -> owlsh_core::Result<ClientConfig> {
        let config = match self.config.as_deref() {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };
        config.validate()?;
        Ok(config.merge_overrides(self.overrides()))
    }
}

/// Usage examples printed when host or user is missing
pub fn usage_examples(binary: &str) -> String {
    format!(
        "Usage examples:\n  \
         {binary} -H 192.168.1.100 -u root --pass 123456\n  \
         {binary} -H 192.168.1.100 -u root -i ~/.ssh/id_ed25519\n  \
         {binary} -c ~/.config/owlsh/config.toml"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        connection: ConnectionArgs,
    }

    #[test]
    fn test_flags_parse() {
        let cli = TestCli::parse_from([
            "owlsh", "-H", "example.com", "-p", "2222", "-u", "root", "--pass", "pw", "-i",
            "/tmp/key",
        ]);
        let config = cli.connection.client_config().unwrap();
        assert!(config.has_target());

        let ssh = config.ssh_config();
        assert_eq!(ssh.address(), "example.com:2222");
        assert_eq!(ssh.username, "root");
        assert_eq!(ssh.password.as_deref(), Some("pw"));
        assert_eq!(ssh.key_file, Some(PathBuf::from("/tmp/key")));
    }

    #[test]
    fn test_missing_target() {
        let cli = TestCli::parse_from(["owlsh", "-u", "root"]);
        let config = cli.connection.client_config().unwrap();
        assert!(!config.has_target());
        assert_eq!(config.port, 22);
    }

    #[test]
    fn test_config_file_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owlsh.toml");
        std::fs::write(
            &path,
            "host = \"file-host\"\nusername = \"deploy\"\nport = 2200\n",
        )
        .unwrap();

        let cli = TestCli::parse_from([
            "owlsh",
            "-c",
            path.to_str().unwrap(),
            "-H",
            "cli-host",
        ]);
        let config = cli.connection.client_config().unwrap();
        assert_eq!(config.host.as_deref(), Some("cli-host"));
        assert_eq!(config.username.as_deref(), Some("deploy"));
        assert_eq!(config.port, 2200);
    }

    #[test]
    fn test_usage_examples_name_binary() {
        assert!(usage_examples("owlsh-sftp").contains("owlsh-sftp -H"));
    }
}
