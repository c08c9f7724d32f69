use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Password;
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::connection::{ConnectionSettings, ServerVersion};
use crate::http_client::DEFAULT_REQUEST_TIMEOUT_SECS;

/// Graph Auth - secret and token management for graph database servers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Server host, including scheme
    #[arg(short = 'H', long, env = "GRAPH_HOST", default_value = "http://127.0.0.1")]
    pub host: String,

    /// Graph the secrets belong to
    #[arg(short, long = "graph", env = "GRAPH_NAME")]
    pub graph_name: String,

    /// Database user
    #[arg(short, long, env = "GRAPH_USERNAME", default_value = "tigergraph")]
    pub username: String,

    /// Database password (prompted for when missing)
    #[arg(short, long, env = "GRAPH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// REST++ port
    #[arg(long, env = "RESTPP_PORT", default_value = "9000")]
    pub restpp_port: u16,

    /// GSQL server port
    #[arg(long, env = "GS_PORT", default_value = "14240")]
    pub gs_port: u16,

    /// Server version, e.g. 3.6.1 (selects the token request shape)
    #[arg(long, env = "GRAPH_VERSION")]
    pub server_version: Option<String>,

    /// Verify TLS certificates against --cert-path
    #[arg(long, env = "USE_CERT", default_value = "false")]
    pub use_cert: bool,

    /// Path to a PEM root certificate
    #[arg(long, env = "CERT_PATH")]
    pub cert_path: Option<String>,

    /// Existing API token to authenticate REST++ requests with
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub http_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create, list and drop secrets
    #[command(subcommand)]
    Secrets(SecretCommand),

    /// Request, refresh and delete REST++ tokens
    #[command(subcommand)]
    Token(TokenCommand),

    /// Run a loading job with a local data file
    Load {
        /// Data file to upload
        #[arg(long)]
        file: PathBuf,

        /// File variable of the loading job (DEFINE FILENAME <tag>)
        #[arg(long)]
        tag: String,

        /// Loading job name
        #[arg(long)]
        job: String,

        /// Field separator
        #[arg(long)]
        sep: Option<String>,

        /// Line terminator
        #[arg(long)]
        eol: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SecretCommand {
    /// List aliases and masked secrets
    List,

    /// Create a secret
    Create {
        /// Alias for the secret; generated by the server when omitted
        #[arg(long)]
        alias: Option<String>,

        /// Print the secret together with its alias
        #[arg(long)]
        with_alias: bool,
    },

    /// Drop one or more secrets
    Drop {
        #[arg(required = true)]
        aliases: Vec<String>,

        /// Fail if any secret could not be dropped
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TokenCommand {
    /// Request a new token
    Request {
        #[arg(long, env = "GRAPH_SECRET", hide_env_values = true)]
        secret: String,

        /// Do not switch the connection to the new token
        #[arg(long)]
        no_persist: bool,

        /// Token lifetime in seconds
        #[arg(long)]
        lifetime: Option<u64>,
    },

    /// Extend a token's lifetime
    Refresh {
        #[arg(long, env = "GRAPH_SECRET", hide_env_values = true)]
        secret: String,

        /// Token to refresh (defaults to --api-token)
        #[arg(long)]
        token: Option<String>,

        /// New lifetime in seconds, counted from now
        #[arg(long)]
        lifetime: Option<u64>,
    },

    /// Delete a token
    Delete {
        #[arg(long, env = "GRAPH_SECRET", hide_env_values = true)]
        secret: String,

        /// Token to delete (defaults to --api-token)
        #[arg(long)]
        token: Option<String>,

        /// Fail if the token does not exist
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    // Server
    pub host: String,
    pub graph_name: String,
    pub restpp_port: u16,
    pub gs_port: u16,
    pub server_version: Option<ServerVersion>,

    // Authentication
    pub username: String,
    pub password: String,
    pub api_token: Option<String>,

    // TLS
    pub use_cert: bool,
    pub cert_path: Option<PathBuf>,

    // HTTP client
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV (.env included) > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args.command))
    }

    /// Build configuration from parsed arguments
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let server_version = match args.server_version.as_deref() {
            Some(v) if !v.trim().is_empty() => Some(
                ServerVersion::parse(v)
                    .with_context(|| format!("Invalid GRAPH_VERSION: {}", v))?,
            ),
            _ => None,
        };

        let password = match args.password.clone() {
            Some(password) => password,
            None => prompt_password(&args.username)?,
        };

        Ok(Config {
            host: args.host.trim_end_matches('/').to_string(),
            graph_name: args.graph_name.clone(),
            restpp_port: args.restpp_port,
            gs_port: args.gs_port,
            server_version,
            username: args.username.clone(),
            password,
            api_token: args.api_token.clone().filter(|t| !t.is_empty()),
            use_cert: args.use_cert,
            cert_path: args
                .cert_path
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(expand_tilde),
            http_request_timeout: args.http_timeout,
            log_level: args.log_level.clone(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.graph_name.trim().is_empty() {
            anyhow::bail!("GRAPH_NAME cannot be empty");
        }

        if self.use_cert {
            if let Some(ref path) = self.cert_path {
                if !path.exists() {
                    anyhow::bail!("CERT_PATH does not exist: {}", path.display());
                }
            }
        }

        Ok(())
    }

    pub fn restpp_url(&self) -> String {
        format!("{}:{}", self.host, self.restpp_port)
    }

    pub fn gs_url(&self) -> String {
        format!("{}:{}", self.host, self.gs_port)
    }

    /// Settings for opening a connection
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::new(self.restpp_url(), self.gs_url(), self.graph_name.clone())
            .with_credentials(self.username.clone(), self.password.clone())
            .with_version(self.server_version)
            .with_certificate(self.use_cert, self.cert_path.clone())
    }
}

/// Ask for the password on an interactive terminal
fn prompt_password(username: &str) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("GRAPH_PASSWORD is required (use -p or set GRAPH_PASSWORD env var)");
    }

    Password::new()
        .with_prompt(format!("Password for {}", username))
        .interact()
        .context("Failed to read password")
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["graph-auth", "--graph", "social", "--password", "pw"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/file.txt");
        assert!(path.to_string_lossy().contains("test/file.txt"));
        assert!(!path.to_string_lossy().starts_with("~"));

        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_tilde_just_tilde() {
        // Just "~" without slash should not expand
        let path = expand_tilde("~");
        assert_eq!(path, PathBuf::from("~"));
    }

    #[test]
    fn test_parse_secret_commands() {
        let args = parse(&["secrets", "list"]);
        assert_eq!(args.command, Command::Secrets(SecretCommand::List));

        let args = parse(&["secrets", "drop", "a", "b", "--strict"]);
        assert_eq!(
            args.command,
            Command::Secrets(SecretCommand::Drop {
                aliases: vec!["a".to_string(), "b".to_string()],
                strict: true,
            })
        );
    }

    #[test]
    fn test_parse_token_request() {
        let args = parse(&[
            "token",
            "request",
            "--secret",
            "s3",
            "--no-persist",
            "--lifetime",
            "60",
        ]);
        assert_eq!(
            args.command,
            Command::Token(TokenCommand::Request {
                secret: "s3".to_string(),
                no_persist: true,
                lifetime: Some(60),
            })
        );
    }

    #[test]
    fn test_config_from_args() {
        let args = parse(&[
            "-H",
            "https://graph.example.com/",
            "--server-version",
            "3.4.0",
            "secrets",
            "list",
        ]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.restpp_url(), "https://graph.example.com:9000");
        assert_eq!(config.gs_url(), "https://graph.example.com:14240");
        assert_eq!(config.server_version, ServerVersion::parse("3.4.0"));
        assert_eq!(config.username, "tigergraph");
        assert_eq!(config.password, "pw");

        let settings = config.connection_settings();
        assert_eq!(settings.graph_name, "social");
        assert!(!settings.verifies_certificates());
    }

    #[test]
    fn test_invalid_version_is_rejected() {
        let args = parse(&["--server-version", "three", "secrets", "list"]);
        let err = Config::from_args(&args).unwrap_err();
        assert!(err.to_string().contains("Invalid GRAPH_VERSION"));
    }

    #[test]
    fn test_validate_missing_certificate() {
        let args = parse(&[
            "--use-cert",
            "--cert-path",
            "/nonexistent/graph-auth/ca.pem",
            "secrets",
            "list",
        ]);
        let config = Config::from_args(&args).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CERT_PATH does not exist"));
    }
}
