//! Configuration for the command server.
//!
//! Supports both command-line arguments and a TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the command server
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(version = "0.1.0")]
#[command(about = "A single-session TCP command server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g. 127.0.0.1)
    #[arg(short = 'i', long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Maximum number of bytes read per message
    #[arg(long)]
    pub max_read_bytes: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Listener-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Session-related configuration
#[derive(Debug, Deserialize)]
pub struct SessionSection {
    /// Maximum number of bytes read per message
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: usize,
    /// Per-read deadline in seconds. Absent means block forever.
    pub read_timeout_secs: Option<u64>,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            max_read_bytes: default_max_read_bytes(),
            read_timeout_secs: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    1993
}

fn default_max_read_bytes() -> usize {
    2048
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration.
///
/// Immutable once the listener starts; fields are public so embedders can
/// adjust a value programmatically before that.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single read. A longer line is handled in slices
    /// of this size.
    pub max_read_bytes: usize,
    /// Per-read deadline. `None` blocks forever.
    pub read_timeout: Option<Duration>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: default_host(),
            port: default_port(),
            max_read_bytes: default_max_read_bytes(),
            read_timeout: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::resolve(cli, toml_config)
    }

    // Merge CLI args with TOML config (CLI takes precedence)
    fn resolve(cli: CliArgs, file: TomlConfig) -> Result<Self, ConfigError> {
        let config = Config {
            host: cli.host.unwrap_or(file.server.host),
            port: cli.port.unwrap_or(file.server.port),
            max_read_bytes: cli.max_read_bytes.unwrap_or(file.session.max_read_bytes),
            read_timeout: file.session.read_timeout_secs.map(Duration::from_secs),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                file.logging.level
            },
        };

        if config.max_read_bytes == 0 {
            return Err(ConfigError::InvalidMaxReadBytes);
        }

        Ok(config)
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    InvalidMaxReadBytes,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidMaxReadBytes => {
                write!(f, "max_read_bytes must be greater than zero")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 1993);
        assert_eq!(config.max_read_bytes, 2048);
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            host = "0.0.0.0"
            port = 2020

            [session]
            max_read_bytes = 512
            read_timeout_secs = 30

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 2020);
        assert_eq!(config.session.max_read_bytes, 512);
        assert_eq!(config.session.read_timeout_secs, Some(30));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = CliArgs::parse_from(["parley", "-p", "3000", "--max-read-bytes", "1024"]);
        let file: TomlConfig = toml::from_str(
            r#"
            [server]
            host = "10.0.0.1"
            port = 2020
        "#,
        )
        .unwrap();

        let config = Config::resolve(cli, file).unwrap();
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_read_bytes, 1024);
    }

    #[test]
    fn test_zero_max_read_bytes_rejected() {
        let cli = CliArgs::parse_from(["parley", "--max-read-bytes", "0"]);
        let err = Config::resolve(cli, TomlConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxReadBytes));
    }

    #[test]
    fn test_timeout_resolves_to_duration() {
        let cli = CliArgs::parse_from(["parley"]);
        let file: TomlConfig = toml::from_str(
            r#"
            [session]
            read_timeout_secs = 5
        "#,
        )
        .unwrap();

        let config = Config::resolve(cli, file).unwrap();
        assert_eq!(config.read_timeout, Some(Duration::from_secs(5)));
    }
}
