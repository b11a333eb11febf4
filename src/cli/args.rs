//! CLI argument definitions using Clap

use clap::{Parser, Subcommand};

use crate::domain::config::AppConfig;

/// Audio Studio - numbered microphone takes for a watched directory
#[derive(Parser, Debug)]
#[command(name = "audio-studio")]
#[command(version)]
#[command(about = "Record numbered audio takes into a directory watched by an external processor")]
#[command(long_about = None)]
pub struct Cli {
    /// Encoder bitrate in bits per second (lossy formats only)
    #[arg(long, value_name = "BPS")]
    pub bitrate: Option<u32>,

    /// How often the encoder hands over a chunk, in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeslice_ms: Option<u64>,

    /// Delay between stop and releasing the microphone, in milliseconds
    #[arg(long, value_name = "MS")]
    pub stop_grace_ms: Option<u64>,

    /// Log level for the log file (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Key-value storage file (directory config and file counter)
    #[arg(long, value_name = "PATH")]
    pub storage_path: Option<String>,

    /// Config subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Settings given on the command line; unset flags stay `None`
    pub fn to_config(&self) -> AppConfig {
        AppConfig {
            bitrate: self.bitrate,
            timeslice_ms: self.timeslice_ms,
            stop_grace_ms: self.stop_grace_ms,
            log_level: self.log_level.clone(),
            storage_path: self.storage_path.clone(),
        }
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid configuration keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "bitrate",
    "timeslice_ms",
    "stop_grace_ms",
    "log_level",
    "storage_path",
];

/// Valid log levels
pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::try_parse_from(["audio-studio"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.to_config(), AppConfig::empty());
    }

    #[test]
    fn cli_parses_overrides() {
        let cli = Cli::try_parse_from([
            "audio-studio",
            "--bitrate",
            "128000",
            "--stop-grace-ms",
            "250",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let config = cli.to_config();
        assert_eq!(config.bitrate, Some(128_000));
        assert_eq!(config.stop_grace_ms, Some(250));
        assert_eq!(config.log_level, Some("debug".to_string()));
        assert!(config.timeslice_ms.is_none());
    }

    #[test]
    fn cli_rejects_non_numeric_bitrate() {
        assert!(Cli::try_parse_from(["audio-studio", "--bitrate", "loud"]).is_err());
    }

    #[test]
    fn cli_parses_config_init() {
        let cli = Cli::try_parse_from(["audio-studio", "config", "init"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Init
            })
        ));
    }

    #[test]
    fn cli_parses_config_set() {
        let cli =
            Cli::try_parse_from(["audio-studio", "config", "set", "timeslice_ms", "100"]).unwrap();
        match cli.command {
            Some(Commands::Config {
                action: ConfigAction::Set { key, value },
            }) => {
                assert_eq!(key, "timeslice_ms");
                assert_eq!(value, "100");
            }
            _ => panic!("Expected Config Set command"),
        }
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("bitrate"));
        assert!(is_valid_config_key("storage_path"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
