//! Configuration for the transfer client

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default connect timeout for both the session and the SFTP channel
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Transfer client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Session (TCP + handshake + authentication) connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub session_connect_timeout_ms: u64,

    /// SFTP channel connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub channel_connect_timeout_ms: u64,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (text or json)
    pub format: LogFormat,
    /// Optional log file path (logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text logging for human readability
    Text,
    /// JSON structured logging for log aggregators
    Json,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session_connect_timeout_ms: default_connect_timeout_ms(),
            channel_connect_timeout_ms: default_connect_timeout_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] on malformed TOML or unknown value types.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if either timeout is zero.
    pub fn validate(&self) -> crate::Result<()> {
        if self.session_connect_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "session_connect_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.channel_connect_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "channel_connect_timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Session connect timeout
    pub const fn session_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.session_connect_timeout_ms)
    }

    /// SFTP channel connect timeout
    pub const fn channel_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_connect_timeout_ms)
    }
}

const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}
