//! Configuration management for flightlink.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults. The
//! protocol core never reads configuration; the binary resolves these values
//! and passes them to constructors.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transport::DEFAULT_MAX_FRAME_LEN;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "flightlink";

/// Default telemetry port.
pub const DEFAULT_PORT: u16 = 5005;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTLINK_`)
/// 2. TOML config file at `~/.config/flightlink/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sender configuration.
    pub sender: SenderConfig,
    /// Remote receiver address used by the sender.
    pub link: LinkConfig,
    /// Receiver configuration.
    pub receiver: ReceiverConfig,
    /// Framing limits.
    pub transport: TransportConfig,
}

/// Sender-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Raw telemetry file to stream.
    pub source_path: Option<PathBuf>,
    /// Tail number stamped on every frame.
    pub tail_number: String,
    /// Sequence number of the first frame.
    pub start_sequence: u32,
    /// Delay between frames in milliseconds. Zero sends back to back.
    pub send_interval_ms: u64,
}

/// Where the sender connects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Receiver host name or address.
    pub remote_host: String,
    /// Receiver port.
    pub remote_port: u16,
}

/// Receiver-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Address to listen on.
    pub bind_address: String,
    /// Port to listen on.
    pub port: u16,
    /// Interval between status reports in milliseconds.
    pub status_interval_ms: u64,
}

/// Framing-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Largest accepted frame payload in bytes.
    pub max_frame_len: u32,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            source_path: None,
            tail_number: "C-FGAX".to_string(),
            start_sequence: 0,
            send_interval_ms: 1000,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            remote_host: "127.0.0.1".to_string(),
            remote_port: DEFAULT_PORT,
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            status_interval_ms: 2000,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing, or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing, or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLIGHTLINK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        crate::codec::validate_tail_number(&self.sender.tail_number).map_err(|err| {
            Error::config_validation(format!("sender.tail_number: {err}"))
        })?;

        if self.link.remote_host.trim().is_empty() {
            return Err(Error::config_validation("remote_host must not be empty"));
        }

        if self.link.remote_port == 0 || self.receiver.port == 0 {
            return Err(Error::config_validation("ports must be greater than 0"));
        }

        if self.receiver.status_interval_ms == 0 {
            return Err(Error::config_validation(
                "status_interval_ms must be greater than 0",
            ));
        }

        if self.transport.max_frame_len == 0 || self.transport.max_frame_len > DEFAULT_MAX_FRAME_LEN
        {
            return Err(Error::config_validation(format!(
                "max_frame_len must be between 1 and {DEFAULT_MAX_FRAME_LEN}"
            )));
        }

        Ok(())
    }

    /// Get the send interval as a Duration.
    #[must_use]
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.sender.send_interval_ms)
    }

    /// Get the status report interval as a Duration.
    #[must_use]
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.receiver.status_interval_ms)
    }

    /// The `host:port` the receiver binds to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.receiver.bind_address, self.receiver.port)
    }
}
