//! Configuration for the log server
//!
//! Settings come from an optional TOML file and are then overridden by
//! command-line flags.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use ringlog_logging::{ConsoleConfig, LogConfig};

use crate::error::{ServerError, ServerResult};

/// Port the daemon listens on by default
pub const DEFAULT_PORT: u16 = 9000;

/// Bytes requested from a connection per read
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1024;

/// Seconds between injected timestamp entries
pub const DEFAULT_TIMESTAMP_INTERVAL_SECS: u64 = 10;

/// Configuration for the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub listen_addr: SocketAddr,
    /// Bytes requested from a connection per read
    pub read_chunk_size: usize,
    /// Periodic timestamp entries
    pub timestamps: TimestampConfig,
    /// Logging setup
    pub logging: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            timestamps: TimestampConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ServerError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> ServerResult<()> {
        if self.read_chunk_size == 0 {
            return Err(ServerError::config("read_chunk_size must be non-zero"));
        }
        if self.timestamps.enabled && self.timestamps.interval_secs == 0 {
            return Err(ServerError::config("timestamps.interval_secs must be non-zero"));
        }
        Ok(())
    }

    /// Set the listen address
    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Set the per-read chunk size
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Set the timestamp configuration
    pub fn with_timestamps(mut self, timestamps: TimestampConfig) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Set the logging configuration
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }
}

/// Periodic timestamp injection settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimestampConfig {
    /// Whether the injector runs
    pub enabled: bool,
    /// Seconds between injected entries
    pub interval_secs: u64,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_TIMESTAMP_INTERVAL_SECS,
        }
    }
}

impl TimestampConfig {
    /// Injector switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "ringlogd",
    about = "Append-only ring log served over TCP"
)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
    /// Listen address, e.g. 0.0.0.0:9000
    #[arg(long)]
    pub listen: Option<SocketAddr>,
    /// Disable periodic timestamp entries
    #[arg(long)]
    pub no_timestamps: bool,
    /// Seconds between timestamp entries
    #[arg(long)]
    pub timestamp_interval: Option<u64>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
    /// Human-readable log output instead of JSONL
    #[arg(long)]
    pub pretty: bool,
}

impl Cli {
    /// Merge the config file (if any) with command-line overrides
    pub fn into_config(self) -> ServerResult<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(addr) = self.listen {
            config.listen_addr = addr;
        }
        if self.no_timestamps {
            config.timestamps.enabled = false;
        }
        if let Some(secs) = self.timestamp_interval {
            config.timestamps.interval_secs = secs;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if self.pretty {
            config.logging.console = ConsoleConfig::pretty();
        }

        config.validate()?;
        Ok(config)
    }
}
