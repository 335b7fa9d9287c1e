//! Logging settings
//!
//! Everything here deserializes from the `[logging]` table of the server's
//! TOML file; missing keys fall back to [`LogConfig::default`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where log events go and how they are rendered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub console: ConsoleConfig,
    /// Rolling file output, off unless configured
    pub file: Option<FileConfig>,
    /// Fields included in JSON events
    pub json: JsonFields,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
            json: JsonFields::default(),
        }
    }
}

impl LogConfig {
    /// Debug level, coloured human-readable console
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            console: ConsoleConfig::pretty(),
            ..Self::default()
        }
    }

    /// JSON lines into daily files under `log_dir`, nothing on the console
    pub fn production(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            console: ConsoleConfig::disabled(),
            file: Some(FileConfig::in_directory(log_dir)),
            ..Self::default()
        }
    }

    /// Warnings and errors only
    pub fn testing() -> Self {
        Self {
            level: "warn".to_string(),
            ..Self::default()
        }
    }

    /// Whether console events are rendered for humans
    pub fn is_pretty(&self) -> bool {
        self.console.format == ConsoleFormat::Pretty
    }
}

/// Console rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Multi-line human-readable output
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: ConsoleFormat,
    /// ANSI colours; only honoured by the pretty format
    pub ansi: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: ConsoleFormat::Json,
            ansi: false,
        }
    }
}

impl ConsoleConfig {
    pub fn pretty() -> Self {
        Self {
            enabled: true,
            format: ConsoleFormat::Pretty,
            ansi: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Rolling log files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name prefix; the rotation suffix is appended
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self::in_directory("./logs")
    }
}

impl FileConfig {
    /// Daily-rotated `ringlogd.*` files in `directory`
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            prefix: "ringlogd".to_string(),
            rotation: RotationStrategy::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One `<prefix>.log`, truncated at start-up
    Never,
}

/// Optional parts of each JSON event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonFields {
    /// Put event fields at the top level instead of under `fields`
    pub flatten: bool,
    pub span_list: bool,
    pub current_span: bool,
    pub thread_ids: bool,
    /// Source file and line
    pub source_location: bool,
}

impl Default for JsonFields {
    fn default() -> Self {
        Self {
            flatten: true,
            span_list: true,
            current_span: true,
            thread_ids: false,
            source_location: false,
        }
    }
}
