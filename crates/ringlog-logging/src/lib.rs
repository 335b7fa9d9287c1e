//! Tracing subscriber setup shared by the ringlog binaries and tests
//!
//! # Features
//!
//! - **JSON lines** on the console by default, ready for log shippers
//! - **Pretty output** for interactive use
//! - **Rolling files** (daily, hourly or a single file) through a non-blocking writer
//! - **`RUST_LOG`** takes precedence over the configured level
//!
//! # Example
//!
//! ```ignore
//! use ringlog_logging::{LogConfig, SubscriberBuilder};
//!
//! let _guard = SubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .try_init()?;
//! ```
//!
//! The returned [`WorkerGuard`] flushes file output when dropped, so hold it
//! until the process exits.

pub mod config;

pub use config::{
    ConsoleConfig, ConsoleFormat, FileConfig, JsonFields, LogConfig, RotationStrategy,
};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log directory or file could not be created
    #[error("Log file error: {0}")]
    Io(#[from] std::io::Error),

    /// Another global subscriber is already installed
    #[error("Subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Builds and installs the global subscriber from a [`LogConfig`]
#[derive(Debug, Default)]
pub struct SubscriberBuilder {
    config: LogConfig,
}

impl SubscriberBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the level directive
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    pub fn with_file_output(mut self, file: FileConfig) -> Self {
        self.config.file = Some(file);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber
    ///
    /// Returns the file writer's guard when file output is configured.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.level));

        let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
        if let Some(console) = console_layer(&self.config) {
            layers.push(console);
        }

        let guard = match &self.config.file {
            Some(file) => {
                let (writer, guard) = file_writer(file)?;
                layers.push(json_layer(&self.config.json, writer));
                Some(guard)
            }
            None => None,
        };

        Registry::default()
            .with(layers)
            .with(filter)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

        tracing::info!(
            level = %self.config.level,
            console = self.config.console.enabled,
            file = ?self.config.file.as_ref().map(|f| &f.directory),
            "Logging initialized"
        );
        Ok(guard)
    }
}

fn console_layer(config: &LogConfig) -> Option<BoxedLayer> {
    if !config.console.enabled {
        return None;
    }
    let layer = match config.console.format {
        ConsoleFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(config.console.ansi)
            .with_writer(std::io::stderr)
            .boxed(),
        ConsoleFormat::Json => json_layer(&config.json, std::io::stdout),
    };
    Some(layer)
}

fn json_layer<W>(fields: &JsonFields, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(fields.flatten)
        .with_span_list(fields.span_list)
        .with_current_span(fields.current_span)
        .with_thread_ids(fields.thread_ids)
        .with_file(fields.source_location)
        .with_line_number(fields.source_location)
        .with_ansi(false)
        .with_writer(writer)
        .boxed()
}

/// Open the configured file target behind a non-blocking writer
fn file_writer(file: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&file.directory)?;
    let rotation = match file.rotation {
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
        RotationStrategy::Never => {
            let target = File::create(file.directory.join(format!("{}.log", file.prefix)))?;
            return Ok(tracing_appender::non_blocking(target));
        }
    };
    let appender = RollingFileAppender::new(rotation, &file.directory, &file.prefix);
    Ok(tracing_appender::non_blocking(appender))
}

/// Quiet subscriber for tests; safe to call from every test
pub fn init_testing() {
    let _ = SubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_to_json() {
        let builder = SubscriberBuilder::new();
        assert_eq!(builder.config().level, "info");
        assert_eq!(builder.config().console.format, ConsoleFormat::Json);
    }

    #[test]
    fn test_builder_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let builder = SubscriberBuilder::new()
            .with_config(LogConfig::development())
            .with_level("trace")
            .with_console(false)
            .with_file_output(FileConfig::in_directory(dir.path()));

        let config = builder.config();
        assert_eq!(config.level, "trace");
        assert!(!config.console.enabled);
        assert_eq!(config.file.as_ref().unwrap().directory, dir.path());
    }

    #[test]
    fn test_disabled_console_has_no_layer() {
        let config = LogConfig {
            console: ConsoleConfig::disabled(),
            ..LogConfig::default()
        };
        assert!(console_layer(&config).is_none());
        assert!(console_layer(&LogConfig::development()).is_some());
    }

    #[test]
    fn test_single_file_target_created() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileConfig {
            directory: dir.path().join("nested"),
            prefix: "unit".to_string(),
            rotation: RotationStrategy::Never,
        };
        let (_writer, _guard) = file_writer(&file).unwrap();
        assert!(dir.path().join("nested").join("unit.log").exists());
    }

    #[test]
    fn test_init_installs_global_dispatcher() {
        init_testing();
        assert!(tracing::dispatcher::has_been_set());
    }

    #[test]
    fn test_second_install_is_reported() {
        init_testing();
        let again = SubscriberBuilder::new()
            .with_config(LogConfig::testing())
            .try_init();
        assert!(matches!(again, Err(LoggingError::AlreadyInitialized(_))));
    }
}
