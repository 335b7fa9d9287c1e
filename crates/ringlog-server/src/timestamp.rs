//! Periodic timestamp records
//!
//! While the server runs, a background task appends a wall-clock record such as
//! `timestamp:Tue, 02 Jan 2024 03:04:05 +0000` to the shared log at a fixed
//! interval. The first record is written one interval after start.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use ringlog_core::{Entry, LogAccessPoint, LogError, LogResult};

/// RFC 2822 style layout used for timestamp records
pub const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Render one terminated timestamp record
pub fn format_timestamp<Tz>(at: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("timestamp:{}\n", at.format(TIMESTAMP_FORMAT))
}

/// Background task appending timestamp records to the log
pub struct TimestampInjector {
    log: Arc<LogAccessPoint>,
    interval: Duration,
    cancel: CancellationToken,
}

impl TimestampInjector {
    pub fn new(log: Arc<LogAccessPoint>, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            log,
            interval,
            cancel,
        }
    }

    /// Append a single record stamped with the current local time
    pub async fn inject_once(&self) -> LogResult<()> {
        let record = format_timestamp(Local::now());
        if let Some(evicted) = self.log.append_entry(Entry::from(record)).await? {
            debug!(evicted_size = evicted.size(), "Timestamp evicted oldest entry");
        }
        Ok(())
    }

    /// Spawn the injector as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    #[instrument(name = "timestamp_injector", skip(self), fields(interval_secs = self.interval.as_secs()))]
    async fn run(self) {
        info!("Timestamp injector started");

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Timestamp injector shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.inject_once().await {
                        Ok(()) => {}
                        Err(LogError::Interrupted) => {
                            debug!("Log interrupted, stopping timestamps");
                            break;
                        }
                        Err(e) => warn!(error = %e, "Failed to append timestamp"),
                    }
                }
            }
        }
    }
}
