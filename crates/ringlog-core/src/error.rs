//! Error types for ringlog-core
//!
//! This module defines the error types used throughout the log crate.

use thiserror::Error;

/// Errors that can occur while accessing the shared log
#[derive(Debug, Error)]
pub enum LogError {
    /// Entry index does not name an occupied slot
    #[error("Entry index {index} out of range ({entries} entries in log)")]
    EntryOutOfRange { index: usize, entries: usize },

    /// Intra-entry offset lies beyond the end of the entry
    #[error("Offset {offset} out of range for entry {index} ({size} bytes)")]
    OffsetOutOfRange {
        index: usize,
        offset: usize,
        size: usize,
    },

    /// Seek target would be negative or past the end of the log
    #[error("Seek position {position} out of range (log size {size})")]
    SeekOutOfRange { position: i128, size: usize },

    /// Lock acquisition was aborted by shutdown
    #[error("Interrupted while waiting for the log lock")]
    Interrupted,

    /// Memory could not be reserved for a record
    #[error("Resource exhausted: could not reserve {requested} bytes")]
    ResourceExhausted { requested: usize },

    /// I/O error on a stream feeding the log
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for LogError {
    fn from(err: std::io::Error) -> Self {
        LogError::Io(err.to_string())
    }
}

impl LogError {
    /// Whether the request named a position outside the log
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            Self::EntryOutOfRange { .. } | Self::OffsetOutOfRange { .. } | Self::SeekOutOfRange { .. }
        )
    }

    /// Whether the caller may retry the same operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// Result type alias for log operations
pub type LogResult<T> = Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_classification() {
        let err = LogError::EntryOutOfRange {
            index: 3,
            entries: 1,
        };
        assert!(err.is_out_of_range());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("3"));

        let err = LogError::SeekOutOfRange {
            position: -1,
            size: 10,
        };
        assert!(err.is_out_of_range());
    }

    #[test]
    fn test_interrupted_is_retryable() {
        let err = LogError::Interrupted;
        assert!(err.is_retryable());
        assert!(!err.is_out_of_range());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer went away");
        let log_err: LogError = io_err.into();
        assert!(matches!(log_err, LogError::Io(_)));
        assert!(log_err.to_string().contains("peer went away"));
    }
}
