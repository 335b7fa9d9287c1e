//! Error types for the log server

use std::net::SocketAddr;

use thiserror::Error;

use ringlog_core::LogError;

/// Errors that can occur in the server, its workers, or its configuration
#[derive(Debug, Error)]
pub enum ServerError {
    /// Shared log error
    #[error("Log error: {0}")]
    Log(#[from] LogError),

    /// Connection read/write failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServerError {
    /// Create a new Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<toml::de::Error> for ServerError {
    fn from(e: toml::de::Error) -> Self {
        ServerError::Config(e.to_string())
    }
}

/// Result type alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;
