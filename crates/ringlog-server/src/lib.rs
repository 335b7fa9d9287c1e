//! # Ringlog Server
//!
//! TCP front end for the shared ring log. Each client sends bytes until a
//! newline, the completed records are stored, and the whole log is streamed
//! back before the connection closes.
//!
//! ## Features
//!
//! - **Server**: accept loop with one [`ConnectionWorker`] per connection
//! - **WorkerRegistry**: tracks, reaps and cancels workers
//! - **TimestampInjector**: periodic `timestamp:` records
//! - **ServerConfig / Cli**: TOML file plus command-line overrides
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ringlog_core::LogAccessPoint;
//! use ringlog_server::{Server, ServerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let shutdown = CancellationToken::new();
//!     let log = Arc::new(LogAccessPoint::with_interrupt(shutdown.clone()));
//!     let server = Server::bind(ServerConfig::default(), log).await?;
//!     server.run(shutdown).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod server;
pub mod timestamp;
pub mod worker;

// Re-exports
pub use config::{Cli, ServerConfig, TimestampConfig};
pub use error::{ServerError, ServerResult};
pub use registry::WorkerRegistry;
pub use server::Server;
pub use timestamp::{TimestampInjector, format_timestamp};
pub use worker::{ConnectionWorker, WorkerHandle, WorkerId, WorkerOutcome};
