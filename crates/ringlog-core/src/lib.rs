//! # Ringlog Core
//!
//! A small append-only log of newline-terminated records held in a
//! fixed-capacity ring.
//!
//! ## Features
//!
//! - **RingLog**: fixed-capacity circular store with strict FIFO eviction
//! - **PendingAccumulator**: assembles partial writes into complete records
//! - **LogAccessPoint**: the single lock-protected instance shared by all writers and readers
//! - **LogCursor**: file-like handle with read position, seek and index+offset seek
//! - **OffsetAdjuster**: translation of seek requests into flattened byte offsets
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ringlog_core::{LogAccessPoint, LogCursor, SeekTo};
//!
//! #[tokio::main]
//! async fn main() {
//!     let log: Arc<LogAccessPoint> = Arc::new(LogAccessPoint::new());
//!     let mut cursor = LogCursor::new(log.clone());
//!
//!     cursor.write(b"first\n").await.unwrap();
//!     cursor.write(b"second\n").await.unwrap();
//!
//!     // Jump to byte 2 of the second entry
//!     cursor.seek_to_entry(SeekTo::new(1, 2)).await.unwrap();
//!     assert_eq!(cursor.read(16).await.unwrap().as_ref(), b"cond\n");
//! }
//! ```

pub mod access;
pub mod accumulator;
pub mod cursor;
pub mod entry;
pub mod error;
pub mod ring;
pub mod seek;

// Re-exports
pub use access::{LogAccessPoint, LogState};
pub use accumulator::PendingAccumulator;
pub use cursor::LogCursor;
pub use entry::{Entry, TERMINATOR};
pub use error::{LogError, LogResult};
pub use ring::{RING_CAPACITY, RingLog};
pub use seek::{OffsetAdjuster, SeekTo};
