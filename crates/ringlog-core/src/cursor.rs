//! File-like handle onto the shared log
//!
//! A [`LogCursor`] behaves like one open handle on a character device backed
//! by the ring: it carries its own read position, writes go through the shared
//! accumulator, and seeks are bounded by the current log size.

use std::io::SeekFrom;
use std::sync::Arc;

use bytes::Bytes;
use tracing::trace;

use crate::access::LogAccessPoint;
use crate::error::LogResult;
use crate::ring::RING_CAPACITY;
use crate::seek::{OffsetAdjuster, SeekTo};

/// Positioned reader/writer over a [`LogAccessPoint`]
#[derive(Debug, Clone)]
pub struct LogCursor<const N: usize = RING_CAPACITY> {
    log: Arc<LogAccessPoint<N>>,
    position: usize,
}

impl<const N: usize> LogCursor<N> {
    /// Open a cursor at the start of the log
    pub fn new(log: Arc<LogAccessPoint<N>>) -> Self {
        Self { log, position: 0 }
    }

    /// Current flattened read position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Append bytes to the log
    ///
    /// Partial records wait in the shared accumulator until a terminator
    /// arrives from any writer. The read position is not moved.
    pub async fn write(&mut self, bytes: &[u8]) -> LogResult<usize> {
        self.log.write(bytes).await
    }

    /// Read up to `max_len` bytes from the current position
    ///
    /// At most the remainder of one entry is returned per call. An empty
    /// result means end of log.
    pub async fn read(&mut self, max_len: usize) -> LogResult<Bytes> {
        let chunk = self.log.read_at(self.position, max_len).await?;
        self.position += chunk.len();
        trace!(position = self.position, read = chunk.len(), "Cursor read");
        Ok(chunk)
    }

    /// Read up to `max_len` bytes from the current position, across entries
    ///
    /// The bytes are gathered under one lock, so no write lands mid-read.
    /// Shorter than `max_len` only at end of log.
    pub async fn read_up_to(&mut self, max_len: usize) -> LogResult<Bytes> {
        let chunk = self.log.read_span(self.position, max_len).await?;
        self.position += chunk.len();
        Ok(chunk)
    }

    /// Read from the current position to the end of the log
    pub async fn read_to_end(&mut self) -> LogResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let chunk = self.read(usize::MAX).await?;
            if chunk.is_empty() {
                return Ok(out);
            }
            out.extend_from_slice(&chunk);
        }
    }

    /// Move the read position; it is left unchanged on error
    pub async fn seek(&mut self, pos: SeekFrom) -> LogResult<u64> {
        let total = self.log.total_size().await?;
        self.position = OffsetAdjuster::resolve_seek(self.position, total, pos)?;
        Ok(self.position as u64)
    }

    /// Move the read position to byte `cmd.offset` of entry `cmd.index`
    pub async fn seek_to_entry(&mut self, cmd: SeekTo) -> LogResult<u64> {
        self.position = self.log.resolve(cmd).await?;
        Ok(self.position as u64)
    }
}
