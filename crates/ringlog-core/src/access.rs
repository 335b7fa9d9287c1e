//! The shared, lock-protected log
//!
//! [`LogAccessPoint`] owns the ring and the shared pending accumulator behind
//! a single async mutex. Every read and every mutation goes through that one
//! lock, so no caller ever observes a half-applied write.
//!
//! Lock acquisition races against an interrupt token: once the token is
//! cancelled, waiting callers get [`LogError::Interrupted`] instead of
//! blocking shutdown.

use bytes::Bytes;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::accumulator::PendingAccumulator;
use crate::entry::Entry;
use crate::error::{LogError, LogResult};
use crate::ring::{RING_CAPACITY, RingLog};
use crate::seek::{OffsetAdjuster, SeekTo};

/// State guarded by the access point lock
#[derive(Debug, Default)]
pub struct LogState<const N: usize = RING_CAPACITY> {
    /// Stored entries
    pub ring: RingLog<N>,
    /// Partial record shared by byte-stream writers
    pub pending: PendingAccumulator,
}

impl<const N: usize> LogState<N> {
    /// Store a complete entry, logging any eviction
    pub fn store(&mut self, entry: Entry) -> Option<Entry> {
        let size = entry.size();
        let evicted = self.ring.add_entry(entry);
        match &evicted {
            Some(old) => debug!(
                size,
                evicted_size = old.size(),
                entries = self.ring.len(),
                "Stored entry, evicted oldest"
            ),
            None => trace!(size, entries = self.ring.len(), "Stored entry"),
        }
        evicted
    }

    /// Move every complete record from the shared accumulator into the ring
    pub fn flush_pending(&mut self) -> usize {
        let records = self.pending.drain_all();
        let stored = records.len();
        for entry in records {
            self.store(entry);
        }
        stored
    }
}

/// Single shared instance of the log and its lock
#[derive(Debug)]
pub struct LogAccessPoint<const N: usize = RING_CAPACITY> {
    state: Mutex<LogState<N>>,
    interrupt: CancellationToken,
}

impl<const N: usize> LogAccessPoint<N> {
    /// Create an empty log with its own interrupt token
    pub fn new() -> Self {
        Self::with_interrupt(CancellationToken::new())
    }

    /// Create an empty log whose lock waits abort when `interrupt` fires
    pub fn with_interrupt(interrupt: CancellationToken) -> Self {
        Self {
            state: Mutex::new(LogState::default()),
            interrupt,
        }
    }

    pub fn interrupt_token(&self) -> &CancellationToken {
        &self.interrupt
    }

    /// Acquire exclusive access
    ///
    /// Fails with [`LogError::Interrupted`] if the interrupt token is (or
    /// becomes) cancelled before the lock is obtained.
    pub async fn lock(&self) -> LogResult<MutexGuard<'_, LogState<N>>> {
        tokio::select! {
            biased;
            _ = self.interrupt.cancelled() => Err(LogError::Interrupted),
            guard = self.state.lock() => Ok(guard),
        }
    }

    /// Run `f` while holding the lock
    ///
    /// The lock is released when `f` returns, whatever it returns.
    pub async fn with_exclusive_access<R>(
        &self,
        f: impl FnOnce(&mut LogState<N>) -> R,
    ) -> LogResult<R> {
        let mut guard = self.lock().await?;
        Ok(f(&mut guard))
    }

    /// Store one complete entry directly
    pub async fn append_entry(&self, entry: Entry) -> LogResult<Option<Entry>> {
        self.with_exclusive_access(|state| state.store(entry)).await
    }

    /// Store a batch of entries and snapshot the log in one critical section
    ///
    /// The snapshot therefore contains the batch and nothing written after it.
    pub async fn commit_and_snapshot(&self, entries: Vec<Entry>) -> LogResult<Bytes> {
        self.with_exclusive_access(|state| {
            for entry in entries {
                state.store(entry);
            }
            state.ring.contents()
        })
        .await
    }

    /// Byte-stream write through the shared accumulator
    ///
    /// Every record completed by these bytes is stored before the lock is
    /// released. Returns the number of bytes accepted.
    pub async fn write(&self, bytes: &[u8]) -> LogResult<usize> {
        self.with_exclusive_access(|state| -> LogResult<usize> {
            if state.pending.append(bytes)? {
                let stored = state.flush_pending();
                trace!(stored, "Flushed completed records");
            }
            Ok(bytes.len())
        })
        .await?
    }

    /// Read up to `max_len` bytes at flattened `offset`, within one entry
    pub async fn read_at(&self, offset: usize, max_len: usize) -> LogResult<Bytes> {
        self.with_exclusive_access(|state| state.ring.read_at(offset, max_len))
            .await
    }

    /// Read up to `max_len` bytes at flattened `offset`, across entries
    pub async fn read_span(&self, offset: usize, max_len: usize) -> LogResult<Bytes> {
        self.with_exclusive_access(|state| state.ring.read_span(offset, max_len))
            .await
    }

    /// Whole log, oldest entry first
    pub async fn snapshot(&self) -> LogResult<Bytes> {
        self.with_exclusive_access(|state| state.ring.contents()).await
    }

    pub async fn total_size(&self) -> LogResult<usize> {
        self.with_exclusive_access(|state| state.ring.total_size())
            .await
    }

    /// Number of stored entries
    pub async fn entry_count(&self) -> LogResult<usize> {
        self.with_exclusive_access(|state| state.ring.len()).await
    }

    /// Resolve an index+offset seek command to a flattened position
    pub async fn resolve(&self, cmd: SeekTo) -> LogResult<usize> {
        self.with_exclusive_access(|state| OffsetAdjuster::resolve(&state.ring, cmd))
            .await?
    }

    /// Free every stored entry and any pending bytes
    ///
    /// Used at shutdown, after the interrupt token has fired, so this waits
    /// on the lock without racing the token.
    pub async fn release(&self) -> usize {
        let mut state = self.state.lock().await;
        state.pending.clear();
        state.ring.clear()
    }
}

impl<const N: usize> Default for LogAccessPoint<N> {
    fn default() -> Self {
        Self::new()
    }
}
