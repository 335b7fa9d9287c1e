//! Fixed-capacity circular store of entries
//!
//! [`RingLog`] keeps at most `N` entries. Once full, every insert evicts the
//! oldest entry (strict FIFO). Readers address the log by *flattened* byte
//! offset: the position a byte would have if all entries were concatenated
//! oldest-first.
//!
//! ## Slot layout
//!
//! ```text
//!  read_index           write_index
//!      v                    v
//! [ e2 ][ e3 ][ e4 ][ -- ][ -- ]     not full: [read, write) occupied
//! [ e5 ][ e6 ][ e2 ][ e3 ][ e4 ]     full: read == write, next add evicts e2
//!                ^
//!         read_index == write_index
//! ```

use bytes::{Bytes, BytesMut};

use crate::entry::Entry;
use crate::error::{LogError, LogResult};

/// Number of slots in the shared log
pub const RING_CAPACITY: usize = 10;

/// Circular buffer of [`Entry`] records with FIFO eviction
#[derive(Debug)]
pub struct RingLog<const N: usize = RING_CAPACITY> {
    slots: [Option<Entry>; N],
    /// Next slot to fill
    write_index: usize,
    /// Oldest occupied slot
    read_index: usize,
    full: bool,
}

impl<const N: usize> RingLog<N> {
    const NON_ZERO: () = assert!(N > 0, "ring capacity must be non-zero");

    /// Create an empty ring
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_ZERO;
        Self {
            slots: std::array::from_fn(|_| None),
            write_index: 0,
            read_index: 0,
            full: false,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        if self.full {
            N
        } else {
            (self.write_index + N - self.read_index) % N
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.write_index == self.read_index
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Store an entry, returning the evicted oldest entry if the ring was full
    pub fn add_entry(&mut self, entry: Entry) -> Option<Entry> {
        let evicted = if self.full {
            let oldest = self.slots[self.read_index].take();
            self.read_index = (self.read_index + 1) % N;
            oldest
        } else {
            None
        };

        self.slots[self.write_index] = Some(entry);
        self.write_index = (self.write_index + 1) % N;
        self.full = self.write_index == self.read_index;

        evicted
    }

    /// Iterate over occupied entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        (0..self.len()).filter_map(move |i| self.slots[(self.read_index + i) % N].as_ref())
    }

    /// Entry at logical position `index` (0 is the oldest)
    pub fn get(&self, index: usize) -> Option<&Entry> {
        if index >= self.len() {
            return None;
        }
        self.slots[(self.read_index + index) % N].as_ref()
    }

    /// Sum of all occupied entry sizes
    pub fn total_size(&self) -> usize {
        self.iter().map(Entry::size).sum()
    }

    /// Locate the entry containing flattened byte `offset`
    ///
    /// Returns the entry and the offset within it, or `None` when `offset`
    /// is at or past the end of the log.
    pub fn find_entry_for_flat_offset(&self, offset: usize) -> Option<(&Entry, usize)> {
        let mut remaining = offset;
        for entry in self.iter() {
            if remaining < entry.size() {
                return Some((entry, remaining));
            }
            remaining -= entry.size();
        }
        None
    }

    /// Translate `(index, offset)` into a flattened byte offset
    ///
    /// `index` counts from the oldest entry, not the raw slot. `offset` may
    /// equal the entry size (one past its last byte) but not exceed it.
    pub fn resolve_index_offset(&self, index: usize, offset: usize) -> LogResult<usize> {
        let mut flat = 0;
        for (i, entry) in self.iter().enumerate() {
            if i == index {
                if offset > entry.size() {
                    return Err(LogError::OffsetOutOfRange {
                        index,
                        offset,
                        size: entry.size(),
                    });
                }
                return Ok(flat + offset);
            }
            flat += entry.size();
        }
        Err(LogError::EntryOutOfRange {
            index,
            entries: self.len(),
        })
    }

    /// Read up to `max_len` bytes at flattened `offset`
    ///
    /// The read never crosses an entry boundary; callers loop to read more.
    /// Returns an empty buffer at or past the end of the log.
    pub fn read_at(&self, offset: usize, max_len: usize) -> Bytes {
        match self.find_entry_for_flat_offset(offset) {
            Some((entry, intra)) => {
                let end = entry.size().min(intra.saturating_add(max_len));
                entry.as_bytes().slice(intra..end)
            }
            None => Bytes::new(),
        }
    }

    /// Read up to `max_len` bytes at flattened `offset`, crossing entries
    ///
    /// Shorter than `max_len` only when the end of the log is reached.
    pub fn read_span(&self, offset: usize, max_len: usize) -> Bytes {
        let mut out = BytesMut::new();
        let mut pos = offset;
        while out.len() < max_len {
            let chunk = self.read_at(pos, max_len - out.len());
            if chunk.is_empty() {
                break;
            }
            pos += chunk.len();
            out.extend_from_slice(&chunk);
        }
        out.freeze()
    }

    /// Concatenate all entries in logical order
    pub fn contents(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.total_size());
        for entry in self.iter() {
            out.extend_from_slice(entry.as_bytes());
        }
        out.freeze()
    }

    /// Drop every entry and reset to empty, returning how many were freed
    pub fn clear(&mut self) -> usize {
        let freed = self.len();
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.write_index = 0;
        self.read_index = 0;
        self.full = false;
        freed
    }
}

impl<const N: usize> Default for RingLog<N> {
    fn default() -> Self {
        Self::new()
    }
}
