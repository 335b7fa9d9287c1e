//! Accumulation of partial writes into complete records
//!
//! Bytes arrive in arbitrary chunks. [`PendingAccumulator`] holds them until a
//! [`TERMINATOR`] is seen, then [`drain`](PendingAccumulator::drain) hands out
//! everything up to and including that terminator as one [`Entry`].

use crate::entry::{Entry, TERMINATOR};
use crate::error::{LogError, LogResult};

/// Growable buffer assembling one record at a time
#[derive(Debug, Default)]
pub struct PendingAccumulator {
    data: Vec<u8>,
    /// Position of the first terminator in `data`, if any
    terminator_at: Option<usize>,
}

impl PendingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes, returning whether a complete record is now available
    ///
    /// Only the newly appended region is scanned. Fails with
    /// [`LogError::ResourceExhausted`] if the buffer cannot grow, in which
    /// case nothing is appended.
    pub fn append(&mut self, bytes: &[u8]) -> LogResult<bool> {
        self.data
            .try_reserve(bytes.len())
            .map_err(|_| LogError::ResourceExhausted {
                requested: self.data.len().saturating_add(bytes.len()),
            })?;

        let start = self.data.len();
        self.data.extend_from_slice(bytes);

        if self.terminator_at.is_none() {
            self.terminator_at = find_terminator(&self.data[start..]).map(|pos| start + pos);
        }

        Ok(self.terminator_at.is_some())
    }

    /// Whether a complete record is buffered
    pub fn has_terminator(&self) -> bool {
        self.terminator_at.is_some()
    }

    /// Take the first complete record out of the buffer
    ///
    /// Bytes after the terminator stay pending. Returns `None` when no
    /// terminator has been seen; partial records are never handed out.
    pub fn drain(&mut self) -> Option<Entry> {
        let end = self.terminator_at? + 1;
        let rest = self.data.split_off(end);
        let record = std::mem::replace(&mut self.data, rest);
        self.terminator_at = find_terminator(&self.data);
        Some(Entry::new(record))
    }

    /// Take every complete record, oldest first
    pub fn drain_all(&mut self) -> Vec<Entry> {
        std::iter::from_fn(|| self.drain()).collect()
    }

    /// Discard buffered bytes, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.data.len();
        self.data = Vec::new();
        self.terminator_at = None;
        dropped
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

fn find_terminator(bytes: &[u8]) -> Option<usize> {
    bytes.iter().position(|&b| b == TERMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_without_terminator() {
        let mut acc = PendingAccumulator::new();
        assert!(!acc.append(b"hel").unwrap());
        assert!(!acc.append(b"lo").unwrap());
        assert_eq!(acc.len(), 5);
        assert!(acc.drain().is_none());
        assert_eq!(acc.as_slice(), b"hello");
    }

    #[test]
    fn test_terminator_across_writes() {
        let mut acc = PendingAccumulator::new();
        acc.append(b"par").unwrap();
        assert!(acc.append(b"tial\n").unwrap());

        let entry = acc.drain().unwrap();
        assert_eq!(entry.as_bytes().as_ref(), b"partial\n");
        assert!(acc.is_empty());
        assert!(!acc.has_terminator());
    }

    #[test]
    fn test_terminator_stays_reported_until_drained() {
        let mut acc = PendingAccumulator::new();
        assert!(acc.append(b"a\n").unwrap());
        assert!(acc.append(b"more").unwrap());
        assert_eq!(acc.drain().unwrap().as_bytes().as_ref(), b"a\n");
        assert!(!acc.has_terminator());
        assert_eq!(acc.as_slice(), b"more");
    }

    #[test]
    fn test_multiple_records_in_one_append() {
        let mut acc = PendingAccumulator::new();
        assert!(acc.append(b"one\ntwo\nthr").unwrap());

        let records = acc.drain_all();
        let records: Vec<_> = records.iter().map(|e| e.as_bytes().to_vec()).collect();
        assert_eq!(records, vec![b"one\n".to_vec(), b"two\n".to_vec()]);
        assert_eq!(acc.as_slice(), b"thr");

        assert!(acc.append(b"ee\n").unwrap());
        assert_eq!(acc.drain().unwrap().as_bytes().as_ref(), b"three\n");
    }

    #[test]
    fn test_empty_record() {
        let mut acc = PendingAccumulator::new();
        assert!(acc.append(b"\n").unwrap());
        assert_eq!(acc.drain().unwrap().size(), 1);
    }

    #[test]
    fn test_clear_discards_partial() {
        let mut acc = PendingAccumulator::new();
        acc.append(b"dangling").unwrap();
        assert_eq!(acc.clear(), 8);
        assert!(acc.is_empty());
        assert!(!acc.append(b"x").unwrap());
    }
}
