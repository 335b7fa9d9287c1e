//! Seek resolution for the byte-stream interface
//!
//! Two ways of choosing a read position:
//!
//! - [`SeekFrom`]: absolute, current-relative or end-relative byte positions,
//!   bounded by the total log size.
//! - [`SeekTo`]: an `(entry index, intra-entry offset)` pair, translated into a
//!   flattened position by walking the ring.

use std::io::SeekFrom;

use crate::error::{LogError, LogResult};
use crate::ring::RingLog;

/// Seek command addressing a byte by entry index and offset within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeekTo {
    /// Entry index, 0 being the oldest entry in the log
    pub index: u32,
    /// Byte offset within that entry
    pub offset: u32,
}

impl SeekTo {
    pub fn new(index: u32, offset: u32) -> Self {
        Self { index, offset }
    }
}

/// Translates seek requests into flattened log positions
pub struct OffsetAdjuster;

impl OffsetAdjuster {
    /// Resolve an index+offset command against the current ring contents
    pub fn resolve<const N: usize>(ring: &RingLog<N>, cmd: SeekTo) -> LogResult<usize> {
        ring.resolve_index_offset(cmd.index as usize, cmd.offset as usize)
    }

    /// Resolve a positional seek, given the current position and log size
    ///
    /// The result must land in `0..=total_size`.
    pub fn resolve_seek(current: usize, total_size: usize, pos: SeekFrom) -> LogResult<usize> {
        let target: i128 = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => current as i128 + i128::from(delta),
            SeekFrom::End(delta) => total_size as i128 + i128::from(delta),
        };

        if target < 0 || target > total_size as i128 {
            return Err(LogError::SeekOutOfRange {
                position: target,
                size: total_size,
            });
        }

        Ok(target as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;

    #[test]
    fn test_resolve_seek_variants() {
        assert_eq!(OffsetAdjuster::resolve_seek(0, 10, SeekFrom::Start(4)).unwrap(), 4);
        assert_eq!(OffsetAdjuster::resolve_seek(4, 10, SeekFrom::Current(3)).unwrap(), 7);
        assert_eq!(OffsetAdjuster::resolve_seek(4, 10, SeekFrom::Current(-4)).unwrap(), 0);
        assert_eq!(OffsetAdjuster::resolve_seek(0, 10, SeekFrom::End(0)).unwrap(), 10);
        assert_eq!(OffsetAdjuster::resolve_seek(0, 10, SeekFrom::End(-10)).unwrap(), 0);
    }

    #[test]
    fn test_resolve_seek_out_of_range() {
        let err = OffsetAdjuster::resolve_seek(0, 10, SeekFrom::Start(11)).unwrap_err();
        assert!(matches!(err, LogError::SeekOutOfRange { position: 11, size: 10 }));

        let err = OffsetAdjuster::resolve_seek(2, 10, SeekFrom::Current(-3)).unwrap_err();
        assert!(matches!(err, LogError::SeekOutOfRange { position: -1, .. }));

        assert!(OffsetAdjuster::resolve_seek(0, 10, SeekFrom::End(1)).is_err());
        assert!(OffsetAdjuster::resolve_seek(0, 0, SeekFrom::Start(u64::MAX)).is_err());
    }

    #[test]
    fn test_resolve_index_offset_command() {
        let mut ring = RingLog::<4>::new();
        ring.add_entry(Entry::from("first\n"));
        ring.add_entry(Entry::from("second\n"));

        assert_eq!(OffsetAdjuster::resolve(&ring, SeekTo::new(1, 2)).unwrap(), 8);
        assert!(OffsetAdjuster::resolve(&ring, SeekTo::new(2, 0)).is_err());
        assert!(OffsetAdjuster::resolve(&ring, SeekTo::new(0, 7)).is_err());
    }
}
