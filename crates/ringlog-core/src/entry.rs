//! Log entries
//!
//! An [`Entry`] is one stored record: an immutable, owned byte sequence.
//! Dropping the entry (on eviction or shutdown) releases its storage.

use bytes::Bytes;

/// Byte that terminates one logical record
pub const TERMINATOR: u8 = b'\n';

/// A single record held in the ring
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    data: Bytes,
}

impl Entry {
    /// Create an entry from owned bytes
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Size of the record in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the record contents
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Consume the entry, returning its contents
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Whether the record ends with [`TERMINATOR`]
    pub fn is_terminated(&self) -> bool {
        self.data.last() == Some(&TERMINATOR)
    }
}

impl From<&'static str> for Entry {
    fn from(s: &'static str) -> Self {
        Self::new(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Entry {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl From<Vec<u8>> for Entry {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_size_matches_data() {
        let entry = Entry::from("hello\n");
        assert_eq!(entry.size(), 6);
        assert_eq!(entry.as_bytes().as_ref(), b"hello\n");
        assert!(entry.is_terminated());
    }

    #[test]
    fn test_unterminated_entry() {
        let entry = Entry::from(b"partial".to_vec());
        assert!(!entry.is_terminated());
        assert!(!Entry::new(Bytes::new()).is_terminated());
    }
}
