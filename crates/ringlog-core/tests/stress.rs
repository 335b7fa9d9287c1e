//! Stress tests for ringlog-core
//!
//! These tests exercise the ring under sustained eviction, verify offset
//! flattening against a reference model, and hammer the shared access point
//! from many concurrent writers.

use std::collections::VecDeque;
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::Instant;

use ringlog_core::{Entry, LogAccessPoint, LogCursor, RingLog, SeekTo};

// ============================================================================
// Ring Invariants
// ============================================================================

/// Insert far more entries than capacity and compare against a VecDeque model
#[test]
fn test_ring_matches_fifo_model() {
    const CAP: usize = 7;
    let mut ring = RingLog::<CAP>::new();
    let mut model: VecDeque<Entry> = VecDeque::new();

    let start = Instant::now();
    for i in 0..5_000usize {
        let record = Entry::from(format!("{}{}\n", "x".repeat(i % 13), i));
        let evicted = ring.add_entry(record.clone());

        model.push_back(record);
        let expected_eviction = if model.len() > CAP {
            model.pop_front()
        } else {
            None
        };

        assert_eq!(evicted, expected_eviction);
        assert!(ring.len() <= CAP);
        assert_eq!(ring.len(), model.len());
        assert_eq!(ring.is_full(), model.len() == CAP);
    }
    println!("Inserted 5000 entries in {:?}", start.elapsed());

    let held: Vec<_> = ring.iter().cloned().collect();
    let expected: Vec<_> = model.into_iter().collect();
    assert_eq!(held, expected);
}

/// Every flattened offset maps back to the byte at that position
#[test]
fn test_flattening_round_trip_at_every_fill_level() {
    let mut ring = RingLog::<5>::new();
    for i in 0..12usize {
        ring.add_entry(Entry::from(format!("entry-{}-{}\n", i, "#".repeat(i))));

        let contents = ring.contents();
        assert_eq!(contents.len(), ring.total_size());

        let rebuilt: Vec<u8> = (0..ring.total_size())
            .map(|offset| {
                let (entry, intra) = ring.find_entry_for_flat_offset(offset).unwrap();
                entry.as_bytes()[intra]
            })
            .collect();
        assert_eq!(rebuilt, contents.to_vec());
        assert!(ring.find_entry_for_flat_offset(ring.total_size()).is_none());
    }
}

/// resolve_index_offset agrees with summing sizes of earlier entries
#[test]
fn test_index_offset_resolution_matches_prefix_sums() {
    let mut ring = RingLog::<4>::new();
    for i in 0..9usize {
        ring.add_entry(Entry::from(format!("{}\n", "y".repeat(i + 1))));
    }

    let sizes: Vec<usize> = ring.iter().map(Entry::size).collect();
    let mut prefix = 0;
    for (index, size) in sizes.iter().enumerate() {
        for offset in 0..=*size {
            assert_eq!(ring.resolve_index_offset(index, offset).unwrap(), prefix + offset);
        }
        assert!(ring.resolve_index_offset(index, size + 1).is_err());
        prefix += size;
    }
    assert!(ring.resolve_index_offset(sizes.len(), 0).is_err());
}

// ============================================================================
// Concurrent Access
// ============================================================================

/// Many writers committing whole records concurrently never tear an entry
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_store_whole_records() {
    const WRITERS: usize = 32;
    let log: Arc<LogAccessPoint<64>> = Arc::new(LogAccessPoint::new());

    let mut handles = Vec::new();
    for w in 0..WRITERS {
        let log = log.clone();
        handles.push(tokio::spawn(async move {
            let record = format!("writer {w} says hello\n");
            log.commit_and_snapshot(vec![Entry::from(record)]).await
        }));
    }

    for handle in handles {
        let snapshot = handle.await.unwrap().unwrap();
        assert!(snapshot.ends_with(b"\n"));
    }

    assert_eq!(log.entry_count().await.unwrap(), WRITERS);

    let contents = log.snapshot().await.unwrap();
    let text = std::str::from_utf8(&contents).unwrap();
    let mut lines: Vec<_> = text.lines().collect();
    lines.sort();
    let mut expected: Vec<_> = (0..WRITERS)
        .map(|w| format!("writer {w} says hello"))
        .collect();
    expected.sort();
    assert_eq!(lines, expected);
}

/// Two concurrent flushes raise the entry count by exactly two
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_concurrent_flushes() {
    let log: Arc<LogAccessPoint> = Arc::new(LogAccessPoint::new());
    log.append_entry(Entry::from("seed\n")).await.unwrap();
    let before = log.entry_count().await.unwrap();

    let a = {
        let log = log.clone();
        tokio::spawn(async move { log.commit_and_snapshot(vec![Entry::from("left\n")]).await })
    };
    let b = {
        let log = log.clone();
        tokio::spawn(async move { log.commit_and_snapshot(vec![Entry::from("right\n")]).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(log.entry_count().await.unwrap(), before + 2);
    for entry_text in ["seed\n", "left\n", "right\n"] {
        let contents = log.snapshot().await.unwrap();
        assert!(
            contents
                .windows(entry_text.len())
                .any(|w| w == entry_text.as_bytes())
        );
    }
}

/// Readers seeking around while writers append always see whole entries
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_and_writers_interleave() {
    let log: Arc<LogAccessPoint<8>> = Arc::new(LogAccessPoint::new());

    let writer = {
        let log = log.clone();
        tokio::spawn(async move {
            let mut cursor = LogCursor::new(log);
            for i in 0..500 {
                cursor.write(format!("line {i:04}\n").as_bytes()).await.unwrap();
            }
        })
    };

    let reader = {
        let log = log.clone();
        tokio::spawn(async move {
            let mut cursor = LogCursor::new(log);
            for _ in 0..500 {
                if cursor.seek_to_entry(SeekTo::new(0, 0)).await.is_err() {
                    continue;
                }
                let contents = cursor.read_to_end().await.unwrap();
                // Every entry is exactly "line NNNN\n"; torn state would break this
                for line in contents.split(|&b| b == b'\n').filter(|l| !l.is_empty()) {
                    assert_eq!(line.len(), 9);
                    assert!(line.starts_with(b"line "));
                }
                cursor.seek(SeekFrom::Start(0)).await.unwrap();
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();

    assert_eq!(log.entry_count().await.unwrap(), 8);
    let contents = log.snapshot().await.unwrap();
    assert!(contents.starts_with(b"line 0492\n"));
    assert!(contents.ends_with(b"line 0499\n"));
}
