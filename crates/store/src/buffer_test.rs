//! Tests for the retention buffer

use super::*;
use chrono::TimeDelta;
use std::net::SocketAddr;
use syslens_protocol::parse;

fn make_record(text: &str) -> SyslogRecord {
    let source: SocketAddr = "10.0.0.1:514".parse().unwrap();
    parse(text.as_bytes().to_vec(), source, Utc::now())
}

// ============================================================================
// Basic operations
// ============================================================================

#[test]
fn test_new_buffer_is_empty() {
    let buffer = RetentionBuffer::new();
    assert!(buffer.is_empty());
    assert_eq!(buffer.len(), 0);
    assert_eq!(buffer.total_appended(), 0);
    assert_eq!(buffer.sequence_range(), None);
}

#[test]
fn test_append_assigns_increasing_sequences() {
    let buffer = RetentionBuffer::new();

    let first = buffer.append(make_record("<13>one"));
    let second = buffer.append(make_record("<13>two"));

    assert_eq!(first.sequence, 1);
    assert_eq!(second.sequence, 2);
    assert_eq!(buffer.len(), 2);
    assert_eq!(buffer.total_appended(), 2);
    assert_eq!(buffer.sequence_range(), Some((1, 2)));
}

#[test]
fn test_append_returns_the_stored_record() {
    let buffer = RetentionBuffer::new();
    let stored = buffer.append(make_record("<13>hello"));

    let snapshot = buffer.snapshot(&RecordFilter::new());
    assert!(Arc::ptr_eq(&stored, &snapshot[0]));
}

#[test]
fn test_received_at_is_clamped_to_high_water() {
    let buffer = RetentionBuffer::new();
    let now = Utc::now();

    let mut late = make_record("<13>late");
    late.received_at = now;
    let mut early = make_record("<13>early");
    early.received_at = now - TimeDelta::seconds(5);

    buffer.append(late);
    let stored = buffer.append(early);

    assert_eq!(stored.received_at, now);
    assert_eq!(stored.sequence, 2);
}

// ============================================================================
// Count bound
// ============================================================================

#[test]
fn test_count_bound_evicts_oldest() {
    let buffer = RetentionBuffer::with_policy(RetentionPolicy::count(3));

    for i in 0..5 {
        buffer.append(make_record(&format!("<13>msg {i}")));
    }

    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.total_appended(), 5);
    assert_eq!(buffer.total_evicted(), 2);
    assert_eq!(buffer.sequence_range(), Some((3, 5)));

    let messages: Vec<_> = buffer
        .snapshot(&RecordFilter::new())
        .iter()
        .map(|r| r.message.clone())
        .collect();
    assert_eq!(messages, vec!["msg 2", "msg 3", "msg 4"]);
}

#[test]
fn test_count_bound_holds_after_every_append() {
    let buffer = RetentionBuffer::with_policy(RetentionPolicy::count(10));
    for i in 0..100 {
        buffer.append(make_record(&format!("<13>{i}")));
        assert!(buffer.len() <= 10);
    }
}

#[test]
fn test_zero_count_bound_retains_nothing() {
    let buffer = RetentionBuffer::with_policy(RetentionPolicy::count(0));
    let stored = buffer.append(make_record("<13>gone"));

    assert_eq!(stored.sequence, 1);
    assert!(buffer.is_empty());
    assert_eq!(buffer.total_evicted(), 1);
}

// ============================================================================
// Age bound
// ============================================================================

#[test]
fn test_age_bound_evicts_expired_on_append() {
    let buffer = RetentionBuffer::with_policy(RetentionPolicy::age(Duration::from_secs(60)));
    let start = Instant::now();

    buffer.append_at(make_record("<13>old"), start);
    buffer.append_at(make_record("<13>new"), start + Duration::from_secs(61));

    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer.snapshot(&RecordFilter::new())[0].message, "new");
}

#[test]
fn test_evict_expired_without_appends() {
    let buffer = RetentionBuffer::with_policy(RetentionPolicy::age(Duration::from_secs(10)));
    let start = Instant::now();

    buffer.append_at(make_record("<13>a"), start);
    buffer.append_at(make_record("<13>b"), start + Duration::from_secs(5));

    assert_eq!(buffer.evict_expired_at(start + Duration::from_secs(9)), 0);
    assert_eq!(buffer.evict_expired_at(start + Duration::from_secs(11)), 1);
    assert_eq!(buffer.evict_expired_at(start + Duration::from_secs(16)), 1);
    assert!(buffer.is_empty());
}

#[test]
fn test_unbounded_age_never_expires() {
    let buffer = RetentionBuffer::with_policy(RetentionPolicy::count(100));
    let start = Instant::now();
    buffer.append_at(make_record("<13>a"), start);

    assert_eq!(buffer.evict_expired_at(start + Duration::from_secs(1_000_000)), 0);
    assert_eq!(buffer.len(), 1);
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn test_snapshot_is_chronological_and_filtered() {
    let buffer = RetentionBuffer::new();
    buffer.append(make_record("<11>error one"));
    buffer.append(make_record("<14>info"));
    buffer.append(make_record("<11>error two"));

    let filter = RecordFilter::new().with_text("error");
    let snapshot = buffer.snapshot(&filter);

    assert_eq!(snapshot.len(), 2);
    assert!(snapshot[0].sequence < snapshot[1].sequence);
}

#[test]
fn test_select_newest_first_with_offset_and_limit() {
    let buffer = RetentionBuffer::new();
    for i in 1..=10 {
        buffer.append(make_record(&format!("<13>{i}")));
    }

    let page = buffer.select(&RecordFilter::new(), Order::NewestFirst, 2, Some(3));
    let sequences: Vec<u64> = page.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![8, 7, 6]);

    let page = buffer.select(&RecordFilter::new(), Order::Chronological, 8, Some(5));
    let sequences: Vec<u64> = page.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![9, 10]);
}

#[test]
fn test_select_zero_limit_is_empty() {
    let buffer = RetentionBuffer::new();
    buffer.append(make_record("<13>x"));
    assert!(buffer.select(&RecordFilter::new(), Order::NewestFirst, 0, Some(0)).is_empty());
}

#[test]
fn test_snapshot_is_unaffected_by_later_appends() {
    let buffer = RetentionBuffer::with_policy(RetentionPolicy::count(2));
    buffer.append(make_record("<13>a"));
    buffer.append(make_record("<13>b"));

    let snapshot = buffer.snapshot(&RecordFilter::new());
    buffer.append(make_record("<13>c"));
    buffer.append(make_record("<13>d"));

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].message, "a");
    assert_eq!(snapshot[1].message, "b");
}

#[test]
fn test_clear_keeps_sequence_numbering() {
    let buffer = RetentionBuffer::new();
    buffer.append(make_record("<13>a"));
    buffer.clear();
    assert!(buffer.is_empty());

    let next = buffer.append(make_record("<13>b"));
    assert_eq!(next.sequence, 2);
}

#[test]
fn test_concurrent_readers_see_consistent_snapshots() {
    let buffer = Arc::new(RetentionBuffer::with_policy(RetentionPolicy::count(50)));

    let writer = {
        let buffer = Arc::clone(&buffer);
        std::thread::spawn(move || {
            for i in 0..2_000 {
                buffer.append(make_record(&format!("<13>{i}")));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let snapshot = buffer.snapshot(&RecordFilter::new());
                    assert!(snapshot.len() <= 50);
                    for pair in snapshot.windows(2) {
                        assert_eq!(pair[0].sequence + 1, pair[1].sequence);
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(buffer.total_appended(), 2_000);
}
