//! Bounded retention buffer for syslog records
//!
//! The `RetentionBuffer` keeps recent records in arrival order, bounded by a
//! record count, an age, or both. It is append-only: the only mutation other
//! than appending is eviction from the head, which is O(1) per record.
//!
//! Appending assigns the arrival sequence number, so the buffer is always
//! ordered by `(received_at, sequence)`. A record whose arrival time is
//! earlier than the newest stored one (two listeners racing) is clamped to
//! the newest time to keep that ordering.
//!
//! Readers take a shared lock only for as long as it takes to clone the
//! `Arc`s they select; they never observe a half-applied append or eviction.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use syslens_protocol::SyslogRecord;

use crate::filter::RecordFilter;

/// Default count bound
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// Default age bound
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Largest up-front allocation, whatever the count bound
const MAX_PREALLOCATE: usize = 65_536;

/// Bounds applied on every append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Keep at most this many records (None = unbounded)
    pub max_records: Option<usize>,
    /// Drop records older than this (None = unbounded)
    pub max_age: Option<Duration>,
}

impl RetentionPolicy {
    pub fn new(max_records: Option<usize>, max_age: Option<Duration>) -> Self {
        Self {
            max_records,
            max_age,
        }
    }

    pub fn count(max_records: usize) -> Self {
        Self::new(Some(max_records), None)
    }

    pub fn age(max_age: Duration) -> Self {
        Self::new(None, Some(max_age))
    }

    /// At least one bound is set
    pub fn is_bounded(&self) -> bool {
        self.max_records.is_some() || self.max_age.is_some()
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_RECORDS), Some(DEFAULT_MAX_AGE))
    }
}

/// Order in which records are returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// Most recent first
    #[default]
    NewestFirst,
    /// Arrival order
    Chronological,
}

#[derive(Debug)]
struct Entry {
    /// Monotonic insertion time, drives age eviction
    stored_at: Instant,
    record: Arc<SyslogRecord>,
}

#[derive(Debug)]
struct BufferInner {
    entries: VecDeque<Entry>,
    /// Next sequence to assign (sequences start at 1)
    next_sequence: u64,
    /// Arrival time of the newest record
    high_water: Option<DateTime<Utc>>,
    /// Total records evicted
    evicted: u64,
}

/// Append-only record store with count and age bounds
#[derive(Debug)]
pub struct RetentionBuffer {
    policy: RetentionPolicy,
    inner: RwLock<BufferInner>,
}

impl RetentionBuffer {
    /// Create a buffer with the default policy
    pub fn new() -> Self {
        Self::with_policy(RetentionPolicy::default())
    }

    pub fn with_policy(policy: RetentionPolicy) -> Self {
        let prealloc = policy.max_records.unwrap_or(0).min(MAX_PREALLOCATE);
        Self {
            policy,
            inner: RwLock::new(BufferInner {
                entries: VecDeque::with_capacity(prealloc),
                next_sequence: 1,
                high_water: None,
                evicted: 0,
            }),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Append a record, assigning its sequence, then enforce the bounds
    ///
    /// Returns the shared record as stored. With a count bound of zero the
    /// record is returned but not retained.
    pub fn append(&self, record: SyslogRecord) -> Arc<SyslogRecord> {
        self.append_at(record, Instant::now())
    }

    /// [`append`](Self::append) with an explicit monotonic clock reading
    pub fn append_at(&self, record: SyslogRecord, now: Instant) -> Arc<SyslogRecord> {
        let mut inner = self.inner.write();

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;

        let received_at = match inner.high_water {
            Some(hw) if record.received_at < hw => hw,
            _ => record.received_at,
        };
        inner.high_water = Some(received_at);

        let record = Arc::new(record.sequenced(sequence, received_at));
        inner.entries.push_back(Entry {
            stored_at: now,
            record: Arc::clone(&record),
        });

        Self::evict_locked(&mut inner, &self.policy, now);
        record
    }

    /// Drop records past the age bound
    ///
    /// Appends already evict; this covers quiet periods with no traffic.
    /// Returns the number of records removed.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    pub fn evict_expired_at(&self, now: Instant) -> usize {
        let mut inner = self.inner.write();
        let removed = Self::evict_locked(&mut inner, &self.policy, now);
        if removed > 0 {
            debug!(removed, retained = inner.entries.len(), "evicted expired records");
        }
        removed
    }

    fn evict_locked(inner: &mut BufferInner, policy: &RetentionPolicy, now: Instant) -> usize {
        let mut removed = 0;

        if let Some(max) = policy.max_records {
            while inner.entries.len() > max {
                inner.entries.pop_front();
                removed += 1;
            }
        }

        if let Some(max_age) = policy.max_age {
            while let Some(front) = inner.entries.front()
                && now.saturating_duration_since(front.stored_at) > max_age
            {
                inner.entries.pop_front();
                removed += 1;
            }
        }

        inner.evicted += removed as u64;
        removed
    }

    /// Consistent copy of all matching records, oldest first
    pub fn snapshot(&self, filter: &RecordFilter) -> Vec<Arc<SyslogRecord>> {
        self.select(filter, Order::Chronological, 0, None)
    }

    /// Matching records in `order`, skipping `offset` and taking at most
    /// `limit`
    ///
    /// Walks from the requested end, so a newest-first query with a small
    /// limit touches only the tail of the buffer.
    pub fn select(
        &self,
        filter: &RecordFilter,
        order: Order,
        offset: usize,
        limit: Option<usize>,
    ) -> Vec<Arc<SyslogRecord>> {
        let inner = self.inner.read();
        let limit = limit.unwrap_or(usize::MAX);
        if limit == 0 {
            return Vec::new();
        }

        let matching = |entry: &&Entry| filter.matches(&entry.record);

        match order {
            Order::Chronological => page(inner.entries.iter().filter(matching), offset, limit),
            Order::NewestFirst => page(inner.entries.iter().rev().filter(matching), offset, limit),
        }
    }

    /// Visit every stored record, oldest first, under the read lock
    pub fn for_each(&self, mut f: impl FnMut(&SyslogRecord)) {
        let inner = self.inner.read();
        for entry in &inner.entries {
            f(&entry.record);
        }
    }

    /// Count matching records
    pub fn count(&self, filter: &RecordFilter) -> usize {
        let inner = self.inner.read();
        if filter.is_empty() {
            return inner.entries.len();
        }
        inner
            .entries
            .iter()
            .filter(|entry| filter.matches(&entry.record))
            .count()
    }

    /// Get the number of records currently retained
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the total number of records ever appended
    pub fn total_appended(&self) -> u64 {
        self.inner.read().next_sequence - 1
    }

    /// Get the total number of records evicted
    pub fn total_evicted(&self) -> u64 {
        self.inner.read().evicted
    }

    /// Sequence of the oldest and newest retained records
    pub fn sequence_range(&self) -> Option<(u64, u64)> {
        let inner = self.inner.read();
        let first = inner.entries.front()?.record.sequence;
        let last = inner.entries.back()?.record.sequence;
        Some((first, last))
    }

    /// Remove every record; sequence numbering continues
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        let removed = inner.entries.len() as u64;
        inner.entries.clear();
        inner.evicted += removed;
    }
}

impl Default for RetentionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn page<'a>(entries: impl Iterator<Item = &'a Entry>, offset: usize, limit: usize) -> Vec<Arc<SyslogRecord>> {
    entries
        .skip(offset)
        .take(limit)
        .map(|entry| Arc::clone(&entry.record))
        .collect()
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod tests;
