//! Ingest metrics
//!
//! Atomic counters for tracking what the ingest path has seen.
//! All operations use relaxed ordering for maximum performance.

use std::sync::atomic::{AtomicU64, Ordering};

use syslens_protocol::ParseStatus;
use syslens_tap::PublishOutcome;

/// Metrics for the ingest path
///
/// These metrics are eventually consistent, not real-time.
///
/// # Thread Safety
///
/// All methods are safe to call from multiple threads concurrently.
#[derive(Debug, Default)]
pub struct IngestMetrics {
    /// Records ingested (one per message)
    records_ingested: AtomicU64,

    /// Raw bytes ingested
    bytes_ingested: AtomicU64,

    /// Records with a fully decoded header
    parsed_ok: AtomicU64,

    /// Records with some fields decoded
    partially_parsed: AtomicU64,

    /// Records nothing could be decoded from
    malformed: AtomicU64,

    /// Per-subscriber deliveries
    live_deliveries: AtomicU64,

    /// Records a subscriber lost to drop-oldest
    live_drops: AtomicU64,

    /// Subscribers disconnected on a full queue
    live_disconnects: AtomicU64,
}

impl IngestMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            records_ingested: AtomicU64::new(0),
            bytes_ingested: AtomicU64::new(0),
            parsed_ok: AtomicU64::new(0),
            partially_parsed: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            live_deliveries: AtomicU64::new(0),
            live_drops: AtomicU64::new(0),
            live_disconnects: AtomicU64::new(0),
        }
    }

    /// Record one parsed message
    #[inline]
    pub fn record_ingested(&self, status: ParseStatus, byte_count: u64) {
        self.records_ingested.fetch_add(1, Ordering::Relaxed);
        self.bytes_ingested.fetch_add(byte_count, Ordering::Relaxed);

        let counter = match status {
            ParseStatus::Ok => &self.parsed_ok,
            ParseStatus::PartiallyParsed => &self.partially_parsed,
            ParseStatus::Malformed => &self.malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the fan-out result for one record
    #[inline]
    pub fn record_published(&self, outcome: &PublishOutcome) {
        if outcome.delivered > 0 {
            self.live_deliveries
                .fetch_add(outcome.delivered as u64, Ordering::Relaxed);
        }
        if outcome.dropped_oldest > 0 {
            self.live_drops
                .fetch_add(outcome.dropped_oldest as u64, Ordering::Relaxed);
        }
        if outcome.disconnected > 0 {
            self.live_disconnects
                .fetch_add(outcome.disconnected as u64, Ordering::Relaxed);
        }
    }

    /// Get a snapshot of all metrics
    #[inline]
    pub fn snapshot(&self) -> IngestMetricsSnapshot {
        IngestMetricsSnapshot {
            records_ingested: self.records_ingested.load(Ordering::Relaxed),
            bytes_ingested: self.bytes_ingested.load(Ordering::Relaxed),
            parsed_ok: self.parsed_ok.load(Ordering::Relaxed),
            partially_parsed: self.partially_parsed.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            live_deliveries: self.live_deliveries.load(Ordering::Relaxed),
            live_drops: self.live_drops.load(Ordering::Relaxed),
            live_disconnects: self.live_disconnects.load(Ordering::Relaxed),
        }
    }

    /// Get records ingested count
    #[inline]
    pub fn records_ingested(&self) -> u64 {
        self.records_ingested.load(Ordering::Relaxed)
    }

    /// Get malformed count
    #[inline]
    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}

/// Point-in-time snapshot of ingest metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestMetricsSnapshot {
    pub records_ingested: u64,
    pub bytes_ingested: u64,
    pub parsed_ok: u64,
    pub partially_parsed: u64,
    pub malformed: u64,
    pub live_deliveries: u64,
    pub live_drops: u64,
    pub live_disconnects: u64,
}

impl IngestMetricsSnapshot {
    /// Fraction of records that were malformed (0.0 - 1.0)
    ///
    /// Returns None if nothing has been ingested.
    #[inline]
    pub fn malformed_rate(&self) -> Option<f64> {
        if self.records_ingested == 0 {
            None
        } else {
            Some(self.malformed as f64 / self.records_ingested as f64)
        }
    }

    /// Difference from an earlier snapshot, for per-interval reporting
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            records_ingested: self.records_ingested.saturating_sub(earlier.records_ingested),
            bytes_ingested: self.bytes_ingested.saturating_sub(earlier.bytes_ingested),
            parsed_ok: self.parsed_ok.saturating_sub(earlier.parsed_ok),
            partially_parsed: self.partially_parsed.saturating_sub(earlier.partially_parsed),
            malformed: self.malformed.saturating_sub(earlier.malformed),
            live_deliveries: self.live_deliveries.saturating_sub(earlier.live_deliveries),
            live_drops: self.live_drops.saturating_sub(earlier.live_drops),
            live_disconnects: self.live_disconnects.saturating_sub(earlier.live_disconnects),
        }
    }
}
