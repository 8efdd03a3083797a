//! Common types and utilities for sources
//!
//! Shared functionality across the syslog listeners (UDP, TCP).

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics shared by all source types
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Currently active connections (workers for UDP)
    pub connections_active: AtomicU64,

    /// Total connections accepted (workers started for UDP)
    pub connections_total: AtomicU64,

    /// Total messages handed to the ingestor
    pub messages_received: AtomicU64,

    /// Total bytes received
    pub bytes_received: AtomicU64,

    /// Total errors encountered
    pub errors: AtomicU64,
}

impl SourceMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Increment active connections
    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement active connections
    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Currently active connections
    #[inline]
    pub fn active(&self) -> u64 {
        self.connections_active.load(Ordering::Relaxed)
    }

    /// Record a message handed to the ingestor
    #[inline]
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bytes read off the wire
    #[inline]
    pub fn bytes_read(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record error
    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> SourceMetricsSnapshot {
        SourceMetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of the shared source metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceMetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
    pub errors: u64,
}

/// Uniform access to a running source's metrics for periodic reporting
pub trait SourceMetricsProvider: Send + Sync {
    /// Configured source id
    fn source_id(&self) -> &str;

    /// Transport name ("syslog_udp", "syslog_tcp")
    fn source_type(&self) -> &str;

    fn snapshot(&self) -> SourceMetricsSnapshot;
}

/// Trim trailing newline from message (LF or CRLF)
#[inline]
pub fn trim_trailing_newline(data: &[u8]) -> &[u8] {
    let mut end = data.len();

    if end > 0 && data[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && data[end - 1] == b'\r' {
            end -= 1;
        }
    }

    &data[..end]
}
