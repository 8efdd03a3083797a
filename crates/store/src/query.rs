//! Read-only query service over the retention buffer
//!
//! Queries never block ingestion for longer than it takes to clone the
//! matching `Arc`s out of the buffer.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use syslens_protocol::{ParseStatus, Severity, SyslogRecord};

use crate::buffer::{Order, RetentionBuffer};
use crate::filter::RecordFilter;

/// Default number of entries in `Stats::top_sources`
pub const DEFAULT_TOP_SOURCES: usize = 10;

/// A query against retained records
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: RecordFilter,
    /// Maximum records returned (None = all matches)
    pub limit: Option<usize>,
    /// Matching records skipped before the first one returned
    pub offset: usize,
    pub order: Order,
}

impl Query {
    /// All records, newest first
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn chronological(self) -> Self {
        self.with_order(Order::Chronological)
    }
}

/// Per-source activity summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub source: IpAddr,
    pub hostname: Option<String>,
    pub count: usize,
    pub last_seen: DateTime<Utc>,
}

/// Counts per parse status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub ok: usize,
    pub partially_parsed: usize,
    pub malformed: usize,
}

/// Aggregate view of the retained records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    /// Records currently retained
    pub total: usize,
    /// Records ever appended
    pub appended: u64,
    /// Records ever evicted
    pub evicted: u64,
    /// Indexed by severity value
    pub by_severity: [usize; 8],
    pub unknown_severity: usize,
    pub by_status: StatusCounts,
    /// Busiest (source, hostname) pairs, most records first
    pub top_sources: Vec<SourceSummary>,
}

impl Stats {
    pub fn severity_count(&self, severity: Severity) -> usize {
        self.by_severity[severity.as_u8() as usize]
    }
}

/// Query front-end over a shared retention buffer
#[derive(Debug, Clone)]
pub struct QueryService {
    buffer: Arc<RetentionBuffer>,
}

impl QueryService {
    pub fn new(buffer: Arc<RetentionBuffer>) -> Self {
        Self { buffer }
    }

    /// Run a query
    pub fn query(&self, query: &Query) -> Vec<Arc<SyslogRecord>> {
        self.buffer
            .select(&query.filter, query.order, query.offset, query.limit)
    }

    /// The `n` most recent records, newest first
    pub fn recent(&self, n: usize) -> Vec<Arc<SyslogRecord>> {
        self.query(&Query::new().with_limit(n))
    }

    /// Number of records matching `filter`
    pub fn count(&self, filter: &RecordFilter) -> usize {
        self.buffer.count(filter)
    }

    /// Aggregate counts over everything retained
    pub fn stats(&self, top_n: usize) -> Stats {
        let mut stats = Stats {
            appended: self.buffer.total_appended(),
            evicted: self.buffer.total_evicted(),
            ..Stats::default()
        };

        let mut sources: HashMap<(IpAddr, Option<String>), (usize, DateTime<Utc>)> = HashMap::new();

        self.buffer.for_each(|record| {
            stats.total += 1;

            match record.severity {
                Some(s) => stats.by_severity[s.as_u8() as usize] += 1,
                None => stats.unknown_severity += 1,
            }

            match record.status {
                ParseStatus::Ok => stats.by_status.ok += 1,
                ParseStatus::PartiallyParsed => stats.by_status.partially_parsed += 1,
                ParseStatus::Malformed => stats.by_status.malformed += 1,
            }

            let entry = sources
                .entry((record.source.ip(), record.hostname.clone()))
                .or_insert((0, record.received_at));
            entry.0 += 1;
            entry.1 = entry.1.max(record.received_at);
        });

        let mut top: Vec<SourceSummary> = sources
            .into_iter()
            .map(|((source, hostname), (count, last_seen))| SourceSummary {
                source,
                hostname,
                count,
                last_seen,
            })
            .collect();
        top.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.last_seen.cmp(&a.last_seen))
                .then_with(|| a.source.cmp(&b.source))
        });
        top.truncate(top_n);
        stats.top_sources = top;

        stats
    }

    pub fn buffer(&self) -> &Arc<RetentionBuffer> {
        &self.buffer
    }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
