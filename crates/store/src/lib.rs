//! Syslens Store - in-memory retention and querying of syslog records
//!
//! - `RetentionBuffer` - append-only, bounded by count and/or age
//! - `RecordFilter` - predicate shared by queries and live subscriptions
//! - `QueryService` - filtered, paginated reads and aggregate stats
//!
//! # Concurrency
//!
//! One writer appends (the ingest path serializes appends), any number of
//! readers take snapshots concurrently. Snapshots clone `Arc`s, never
//! records.

mod buffer;
mod filter;
mod query;

pub use buffer::{DEFAULT_MAX_AGE, DEFAULT_MAX_RECORDS, Order, RetentionBuffer, RetentionPolicy};
pub use filter::RecordFilter;
pub use query::{DEFAULT_TOP_SOURCES, Query, QueryService, SourceSummary, Stats, StatusCounts};
