//! Syslens - Pipeline
//!
//! The single ingest path every listener feeds.
//!
//! # Architecture
//!
//! ```text
//! [Sources]                  [Ingestor]                       [Consumers]
//!    UDP ────┐                                          ┌──→ QueryService (snapshots)
//!            ├──→ parse ──→ ┤ writer lock ├──→ RetentionBuffer
//!    TCP ────┘               append, publish ──→ Broadcaster ──→ Subscription queues
//! ```
//!
//! # Key Design
//!
//! - **Parse outside the lock**: decoding runs on the caller's task, concurrently
//! - **Single writer**: append and publish happen under one short mutex, so every
//!   subscriber observes records in sequence order
//! - **Never blocks on consumers**: publish only touches bounded queues
//! - **Arc sharing**: the buffer and all subscriber queues hold the same record
//!
//! # Example
//!
//! ```ignore
//! use syslens_pipeline::Ingestor;
//!
//! let ingestor = Arc::new(Ingestor::new(RetentionPolicy::default(), TapConfig::default())?);
//! let mut live = ingestor.broadcaster().subscribe()?;
//!
//! ingestor.ingest_now(&b"<34>Jan  1 00:00:00 host app: hello"[..], peer);
//! let record = live.recv().await;
//! ```

mod error;
mod ingest;
mod metrics;

pub use error::{PipelineError, Result};
pub use ingest::Ingestor;
pub use metrics::{IngestMetrics, IngestMetricsSnapshot};

/// Default interval between background eviction passes
pub const DEFAULT_EVICTION_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);
