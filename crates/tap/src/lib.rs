//! Syslens Tap - live fan-out of syslog records to subscribers
//!
//! This crate delivers every stored record to any number of live consumers
//! without letting a slow consumer hold up ingestion:
//!
//! - Filters per subscriber before queueing (severity, source, text, ...)
//! - Bounded queue per subscriber with drop-oldest or disconnect-on-full
//! - Per-subscriber order matches publish order
//! - Auto-cleans subscriptions whose handle was dropped
//! - Has zero cost when no subscribers are connected
//!
//! # Architecture
//!
//! ```text
//! Ingestor.ingest()
//!     │
//!     ├──→ RetentionBuffer.append() ──→ Arc<SyslogRecord>
//!     │                                      │
//!     │                                      ▼
//!     │                               Broadcaster.publish()
//!     │                                      │
//!     │                      ┌───────────────┼───────────────┐
//!     │                      ▼               ▼               ▼
//!     │                  queue (K)       queue (K)       queue (K)
//!     │                      │               │               │
//!     └──→───────────── Subscription   Subscription    Subscription
//! ```

mod broadcaster;
mod error;
mod subscriber;

pub use broadcaster::{
    BroadcastStats, Broadcaster, DEFAULT_MAX_SUBSCRIBERS, DEFAULT_QUEUE_CAPACITY,
    PublishOutcome, TapConfig,
};
pub use error::{Result, TapError};
pub use subscriber::{
    CloseReason, OverflowPolicy, Subscriber, SubscriberManager, Subscription, TryRecvError,
};
