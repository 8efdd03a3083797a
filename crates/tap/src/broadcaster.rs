//! Broadcaster - live fan-out of ingested records
//!
//! `Broadcaster` is the integration point between the ingest path and live
//! consumers. It provides:
//!
//! - Zero cost when no subscribers (inline check)
//! - Per-subscriber filtering before anything is queued
//! - Bounded per-subscriber queues; `publish` never waits on a consumer
//! - Automatic cleanup of closed subscriptions
//!
//! # Usage
//!
//! ```ignore
//! let broadcaster = Broadcaster::new(TapConfig::default());
//!
//! // Consumer side:
//! let mut subscription = broadcaster.subscribe()?;
//! while let Some(record) = subscription.recv().await { ... }
//!
//! // In the ingest path, after the record is stored:
//! broadcaster.publish(&record);  // No-op if no subscribers
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use syslens_protocol::SyslogRecord;
use syslens_store::RecordFilter;

use crate::error::{Result, TapError};
use crate::subscriber::{CloseReason, Delivery, OverflowPolicy, SubscriberManager, Subscription};

/// Default per-subscriber queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default maximum number of concurrent subscribers
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 100;

/// Broadcaster configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapConfig {
    /// Records buffered per subscriber (K)
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub max_subscribers: usize,
}

impl TapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(TapError::InvalidConfig(
                "queue_capacity must be greater than 0".into(),
            ));
        }
        if self.max_subscribers == 0 {
            return Err(TapError::InvalidConfig(
                "max_subscribers must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
        }
    }
}

/// Result of publishing one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Subscribers the record was queued for
    pub delivered: usize,
    /// Of those, how many had to discard their oldest record
    pub dropped_oldest: usize,
    /// Subscribers closed because their queue was full
    pub disconnected: usize,
}

/// Fan-out point for live records
#[derive(Debug)]
pub struct Broadcaster {
    config: TapConfig,
    /// Subscriber manager
    subscribers: SubscriberManager,
    /// Total records published while someone was listening
    published: AtomicU64,
    /// Total per-subscriber deliveries
    delivered: AtomicU64,
    /// Total records discarded by drop-oldest
    dropped: AtomicU64,
    /// Total subscribers disconnected on overflow
    disconnected: AtomicU64,
}

impl Broadcaster {
    pub fn new(config: TapConfig) -> Self {
        Self {
            config,
            subscribers: SubscriberManager::new(),
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            disconnected: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    /// Subscribe to every record
    pub fn subscribe(&self) -> Result<Subscription> {
        self.subscribe_with(RecordFilter::new())
    }

    /// Subscribe to records matching `filter`
    pub fn subscribe_with(&self, filter: RecordFilter) -> Result<Subscription> {
        let subscription = self.subscribers.subscribe(
            filter,
            self.config.queue_capacity,
            self.config.overflow_policy,
            self.config.max_subscribers,
        )?;

        debug!(id = subscription.id(), "new live subscriber");
        Ok(subscription)
    }

    /// Unsubscribe by ID; pending records for it are discarded
    pub fn unsubscribe(&self, id: u64) -> Result<()> {
        self.subscribers.unsubscribe(id)?;

        debug!(id, "live subscriber removed");
        Ok(())
    }

    /// Deliver a record to every matching subscriber
    ///
    /// This is the hot path. The subscriber set is read from a snapshot, so
    /// concurrent subscribe/unsubscribe calls never wait on delivery. Each
    /// push is O(1) and never blocks on a slow consumer.
    #[inline]
    pub fn publish(&self, record: &Arc<SyslogRecord>) -> PublishOutcome {
        // Fast path: no subscribers = no work (zero cost)
        if !self.subscribers.has_subscribers() {
            return PublishOutcome::default();
        }

        self.published.fetch_add(1, Ordering::Relaxed);

        let subscribers = self.subscribers.snapshot();
        let mut outcome = PublishOutcome::default();
        let mut stale = false;

        for subscriber in subscribers.iter() {
            if !subscriber.matches(record) {
                continue;
            }

            match subscriber.deliver(Arc::clone(record)) {
                Delivery::Queued => outcome.delivered += 1,
                Delivery::QueuedDroppedOldest => {
                    outcome.delivered += 1;
                    outcome.dropped_oldest += 1;
                }
                Delivery::Overflowed => {
                    outcome.disconnected += 1;
                    stale = true;
                    debug!(id = subscriber.id(), "subscriber queue full, disconnecting");
                }
                Delivery::Closed => stale = true,
            }
        }

        if outcome.delivered > 0 {
            self.delivered
                .fetch_add(outcome.delivered as u64, Ordering::Relaxed);
            trace!(delivered = outcome.delivered, sequence = record.sequence, "published record");
        }
        if outcome.dropped_oldest > 0 {
            self.dropped
                .fetch_add(outcome.dropped_oldest as u64, Ordering::Relaxed);
        }
        if outcome.disconnected > 0 {
            self.disconnected
                .fetch_add(outcome.disconnected as u64, Ordering::Relaxed);
        }

        if stale {
            self.cleanup();
        }

        outcome
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.count()
    }

    /// Check if there are any subscribers
    #[inline]
    pub fn has_subscribers(&self) -> bool {
        self.subscribers.has_subscribers()
    }

    /// Get broadcaster statistics
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            disconnected: self.disconnected.load(Ordering::Relaxed),
            subscriber_count: self.subscribers.count(),
        }
    }

    /// Remove closed subscriptions
    ///
    /// Called after a publish that saw one, and periodically by the
    /// ingest maintenance pass.
    pub fn cleanup(&self) -> usize {
        let removed = self.subscribers.cleanup_disconnected();

        if removed > 0 {
            debug!(removed, "cleaned up closed subscribers");
        }

        removed
    }

    /// Close every subscription; their `recv` returns `None`
    pub fn shutdown(&self) {
        let closed = self.subscribers.close_all(CloseReason::Shutdown);
        debug!(closed, "broadcaster shut down");
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(TapConfig::default())
    }
}

/// Statistics about the broadcaster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Records published while at least one subscriber existed
    pub published: u64,
    /// Per-subscriber deliveries
    pub delivered: u64,
    /// Records discarded by drop-oldest queues
    pub dropped: u64,
    /// Subscribers disconnected on overflow
    pub disconnected: u64,
    /// Current number of subscribers
    pub subscriber_count: usize,
}

#[cfg(test)]
#[path = "broadcaster_test.rs"]
mod tests;
