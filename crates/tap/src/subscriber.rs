//! Subscriber management for live record delivery
//!
//! Each live consumer gets:
//! - a `Subscriber` entry in the shared set, holding its filter and queue
//! - a `Subscription` handle it reads records from
//!
//! Queues are bounded at the configured capacity. A full queue either drops
//! its oldest record (`OverflowPolicy::DropOldest`) or closes the
//! subscription (`OverflowPolicy::DisconnectOnFull`). Pushing never waits.
//!
//! The `SubscriberManager` keeps the set as a copy-on-write `Arc<Vec<_>>`:
//! publishers clone the `Arc` under a brief read lock and fan out without
//! holding any lock.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use syslens_protocol::SyslogRecord;
use syslens_store::RecordFilter;

use crate::error::{Result, TapError};

/// Counter for generating unique subscriber IDs
static SUBSCRIBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// What happens when a subscriber's queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Discard the oldest queued record to make room
    #[default]
    DropOldest,
    /// Close the subscription
    DisconnectOnFull,
}

/// Why a subscription stopped delivering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Explicit unsubscribe or handle dropped
    Unsubscribed,
    /// Queue overflowed under `DisconnectOnFull`
    Overflow,
    /// Broadcaster shut down
    Shutdown,
}

/// Non-blocking receive failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// Nothing queued right now
    Empty,
    /// Subscription is closed and drained
    Closed(CloseReason),
}

/// Outcome of pushing one record into a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Queued,
    /// Queued after discarding the oldest entry
    QueuedDroppedOldest,
    /// Queue was full and has been closed
    Overflowed,
    /// Queue was already closed
    Closed,
}

#[derive(Debug)]
struct QueueState {
    items: VecDeque<Arc<SyslogRecord>>,
    closed: Option<CloseReason>,
}

/// Bounded single-consumer queue with a wakeup signal
#[derive(Debug)]
pub(crate) struct DeliveryQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
    policy: OverflowPolicy,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl DeliveryQueue {
    fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: None,
            }),
            notify: Notify::new(),
            capacity,
            policy,
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn push(&self, record: Arc<SyslogRecord>) -> Delivery {
        let outcome = {
            let mut state = self.state.lock();
            if state.closed.is_some() {
                return Delivery::Closed;
            }

            if state.items.len() < self.capacity {
                state.items.push_back(record);
                Delivery::Queued
            } else {
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        state.items.pop_front();
                        state.items.push_back(record);
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        Delivery::QueuedDroppedOldest
                    }
                    OverflowPolicy::DisconnectOnFull => {
                        state.closed = Some(CloseReason::Overflow);
                        state.items.clear();
                        Delivery::Overflowed
                    }
                }
            }
        };

        if outcome != Delivery::Overflowed {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
        outcome
    }

    /// Close the queue and discard pending records
    ///
    /// Returns false if it was already closed.
    pub(crate) fn close(&self, reason: CloseReason) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed.is_some() {
                return false;
            }
            state.closed = Some(reason);
            state.items.clear();
        }
        self.notify.notify_one();
        true
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed.is_some()
    }

    fn try_pop(&self) -> std::result::Result<Arc<SyslogRecord>, TryRecvError> {
        let mut state = self.state.lock();
        if let Some(record) = state.items.pop_front() {
            return Ok(record);
        }
        match state.closed {
            Some(reason) => Err(TryRecvError::Closed(reason)),
            None => Err(TryRecvError::Empty),
        }
    }
}

/// A registered subscriber in the shared set
#[derive(Debug)]
pub struct Subscriber {
    /// Unique identifier
    id: u64,
    /// Records outside the filter are never queued
    filter: RecordFilter,
    queue: Arc<DeliveryQueue>,
}

impl Subscriber {
    /// Get the subscriber ID
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the filter
    #[inline]
    pub fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    #[inline]
    pub fn matches(&self, record: &SyslogRecord) -> bool {
        self.filter.matches(record)
    }

    #[inline]
    pub(crate) fn deliver(&self, record: Arc<SyslogRecord>) -> Delivery {
        self.queue.push(record)
    }

    /// Check if this subscriber can still receive
    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.queue.is_closed()
    }

    pub(crate) fn close(&self, reason: CloseReason) -> bool {
        self.queue.close(reason)
    }
}

/// Consumer handle for one subscription
///
/// Records arrive in publish order. Dropping the handle closes the
/// subscription; the broadcaster removes it on its next publish or cleanup.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    queue: Arc<DeliveryQueue>,
}

impl Subscription {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next record
    ///
    /// Returns `None` once the subscription is closed. Records still queued
    /// when it closes are discarded.
    pub async fn recv(&mut self) -> Option<Arc<SyslogRecord>> {
        loop {
            match self.queue.try_pop() {
                Ok(record) => return Some(record),
                Err(TryRecvError::Closed(_)) => return None,
                Err(TryRecvError::Empty) => {}
            }
            // notify_one stores a permit when nobody is waiting, so a push
            // between try_pop and here is not lost.
            self.queue.notify.notified().await;
        }
    }

    /// Take the next record if one is queued
    pub fn try_recv(&mut self) -> std::result::Result<Arc<SyslogRecord>, TryRecvError> {
        self.queue.try_pop()
    }

    /// Why the subscription closed, if it has
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.queue.state.lock().closed
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Records currently queued
    pub fn pending(&self) -> usize {
        self.queue.state.lock().items.len()
    }

    /// Records discarded by `DropOldest`; gaps show up in `sequence`
    pub fn dropped(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }

    /// Records accepted into the queue
    pub fn delivered(&self) -> u64 {
        self.queue.delivered.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.queue.close(CloseReason::Unsubscribed);
    }
}

/// Manages all active subscribers
#[derive(Debug, Default)]
pub struct SubscriberManager {
    /// Copy-on-write set: writers replace the Vec, readers clone the Arc
    subscribers: RwLock<Arc<Vec<Arc<Subscriber>>>>,
    /// Mirrors `!subscribers.is_empty()`, only written under the write lock
    non_empty: AtomicBool,
}

impl SubscriberManager {
    /// Create a new subscriber manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(
        &self,
        filter: RecordFilter,
        capacity: usize,
        policy: OverflowPolicy,
        max_subscribers: usize,
    ) -> Result<Subscription> {
        let mut subscribers = self.subscribers.write();

        if subscribers.len() >= max_subscribers {
            return Err(TapError::MaxSubscribers {
                max: max_subscribers,
            });
        }

        let id = SUBSCRIBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(DeliveryQueue::new(capacity, policy));

        let mut next = Vec::with_capacity(subscribers.len() + 1);
        next.extend(subscribers.iter().cloned());
        next.push(Arc::new(Subscriber {
            id,
            filter,
            queue: Arc::clone(&queue),
        }));
        *subscribers = Arc::new(next);
        self.non_empty.store(true, Ordering::Release);

        Ok(Subscription { id, queue })
    }

    /// Unsubscribe by ID, closing its queue
    pub fn unsubscribe(&self, id: u64) -> Result<()> {
        let mut subscribers = self.subscribers.write();

        let Some(subscriber) = subscribers.iter().find(|s| s.id() == id).cloned() else {
            return Err(TapError::SubscriberNotFound { id });
        };

        subscriber.close(CloseReason::Unsubscribed);
        *subscribers = Arc::new(
            subscribers
                .iter()
                .filter(|s| s.id() != id)
                .cloned()
                .collect(),
        );
        self.non_empty
            .store(!subscribers.is_empty(), Ordering::Release);

        Ok(())
    }

    /// Current set, for lock-free iteration
    #[inline]
    pub fn snapshot(&self) -> Arc<Vec<Arc<Subscriber>>> {
        Arc::clone(&*self.subscribers.read())
    }

    /// Get number of active subscribers
    pub fn count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Check if there are any subscribers without taking the lock
    #[inline]
    pub fn has_subscribers(&self) -> bool {
        self.non_empty.load(Ordering::Acquire)
    }

    /// Remove subscribers whose queues are closed
    pub fn cleanup_disconnected(&self) -> usize {
        let mut subscribers = self.subscribers.write();
        let original_len = subscribers.len();
        if subscribers.iter().all(|s| s.is_connected()) {
            return 0;
        }

        *subscribers = Arc::new(
            subscribers
                .iter()
                .filter(|s| s.is_connected())
                .cloned()
                .collect(),
        );
        self.non_empty
            .store(!subscribers.is_empty(), Ordering::Release);
        original_len - subscribers.len()
    }

    /// Close and remove every subscriber
    pub fn close_all(&self, reason: CloseReason) -> usize {
        let mut subscribers = self.subscribers.write();
        let count = subscribers.len();
        for subscriber in subscribers.iter() {
            subscriber.close(reason);
        }
        *subscribers = Arc::new(Vec::new());
        self.non_empty.store(false, Ordering::Release);
        count
    }
}

#[cfg(test)]
#[path = "subscriber_test.rs"]
mod tests;
