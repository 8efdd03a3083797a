//! Ingestor - the parse, append, publish path
//!
//! Listeners hand every accepted message to [`Ingestor::ingest`]. The record is
//! decoded on the calling task, then appended to the retention buffer and
//! published to live subscribers while holding the writer lock. That lock is
//! what makes the sequence order observed by subscribers match the buffer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use syslens_protocol::{SyslogRecord, parse};
use syslens_store::{QueryService, RetentionBuffer, RetentionPolicy};
use syslens_tap::{Broadcaster, TapConfig};

use crate::error::{PipelineError, Result};
use crate::metrics::IngestMetrics;

/// Shared ingest path
#[derive(Debug)]
pub struct Ingestor {
    buffer: Arc<RetentionBuffer>,
    broadcaster: Arc<Broadcaster>,
    query: QueryService,
    /// Serializes append+publish
    writer: Mutex<()>,
    metrics: IngestMetrics,
}

impl Ingestor {
    /// Build a pipeline from a retention policy and broadcaster settings
    pub fn new(policy: RetentionPolicy, tap: TapConfig) -> Result<Self> {
        if !policy.is_bounded() {
            return Err(PipelineError::UnboundedRetention);
        }
        tap.validate()?;

        Ok(Self::from_parts(
            Arc::new(RetentionBuffer::with_policy(policy)),
            Arc::new(Broadcaster::new(tap)),
        ))
    }

    /// Build a pipeline around existing components
    pub fn from_parts(buffer: Arc<RetentionBuffer>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            query: QueryService::new(Arc::clone(&buffer)),
            buffer,
            broadcaster,
            writer: Mutex::new(()),
            metrics: IngestMetrics::new(),
        }
    }

    /// Ingest one message received from `source` at `received_at`
    ///
    /// Never fails: undecodable input is retained as a malformed record.
    pub fn ingest(
        &self,
        raw: impl Into<Bytes>,
        source: SocketAddr,
        received_at: DateTime<Utc>,
    ) -> Arc<SyslogRecord> {
        let raw = raw.into();
        let byte_count = raw.len() as u64;
        let record = parse(raw, source, received_at);
        let status = record.status;

        let (record, outcome) = {
            let _writer = self.writer.lock();
            let record = self.buffer.append(record);
            let outcome = self.broadcaster.publish(&record);
            (record, outcome)
        };

        self.metrics.record_ingested(status, byte_count);
        self.metrics.record_published(&outcome);

        trace!(
            sequence = record.sequence,
            peer = %source,
            status = %status,
            "record ingested"
        );
        record
    }

    /// Ingest one message stamped with the current time
    #[inline]
    pub fn ingest_now(&self, raw: impl Into<Bytes>, source: SocketAddr) -> Arc<SyslogRecord> {
        self.ingest(raw, source, Utc::now())
    }

    #[inline]
    pub fn buffer(&self) -> &Arc<RetentionBuffer> {
        &self.buffer
    }

    #[inline]
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    #[inline]
    pub fn query_service(&self) -> &QueryService {
        &self.query
    }

    #[inline]
    pub fn metrics(&self) -> &IngestMetrics {
        &self.metrics
    }

    /// One maintenance pass: expire aged records, prune closed subscribers
    ///
    /// Returns the number of records evicted.
    pub fn run_maintenance(&self) -> usize {
        let evicted = self.buffer.evict_expired();
        let pruned = self.broadcaster.cleanup();
        if evicted > 0 || pruned > 0 {
            debug!(evicted, pruned, "maintenance pass");
        }
        evicted
    }

    /// Spawn a background task running [`run_maintenance`](Self::run_maintenance)
    /// every `interval` until `cancel` fires
    pub fn spawn_maintenance(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let ingestor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        ingestor.run_maintenance();
                    }
                }
            }
            debug!("maintenance task stopped");
        })
    }

    /// Close every live subscription
    pub fn shutdown(&self) {
        self.broadcaster.shutdown();
        info!(
            retained = self.buffer.len(),
            ingested = self.metrics.records_ingested(),
            "ingestor shut down"
        );
    }
}

#[cfg(test)]
#[path = "ingest_test.rs"]
mod tests;
