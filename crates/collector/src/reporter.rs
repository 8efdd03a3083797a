//! Periodic metrics reporter
//!
//! Collects snapshots from the ingestor, the broadcaster and every source on
//! the `[metrics]` interval and logs them as structured `tracing` events.
//! Rates are computed against the previous report.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::info;

use syslens_config::MetricsConfig;
use syslens_pipeline::{Ingestor, IngestMetricsSnapshot};
use syslens_sources::{SourceMetricsProvider, SourceMetricsSnapshot};
use syslens_tap::BroadcastStats;

/// One source's counters at a point in time
#[derive(Debug, Clone)]
pub struct CollectedSource {
    pub id: String,
    pub source_type: String,
    pub snapshot: SourceMetricsSnapshot,
}

/// Everything one report covers
#[derive(Debug, Clone)]
pub struct CollectedMetrics {
    pub at: Instant,
    pub ingest: Option<IngestMetricsSnapshot>,
    pub retained: usize,
    pub tap: Option<BroadcastStats>,
    pub sources: Vec<CollectedSource>,
}

impl CollectedMetrics {
    /// Records ingested per second since `earlier`
    pub fn ingest_rate(&self, earlier: &CollectedMetrics) -> Option<f64> {
        let elapsed = self.at.duration_since(earlier.at).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let now = self.ingest?;
        let before = earlier.ingest?;
        Some(now.since(&before).records_ingested as f64 / elapsed)
    }
}

/// Logs collector metrics on a fixed interval
pub struct MetricsReporter {
    config: MetricsConfig,
    ingestor: Arc<Ingestor>,
    sources: Vec<Arc<dyn SourceMetricsProvider>>,
    previous: Option<CollectedMetrics>,
}

impl MetricsReporter {
    pub fn new(
        config: MetricsConfig,
        ingestor: Arc<Ingestor>,
        sources: Vec<Arc<dyn SourceMetricsProvider>>,
    ) -> Self {
        Self {
            config,
            ingestor,
            sources,
            previous: None,
        }
    }

    /// Run until cancellation
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        info!(
            interval_secs = self.config.interval.as_secs_f64(),
            sources = self.sources.len(),
            "metrics reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => self.report(),
            }
        }
    }

    fn report(&mut self) {
        let metrics = self.collect();
        let rate = self
            .previous
            .as_ref()
            .and_then(|prev| metrics.ingest_rate(prev))
            .unwrap_or(0.0);

        if let Some(ingest) = metrics.ingest {
            info!(
                records = ingest.records_ingested,
                bytes = ingest.bytes_ingested,
                records_per_sec = rate,
                ok = ingest.parsed_ok,
                partial = ingest.partially_parsed,
                malformed = ingest.malformed,
                retained = metrics.retained,
                "ingest metrics"
            );
        }

        if let Some(tap) = metrics.tap {
            info!(
                subscribers = tap.subscriber_count,
                published = tap.published,
                delivered = tap.delivered,
                dropped = tap.dropped,
                disconnected = tap.disconnected,
                "tap metrics"
            );
        }

        for source in &metrics.sources {
            let s = &source.snapshot;
            info!(
                source_id = %source.id,
                source_type = %source.source_type,
                connections_active = s.connections_active,
                connections_total = s.connections_total,
                messages = s.messages_received,
                bytes = s.bytes_received,
                errors = s.errors,
                "source metrics"
            );
        }

        self.previous = Some(metrics);
    }

    /// Collect from every enabled component
    pub fn collect(&self) -> CollectedMetrics {
        CollectedMetrics {
            at: Instant::now(),
            ingest: self
                .config
                .include_pipeline
                .then(|| self.ingestor.metrics().snapshot()),
            retained: self.ingestor.buffer().len(),
            tap: self
                .config
                .include_tap
                .then(|| self.ingestor.broadcaster().stats()),
            sources: if self.config.include_sources {
                self.sources
                    .iter()
                    .map(|s| CollectedSource {
                        id: s.source_id().to_string(),
                        source_type: s.source_type().to_string(),
                        snapshot: s.snapshot(),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;

    use syslens_sources::SourceMetrics;
    use syslens_store::RetentionPolicy;
    use syslens_tap::TapConfig;

    struct TestSource {
        metrics: SourceMetrics,
    }

    impl SourceMetricsProvider for TestSource {
        fn source_id(&self) -> &str {
            "test_udp"
        }
        fn source_type(&self) -> &str {
            "test"
        }
        fn snapshot(&self) -> SourceMetricsSnapshot {
            self.metrics.snapshot()
        }
    }

    fn ingestor() -> Arc<Ingestor> {
        Arc::new(Ingestor::new(RetentionPolicy::default(), TapConfig::default()).unwrap())
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:5514".parse().unwrap()
    }

    #[test]
    fn test_collect_all_components() {
        let ingestor = ingestor();
        ingestor.ingest_now(&b"<13>hello"[..], peer());
        ingestor.ingest_now(vec![0xff, 0x00, 0x13, 0x80], peer());

        let source = TestSource {
            metrics: SourceMetrics::new(),
        };
        source.metrics.message_received();
        source.metrics.message_received();

        let reporter = MetricsReporter::new(
            MetricsConfig::default(),
            Arc::clone(&ingestor),
            vec![Arc::new(source) as Arc<dyn SourceMetricsProvider>],
        );
        let metrics = reporter.collect();

        let ingest = metrics.ingest.unwrap();
        assert_eq!(ingest.records_ingested, 2);
        assert_eq!(ingest.malformed, 1);
        assert_eq!(metrics.retained, 2);
        assert_eq!(metrics.tap.unwrap().subscriber_count, 0);
        assert_eq!(metrics.sources.len(), 1);
        assert_eq!(metrics.sources[0].id, "test_udp");
        assert_eq!(metrics.sources[0].snapshot.messages_received, 2);
    }

    #[test]
    fn test_collect_respects_includes() {
        let config = MetricsConfig {
            include_pipeline: false,
            include_tap: false,
            include_sources: false,
            ..Default::default()
        };
        let source = TestSource {
            metrics: SourceMetrics::new(),
        };
        let reporter = MetricsReporter::new(
            config,
            ingestor(),
            vec![Arc::new(source) as Arc<dyn SourceMetricsProvider>],
        );
        let metrics = reporter.collect();

        assert!(metrics.ingest.is_none());
        assert!(metrics.tap.is_none());
        assert!(metrics.sources.is_empty());
    }

    #[test]
    fn test_ingest_rate() {
        let ingestor = ingestor();
        let reporter =
            MetricsReporter::new(MetricsConfig::default(), Arc::clone(&ingestor), vec![]);

        let mut before = reporter.collect();
        before.at -= Duration::from_secs(2);
        for _ in 0..10 {
            ingestor.ingest_now(&b"<13>tick"[..], peer());
        }
        let after = reporter.collect();

        let rate = after.ingest_rate(&before).unwrap();
        assert!((rate - 5.0).abs() < 0.5, "rate was {rate}");
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let config = MetricsConfig {
            interval: Duration::from_millis(10),
            ..Default::default()
        };
        let reporter = MetricsReporter::new(config, ingestor(), vec![]);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(reporter.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(35)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
