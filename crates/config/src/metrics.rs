//! Metrics reporting configuration
//!
//! Counters are always collected; this controls whether and how often they
//! are written to the log.

use serde::Deserialize;
use std::time::Duration;

/// Metrics configuration
///
/// # Example
///
/// ```toml
/// [metrics]
/// enabled = true
/// interval = "60s"
/// include_sources = true
/// include_pipeline = true
/// include_tap = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable periodic reporting
    /// Default: true
    pub enabled: bool,

    /// Reporting interval
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Per-listener counters (connections, messages, bytes, framing errors)
    pub include_sources: bool,

    /// Ingest counters (records per parse status, retained, evicted)
    pub include_pipeline: bool,

    /// Live subscription counters (subscribers, delivered, dropped)
    pub include_tap: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
            include_sources: true,
            include_pipeline: true,
            include_tap: true,
        }
    }
}
