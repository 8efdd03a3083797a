//! Retention configuration

use serde::Deserialize;
use std::time::Duration;

/// Retention buffer bounds
///
/// Either bound may be switched off with 0, but not both.
///
/// # Example
///
/// ```toml
/// [retention]
/// max_records = 50000
/// max_age = "6h"
/// eviction_interval = "10s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Keep at most this many records (0 = no count bound)
    /// Default: 10000
    pub max_records: usize,

    /// Drop records older than this ("0s" = no age bound)
    /// Default: 24h
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,

    /// How often aged records are evicted without new traffic
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub eviction_interval: Duration,
}

impl RetentionConfig {
    /// Count bound, if any
    pub fn record_limit(&self) -> Option<usize> {
        (self.max_records > 0).then_some(self.max_records)
    }

    /// Age bound, if any
    pub fn age_limit(&self) -> Option<Duration> {
        (!self.max_age.is_zero()).then_some(self.max_age)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_records: 10_000,
            max_age: Duration::from_secs(24 * 60 * 60),
            eviction_interval: Duration::from_secs(10),
        }
    }
}
