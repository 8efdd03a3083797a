//! Syslens Collector
//!
//! Wires the syslens crates into a running syslog collector:
//!
//! ```text
//! UDP / TCP listeners ──→ Ingestor ──→ RetentionBuffer ──→ QueryService
//!                             │
//!                             └──→ Broadcaster ──→ Subscriptions
//! ```
//!
//! The `syslens` binary is a thin CLI over [`Collector`]; the same type is
//! used by the integration tests to run the whole pipeline in-process.

pub mod reporter;
pub mod runtime;

pub use reporter::{CollectedMetrics, CollectedSource, MetricsReporter};
pub use runtime::{
    Collector, DEFAULT_CONFIG_PATHS, RunningCollector, load_config, retention_policy,
    tap_config, tcp_source_config, udp_source_config,
};
