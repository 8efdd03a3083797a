//! Syslens Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid config: both syslog listeners on port 514,
//! 10000 records or 24 hours of retention.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use syslens_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[sources.syslog_udp]\nport = 5514").unwrap();
//! assert_eq!(config.sources.syslog_udp.port, 5514);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//! format = "json"
//!
//! [sources.syslog_udp]
//! port = 514
//!
//! [sources.syslog_tcp]
//! port = 514
//! framing = "auto"
//!
//! [retention]
//! max_records = 10000
//! max_age = "24h"
//!
//! [tap]
//! queue_capacity = 256
//! overflow_policy = "drop_oldest"
//! ```

mod error;
mod logging;
mod metrics;
mod retention;
mod sources;
mod tap;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metrics::MetricsConfig;
pub use retention::RetentionConfig;
pub use sources::{SourcesConfig, StreamFraming, SyslogTcpSourceConfig, SyslogUdpSourceConfig};
pub use tap::{OverflowPolicyConfig, TapConfig};
pub use validation::MAX_UDP_PAYLOAD;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Metrics reporting configuration
    pub metrics: MetricsConfig,

    /// Syslog listeners
    pub sources: SourcesConfig,

    /// Retention buffer bounds
    pub retention: RetentionConfig,

    /// Live subscription settings
    pub tap: TapConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Get list of enabled source names
    pub fn enabled_sources(&self) -> Vec<&'static str> {
        self.sources.enabled()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
