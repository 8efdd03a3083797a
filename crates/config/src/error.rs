//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },

    /// Retention would keep records forever
    #[error("retention must bound record count or age - max_records and max_age cannot both be 0")]
    UnboundedRetention,

    /// No sources enabled
    #[error("no sources are enabled - at least one source must be enabled")]
    NoSourcesEnabled,
}

impl ConfigError {
    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}
