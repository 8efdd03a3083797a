//! Error types for the tap crate

use thiserror::Error;

/// Errors that can occur in the live subscription system
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TapError {
    /// Maximum subscribers reached
    #[error("maximum subscribers reached ({max})")]
    MaxSubscribers { max: usize },

    /// Subscriber not found
    #[error("subscriber not found: {id}")]
    SubscriberNotFound { id: u64 },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for tap operations
pub type Result<T> = std::result::Result<T, TapError>;
