//! Pipeline error types
//!
//! Ingestion itself never fails; these cover assembling the pipeline.

use thiserror::Error;

use syslens_tap::TapError;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Retention policy bounds neither count nor age
    #[error("retention policy must bound record count or age")]
    UnboundedRetention,

    /// Broadcaster configuration rejected
    #[error(transparent)]
    Tap(#[from] TapError),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::UnboundedRetention;
        assert!(err.to_string().contains("retention"));

        let err = PipelineError::from(TapError::InvalidConfig("queue_capacity".into()));
        assert!(err.to_string().contains("queue_capacity"));
    }
}
