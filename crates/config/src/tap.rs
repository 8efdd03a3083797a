//! Live subscription configuration

use serde::Deserialize;

/// What a full subscriber queue does with the next record
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicyConfig {
    /// Discard the oldest queued record (default)
    #[default]
    DropOldest,
    /// Close the subscription
    DisconnectOnFull,
}

/// Live subscription configuration
///
/// # Example
///
/// ```toml
/// [tap]
/// queue_capacity = 1024
/// overflow_policy = "disconnect_on_full"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TapConfig {
    /// Records buffered per subscriber
    /// Default: 256
    pub queue_capacity: usize,

    /// Default: drop_oldest
    pub overflow_policy: OverflowPolicyConfig,

    /// Default: 100
    pub max_subscribers: usize,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            overflow_policy: OverflowPolicyConfig::DropOldest,
            max_subscribers: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_defaults() {
        let config = TapConfig::default();
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.overflow_policy, OverflowPolicyConfig::DropOldest);
        assert_eq!(config.max_subscribers, 100);
    }

    #[test]
    fn test_tap_overflow_policy() {
        let config: TapConfig =
            toml::from_str(r#"overflow_policy = "disconnect_on_full""#).unwrap();
        assert_eq!(config.overflow_policy, OverflowPolicyConfig::DisconnectOnFull);

        let result: Result<TapConfig, _> = toml::from_str(r#"overflow_policy = "block""#);
        assert!(result.is_err());
    }
}
