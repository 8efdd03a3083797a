//! Source configuration
//!
//! Both syslog listeners are enabled by default on port 514. UDP and TCP may
//! share a port.

use serde::Deserialize;
use std::time::Duration;

/// Sources configuration
///
/// # Example
///
/// ```toml
/// [sources.syslog_udp]
/// port = 5514
///
/// [sources.syslog_tcp]
/// enabled = false
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Syslog over UDP
    pub syslog_udp: SyslogUdpSourceConfig,

    /// Syslog over TCP
    pub syslog_tcp: SyslogTcpSourceConfig,
}

impl SourcesConfig {
    /// Names of the enabled sources
    pub fn enabled(&self) -> Vec<&'static str> {
        let mut sources = Vec::new();
        if self.syslog_udp.enabled {
            sources.push("syslog_udp");
        }
        if self.syslog_tcp.enabled {
            sources.push("syslog_tcp");
        }
        sources
    }
}

/// Syslog UDP source configuration
///
/// # Example
///
/// ```toml
/// [sources.syslog_udp]
/// address = "0.0.0.0"
/// port = 514
/// num_workers = 4
/// max_message_size = 8192
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyslogUdpSourceConfig {
    /// Default: true
    pub enabled: bool,

    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Default: 514
    pub port: u16,

    /// Socket buffer size (bytes); the listener default when unset
    pub buffer_size: Option<usize>,

    /// Sockets sharing the port via SO_REUSEPORT
    /// Default: 4
    pub num_workers: usize,

    /// Longer datagrams are truncated, and the stored `raw` bytes with them;
    /// raise toward 65507 to keep whole datagrams
    /// Default: 8192 (8KB)
    pub max_message_size: usize,
}

impl Default for SyslogUdpSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "0.0.0.0".into(),
            port: 514,
            buffer_size: None,
            num_workers: 4,
            max_message_size: 8192,
        }
    }
}

/// Stream framing convention for syslog over TCP
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamFraming {
    /// Detect per frame (default)
    #[default]
    Auto,
    /// LF-terminated frames
    Newline,
    /// `MSG-LEN SP MSG` frames
    OctetCounting,
}

/// Syslog TCP source configuration
///
/// # Example
///
/// ```toml
/// [sources.syslog_tcp]
/// port = 514
/// framing = "octet_counting"
/// max_frame_size = 16384
/// idle_timeout = "5m"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyslogTcpSourceConfig {
    /// Default: true
    pub enabled: bool,

    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Default: 514
    pub port: u16,

    /// auto, newline or octet_counting
    /// Default: auto
    pub framing: StreamFraming,

    /// Largest frame accepted; larger frames close the connection
    /// Default: 8192 (8KB)
    pub max_frame_size: usize,

    /// Initial read buffer per connection (bytes); the listener default when unset
    pub buffer_size: Option<usize>,

    /// Default: 1024
    pub max_connections: usize,

    /// Close silent connections after this long ("0s" = never)
    /// Default: 5m
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// Enable TCP_NODELAY
    /// Default: true
    pub no_delay: bool,
}

impl Default for SyslogTcpSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "0.0.0.0".into(),
            port: 514,
            framing: StreamFraming::Auto,
            max_frame_size: 8192,
            buffer_size: None,
            max_connections: 1024,
            idle_timeout: Duration::from_secs(300),
            no_delay: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_both_listeners() {
        let config = SourcesConfig::default();
        assert_eq!(config.enabled(), vec!["syslog_udp", "syslog_tcp"]);
        assert_eq!(config.syslog_udp.port, 514);
        assert_eq!(config.syslog_tcp.port, 514);
        assert_eq!(config.syslog_tcp.framing, StreamFraming::Auto);
        assert_eq!(config.syslog_tcp.max_frame_size, 8192);
    }

    #[test]
    fn test_disable_one_listener() {
        let toml = r#"
[syslog_tcp]
enabled = false
"#;
        let config: SourcesConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.enabled(), vec!["syslog_udp"]);
    }

    #[test]
    fn test_tcp_section() {
        let toml = r#"
[syslog_tcp]
port = 6514
framing = "octet_counting"
max_frame_size = 65536
idle_timeout = "30s"
no_delay = false
"#;
        let config: SourcesConfig = toml::from_str(toml).unwrap();
        let tcp = &config.syslog_tcp;
        assert_eq!(tcp.port, 6514);
        assert_eq!(tcp.framing, StreamFraming::OctetCounting);
        assert_eq!(tcp.max_frame_size, 65536);
        assert_eq!(tcp.idle_timeout, Duration::from_secs(30));
        assert!(!tcp.no_delay);
    }

    #[test]
    fn test_framing_names() {
        for (s, expected) in [
            ("auto", StreamFraming::Auto),
            ("newline", StreamFraming::Newline),
            ("octet_counting", StreamFraming::OctetCounting),
        ] {
            let toml = format!("[syslog_tcp]\nframing = \"{s}\"");
            let config: SourcesConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config.syslog_tcp.framing, expected);
        }

        let result: Result<SourcesConfig, _> =
            toml::from_str("[syslog_tcp]\nframing = \"length\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_udp_section() {
        let toml = r#"
[syslog_udp]
address = "127.0.0.1"
num_workers = 1
buffer_size = 1048576
"#;
        let config: SourcesConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.syslog_udp.address, "127.0.0.1");
        assert_eq!(config.syslog_udp.num_workers, 1);
        assert_eq!(config.syslog_udp.buffer_size, Some(1_048_576));
    }
}
