//! Configuration validation
//!
//! Validates config consistency:
//! - At least one source is enabled
//! - Listener addresses parse and sizes are non-zero
//! - Retention is bounded by count or age
//! - Periodic tasks have a non-zero interval

use std::net::SocketAddr;
use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::sources::{SyslogTcpSourceConfig, SyslogUdpSourceConfig};

/// Largest payload an IPv4 UDP datagram can carry
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_sources(config)?;
    validate_retention(config)?;
    validate_tap(config)?;
    validate_metrics(config)?;
    Ok(())
}

fn validate_sources(config: &Config) -> Result<()> {
    let sources = &config.sources;
    if !sources.syslog_udp.enabled && !sources.syslog_tcp.enabled {
        return Err(ConfigError::NoSourcesEnabled);
    }

    if sources.syslog_udp.enabled {
        validate_udp(&sources.syslog_udp)?;
    }
    if sources.syslog_tcp.enabled {
        validate_tcp(&sources.syslog_tcp)?;
    }
    Ok(())
}

fn validate_udp(udp: &SyslogUdpSourceConfig) -> Result<()> {
    const NAME: &str = "syslog_udp";

    validate_address(NAME, &udp.address, udp.port)?;
    positive(NAME, "num_workers", udp.num_workers)?;
    positive(NAME, "max_message_size", udp.max_message_size)?;
    if udp.max_message_size > MAX_UDP_PAYLOAD {
        return Err(ConfigError::invalid_value(
            "source",
            NAME,
            "max_message_size",
            format!("must be at most {MAX_UDP_PAYLOAD}"),
        ));
    }
    if let Some(size) = udp.buffer_size {
        positive(NAME, "buffer_size", size)?;
    }
    Ok(())
}

fn validate_tcp(tcp: &SyslogTcpSourceConfig) -> Result<()> {
    const NAME: &str = "syslog_tcp";

    validate_address(NAME, &tcp.address, tcp.port)?;
    positive(NAME, "max_frame_size", tcp.max_frame_size)?;
    positive(NAME, "max_connections", tcp.max_connections)?;
    if let Some(size) = tcp.buffer_size {
        positive(NAME, "buffer_size", size)?;
    }
    Ok(())
}

fn validate_address(name: &str, address: &str, port: u16) -> Result<()> {
    format!("{address}:{port}")
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|e| ConfigError::invalid_value("source", name, "address", e.to_string()))
}

fn positive(name: &str, field: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::invalid_value(
            "source",
            name,
            field,
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_retention(config: &Config) -> Result<()> {
    let retention = &config.retention;
    if retention.record_limit().is_none() && retention.age_limit().is_none() {
        return Err(ConfigError::UnboundedRetention);
    }
    non_zero_interval("retention", "eviction_interval", retention.eviction_interval)
}

fn validate_tap(config: &Config) -> Result<()> {
    let tap = &config.tap;
    for (field, value) in [
        ("queue_capacity", tap.queue_capacity),
        ("max_subscribers", tap.max_subscribers),
    ] {
        if value == 0 {
            return Err(ConfigError::invalid_value(
                "tap",
                "tap",
                field,
                "must be greater than 0",
            ));
        }
    }
    Ok(())
}

fn validate_metrics(config: &Config) -> Result<()> {
    if !config.metrics.enabled {
        return Ok(());
    }
    non_zero_interval("metrics", "interval", config.metrics.interval)
}

fn non_zero_interval(component: &'static str, field: &'static str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(ConfigError::invalid_value(
            component,
            component,
            field,
            "must be greater than 0s",
        ));
    }
    Ok(())
}
