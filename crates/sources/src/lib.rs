//! Syslens - Sources
//!
//! Network listeners that receive syslog messages and feed the ingest path.
//!
//! # Available Sources
//!
//! - **Syslog UDP** - RFC 3164/5424 syslog over UDP with multi-worker support
//! - **Syslog TCP** - RFC 3164/5424 syslog over TCP, newline or octet-counted
//!
//! # Design Principles
//!
//! - **Zero-copy frames**: `bytes::BytesMut` buffers split into `Bytes` frames
//! - **Async I/O**: Built on `tokio` for non-blocking operations
//! - **Fail per connection**: transport errors close one connection, never the listener
//! - **Fatal only at bind**: `bind()` is separate from `serve()` so startup can fail fast
//!
//! # Example
//!
//! ```ignore
//! use syslens_sources::{SyslogUdpSource, SyslogUdpSourceConfig};
//!
//! let source = SyslogUdpSource::new(SyslogUdpSourceConfig::with_port(5514), ingestor);
//! source.run(cancel).await?;
//! ```

pub mod syslog;

// Common types for sources
mod common;

pub use common::{
    SourceMetrics, SourceMetricsProvider, SourceMetricsSnapshot, trim_trailing_newline,
};

pub use syslog::{
    FrameDecoder, FrameError, Framing, SyslogTcpMetricsHandle, SyslogTcpMetricsSnapshot,
    SyslogTcpSource, SyslogTcpSourceConfig, SyslogTcpSourceError, SyslogTcpSourceMetrics,
    SyslogUdpMetricsHandle, SyslogUdpMetricsSnapshot, SyslogUdpSource, SyslogUdpSourceConfig,
    SyslogUdpSourceError, SyslogUdpSourceMetrics,
};
