//! Syslog Sources
//!
//! RFC 3164 and RFC 5424 syslog receivers.
//!
//! # Available Sources
//!
//! - **UDP** - One message per datagram, multi-worker
//! - **TCP** - Newline or octet-counted framing (RFC 6587)
//!
//! # Design
//!
//! Both listeners stamp each message on arrival and hand it to the shared
//! [`Ingestor`](syslens_pipeline::Ingestor); parsing, retention and fan-out
//! happen there. A listener never fails on message content, only on its
//! transport.

pub mod framing;
pub mod tcp;
pub mod udp;

pub use framing::{FrameDecoder, FrameError, Framing};
pub use tcp::{
    SyslogTcpMetricsHandle, SyslogTcpMetricsSnapshot, SyslogTcpSource, SyslogTcpSourceConfig,
    SyslogTcpSourceError, SyslogTcpSourceMetrics,
};
pub use udp::{
    SyslogUdpMetricsHandle, SyslogUdpMetricsSnapshot, SyslogUdpSource, SyslogUdpSourceConfig,
    SyslogUdpSourceError, SyslogUdpSourceMetrics,
};
