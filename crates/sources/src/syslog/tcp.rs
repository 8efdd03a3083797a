//! Syslog TCP Source
//!
//! Syslog receiver over TCP with RFC 6587 framing.
//!
//! # Protocol Support
//!
//! - **RFC 3164** (BSD syslog) - Legacy format, still widely used
//! - **RFC 5424** (IETF syslog) - Structured data support
//!
//! # Framing
//!
//! Newline-delimited (non-transparent) and octet-counted frames, either fixed
//! per listener or detected per frame. See [`Framing`].
//!
//! # Design
//!
//! - **Bounded buffers** - a connection whose pending frame exceeds
//!   `max_frame_size` is closed; other connections are unaffected
//! - **Connection limit** - connections past `max_connections` are refused
//! - **Idle timeout** - silent connections are closed
//! - **Per-connection cancellation** - every handler gets a child token
//!
//! # Example
//!
//! ```ignore
//! let config = SyslogTcpSourceConfig {
//!     address: "0.0.0.0".into(),
//!     port: 514,
//!     ..Default::default()
//! };
//!
//! let source = SyslogTcpSource::new(config, Arc::clone(&ingestor));
//! let listener = source.bind().await?;   // bind failures are fatal
//! source.serve(listener, cancel).await;
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use syslens_pipeline::Ingestor;

use crate::common::{SourceMetrics, SourceMetricsProvider, SourceMetricsSnapshot};
use crate::syslog::framing::{FrameDecoder, FrameError, Framing};

// =============================================================================
// Constants
// =============================================================================

/// Default syslog port (privileged - may need root)
const DEFAULT_PORT: u16 = 514;

/// Default maximum frame size (8KB)
const DEFAULT_MAX_FRAME_SIZE: usize = 8192;

/// Default initial read buffer per connection (16KB)
const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Default maximum concurrent connections
const DEFAULT_MAX_CONNECTIONS: usize = 1024;

/// Default idle timeout (5 minutes)
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Default keepalive interval (30s)
const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// Configuration
// =============================================================================

/// Syslog TCP source configuration
#[derive(Debug, Clone)]
pub struct SyslogTcpSourceConfig {
    /// Source identifier used in logs and metrics
    pub id: String,

    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Stream framing convention
    pub framing: Framing,

    /// Largest frame accepted; also bounds buffered unterminated data
    pub max_frame_size: usize,

    /// Initial read buffer size per connection
    pub buffer_size: usize,

    /// Maximum concurrent connections
    pub max_connections: usize,

    /// Close connections idle this long (zero = never)
    pub idle_timeout: Duration,

    /// TCP nodelay (disable Nagle's algorithm)
    pub nodelay: bool,
}

impl Default for SyslogTcpSourceConfig {
    fn default() -> Self {
        Self {
            id: "syslog_tcp".into(),
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            framing: Framing::Auto,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            nodelay: true,
        }
    }
}

impl SyslogTcpSourceConfig {
    /// Create config with custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Syslog TCP source metrics
#[derive(Debug, Default)]
pub struct SyslogTcpSourceMetrics {
    /// Base source metrics
    pub base: SourceMetrics,

    /// Connections closed for an oversized frame
    pub frames_oversized: AtomicU64,

    /// Connections closed for a framing violation
    pub frames_invalid: AtomicU64,

    /// Connections refused at the connection limit
    pub connections_rejected: AtomicU64,

    /// Connections closed after the idle timeout
    pub connections_timed_out: AtomicU64,
}

impl SyslogTcpSourceMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            base: SourceMetrics::new(),
            frames_oversized: AtomicU64::new(0),
            frames_invalid: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
            connections_timed_out: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn frame_oversized(&self) {
        self.frames_oversized.fetch_add(1, Ordering::Relaxed);
        self.base.error();
    }

    #[inline]
    pub fn frame_invalid(&self) {
        self.frames_invalid.fetch_add(1, Ordering::Relaxed);
        self.base.error();
    }

    #[inline]
    pub fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_timed_out(&self) {
        self.connections_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Get extended metrics snapshot
    pub fn snapshot(&self) -> SyslogTcpMetricsSnapshot {
        SyslogTcpMetricsSnapshot {
            connections_active: self.base.connections_active.load(Ordering::Relaxed),
            connections_total: self.base.connections_total.load(Ordering::Relaxed),
            messages_received: self.base.messages_received.load(Ordering::Relaxed),
            bytes_received: self.base.bytes_received.load(Ordering::Relaxed),
            errors: self.base.errors.load(Ordering::Relaxed),
            frames_oversized: self.frames_oversized.load(Ordering::Relaxed),
            frames_invalid: self.frames_invalid.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            connections_timed_out: self.connections_timed_out.load(Ordering::Relaxed),
        }
    }
}

/// Extended metrics snapshot for Syslog TCP source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyslogTcpMetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
    pub errors: u64,
    pub frames_oversized: u64,
    pub frames_invalid: u64,
    pub connections_rejected: u64,
    pub connections_timed_out: u64,
}

/// Handle for accessing Syslog TCP source metrics
#[derive(Debug, Clone)]
pub struct SyslogTcpMetricsHandle {
    id: String,
    metrics: Arc<SyslogTcpSourceMetrics>,
}

impl SyslogTcpMetricsHandle {
    /// Get an extended snapshot including syslog-specific metrics
    pub fn extended_snapshot(&self) -> SyslogTcpMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl SourceMetricsProvider for SyslogTcpMetricsHandle {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn source_type(&self) -> &str {
        "syslog_tcp"
    }

    fn snapshot(&self) -> SourceMetricsSnapshot {
        self.metrics.base.snapshot()
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Syslog TCP source errors
#[derive(Debug, thiserror::Error)]
pub enum SyslogTcpSourceError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing violation; the connection is closed
    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    /// No data within the idle timeout
    #[error("connection idle for {0:?}")]
    IdleTimeout(Duration),
}

// =============================================================================
// Source Implementation
// =============================================================================

/// Syslog TCP source
///
/// Accepts TCP connections, splits each stream into frames and ingests every
/// frame as one syslog message.
pub struct SyslogTcpSource {
    /// Configuration
    config: SyslogTcpSourceConfig,

    /// Shared ingest path
    ingestor: Arc<Ingestor>,

    /// Metrics
    metrics: Arc<SyslogTcpSourceMetrics>,

    /// Running flag
    running: Arc<AtomicBool>,
}

impl SyslogTcpSource {
    /// Create a new Syslog TCP source
    pub fn new(config: SyslogTcpSourceConfig, ingestor: Arc<Ingestor>) -> Self {
        Self {
            config,
            ingestor,
            metrics: Arc::new(SyslogTcpSourceMetrics::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &SyslogTcpSourceConfig {
        &self.config
    }

    /// Get metrics reference
    pub fn metrics(&self) -> &Arc<SyslogTcpSourceMetrics> {
        &self.metrics
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> SyslogTcpMetricsHandle {
        SyslogTcpMetricsHandle {
            id: self.config.id.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Check if source is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the source
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Bind the listening socket
    pub async fn bind(&self) -> Result<TcpListener, SyslogTcpSourceError> {
        let bind_addr = self.config.bind_address();
        TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| SyslogTcpSourceError::Bind {
                address: bind_addr,
                source: e,
            })
    }

    /// Run the source (bind, then serve until cancelled)
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SyslogTcpSourceError> {
        let listener = self.bind().await?;
        self.serve(listener, cancel).await;
        Ok(())
    }

    /// Accept connections on an already bound listener until cancelled
    ///
    /// Open connections are cancelled along with the accept loop.
    pub async fn serve(&self, listener: TcpListener, cancel: CancellationToken) {
        self.running.store(true, Ordering::Relaxed);

        let local_addr = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| self.config.bind_address());
        tracing::info!(
            source_id = %self.config.id,
            address = %local_addr,
            framing = %self.config.framing,
            max_frame_size = self.config.max_frame_size,
            max_connections = self.config.max_connections,
            "syslog TCP source listening"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                accept_result = listener.accept() => {
                    if !self.running.load(Ordering::Relaxed) {
                        break;
                    }
                    match accept_result {
                        Ok((stream, peer_addr)) => self.accept(stream, peer_addr, &cancel),
                        Err(e) => {
                            tracing::warn!(
                                source_id = %self.config.id,
                                error = %e,
                                "syslog TCP accept error"
                            );
                            self.metrics.base.error();
                        }
                    }
                }
            }
        }

        self.running.store(false, Ordering::Relaxed);
        tracing::info!(
            source_id = %self.config.id,
            "syslog TCP source stopped"
        );
    }

    /// Admit or refuse a new connection
    fn accept(&self, stream: TcpStream, peer_addr: SocketAddr, cancel: &CancellationToken) {
        if self.metrics.base.active() >= self.config.max_connections as u64 {
            self.metrics.connection_rejected();
            tracing::warn!(
                source_id = %self.config.id,
                peer = %peer_addr,
                max_connections = self.config.max_connections,
                "syslog TCP connection limit reached, refusing"
            );
            return;
        }

        self.metrics.base.connection_opened();
        self.configure_socket(&stream);

        let handler = ConnectionHandler {
            decoder: FrameDecoder::new(self.config.framing, self.config.max_frame_size),
            buffer_size: self.config.buffer_size,
            idle_timeout: (!self.config.idle_timeout.is_zero()).then_some(self.config.idle_timeout),
            ingestor: Arc::clone(&self.ingestor),
            metrics: Arc::clone(&self.metrics),
            peer_addr,
            cancel: cancel.child_token(),
        };

        tokio::spawn(async move {
            let metrics = Arc::clone(&handler.metrics);
            if let Err(e) = handler.handle(stream).await {
                record_connection_error(&metrics, &e, peer_addr);
            }
            metrics.base.connection_closed();
        });
    }

    /// Apply socket options through socket2
    fn configure_socket(&self, stream: &TcpStream) {
        if self.config.nodelay
            && let Err(e) = stream.set_nodelay(true)
        {
            tracing::warn!(error = %e, "failed to set TCP_NODELAY");
        }

        let socket = SockRef::from(stream);
        let keepalive = TcpKeepalive::new().with_time(DEFAULT_KEEPALIVE_INTERVAL);
        if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
            tracing::warn!(error = %e, "failed to set TCP keepalive");
        }
    }
}

/// Count and log why a connection ended early
fn record_connection_error(
    metrics: &SyslogTcpSourceMetrics,
    error: &SyslogTcpSourceError,
    peer: SocketAddr,
) {
    match error {
        SyslogTcpSourceError::Frame(FrameError::TooLarge { .. }) => metrics.frame_oversized(),
        SyslogTcpSourceError::Frame(_) => metrics.frame_invalid(),
        SyslogTcpSourceError::IdleTimeout(_) => metrics.connection_timed_out(),
        SyslogTcpSourceError::Io(e) if is_connection_reset(e) => return,
        _ => metrics.base.error(),
    }
    tracing::debug!(peer = %peer, error = %error, "syslog TCP connection closed");
}

// =============================================================================
// Connection Handler
// =============================================================================

/// Handles a single TCP connection
struct ConnectionHandler {
    decoder: FrameDecoder,
    buffer_size: usize,
    idle_timeout: Option<Duration>,
    ingestor: Arc<Ingestor>,
    metrics: Arc<SyslogTcpSourceMetrics>,
    peer_addr: SocketAddr,
    cancel: CancellationToken,
}

impl ConnectionHandler {
    /// Read, frame and ingest until EOF, error or cancellation
    async fn handle(mut self, mut stream: TcpStream) -> Result<(), SyslogTcpSourceError> {
        let mut buf = BytesMut::with_capacity(self.buffer_size);

        loop {
            while let Some(frame) = self.decoder.decode(&mut buf)? {
                self.ingest(frame);
            }

            let read = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return Ok(()),

                read = read_with_timeout(&mut stream, &mut buf, self.idle_timeout) => read?,
            };

            if read == 0 {
                while let Some(frame) = self.decoder.decode_eof(&mut buf)? {
                    self.ingest(frame);
                }
                return Ok(());
            }
            self.metrics.base.bytes_read(read as u64);
        }
    }

    fn ingest(&self, frame: Bytes) {
        self.metrics.base.message_received();
        self.ingestor.ingest(frame, self.peer_addr, Utc::now());
    }
}

/// Read into `buf`, failing with `IdleTimeout` if nothing arrives in time
async fn read_with_timeout(
    stream: &mut TcpStream,
    buf: &mut BytesMut,
    timeout: Option<Duration>,
) -> Result<usize, SyslogTcpSourceError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, stream.read_buf(buf))
            .await
            .map_err(|_| SyslogTcpSourceError::IdleTimeout(limit))?
            .map_err(SyslogTcpSourceError::from),
        None => Ok(stream.read_buf(buf).await?),
    }
}

/// Check if error is a connection reset (expected during shutdown)
pub(crate) fn is_connection_reset(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
