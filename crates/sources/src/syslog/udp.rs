//! Syslog UDP Source
//!
//! Syslog receiver over UDP with multi-worker support.
//!
//! # Protocol Support
//!
//! - **RFC 3164** (BSD syslog) - Legacy format, still widely used
//! - **RFC 5424** (IETF syslog) - Structured data support
//!
//! Each datagram is one message, including empty ones. It is stamped on
//! arrival and handed to the [`Ingestor`] as received, which parses,
//! retains and publishes it.
//!
//! # Design
//!
//! Unlike TCP, UDP is connectionless so we use a different strategy:
//! - Multiple workers, each with its own socket on the same port (SO_REUSEPORT)
//! - The kernel load-balances datagrams across workers
//! - Datagrams larger than `max_message_size` are truncated, not dropped;
//!   the record's `raw` then holds only the first `max_message_size` bytes
//!
//! # Example
//!
//! ```ignore
//! let config = SyslogUdpSourceConfig {
//!     address: "0.0.0.0".into(),
//!     port: 514,
//!     num_workers: 4,
//!     ..Default::default()
//! };
//!
//! let source = SyslogUdpSource::new(config, Arc::clone(&ingestor));
//! let sockets = source.bind()?;          // bind failures are fatal
//! source.serve(sockets, cancel).await;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use chrono::Utc;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use syslens_pipeline::Ingestor;

use crate::common::{
    SourceMetrics, SourceMetricsProvider, SourceMetricsSnapshot, trim_trailing_newline,
};

// =============================================================================
// Constants
// =============================================================================

/// Default syslog port (privileged - may need root)
const DEFAULT_PORT: u16 = 514;

/// Default maximum syslog message size (8KB)
const DEFAULT_MAX_MESSAGE_SIZE: usize = 8192;

/// Default socket buffer size (64KB for UDP)
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Default number of workers
const DEFAULT_NUM_WORKERS: usize = 4;

/// Socket buffer multiplier for UDP bursts
const UDP_BUFFER_MULTIPLIER: usize = 4;

/// Largest payload a UDP datagram can carry
const MAX_DATAGRAM_SIZE: usize = 65_507;

// =============================================================================
// Configuration
// =============================================================================

/// Syslog UDP source configuration
#[derive(Debug, Clone)]
pub struct SyslogUdpSourceConfig {
    /// Source identifier used in logs and metrics
    pub id: String,

    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Socket receive buffer size (SO_RCVBUF is set to 4x this)
    pub buffer_size: usize,

    /// Number of worker tasks
    pub num_workers: usize,

    /// Maximum syslog message size; longer datagrams are truncated
    pub max_message_size: usize,
}

impl Default for SyslogUdpSourceConfig {
    fn default() -> Self {
        Self {
            id: "syslog_udp".into(),
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            num_workers: DEFAULT_NUM_WORKERS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl SyslogUdpSourceConfig {
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

/// Syslog UDP source metrics
#[derive(Debug, Default)]
pub struct SyslogUdpSourceMetrics {
    /// Base source metrics (repurposed: connections_active = workers_active)
    pub base: SourceMetrics,

    /// Datagrams received, including empty ones
    pub packets_received: AtomicU64,

    /// Zero-length (or newline-only) datagrams, still ingested
    pub packets_empty: AtomicU64,

    /// Datagrams cut to `max_message_size`
    pub messages_truncated: AtomicU64,

    /// Worker errors
    pub worker_errors: AtomicU64,
}

impl SyslogUdpSourceMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            base: SourceMetrics::new(),
            packets_received: AtomicU64::new(0),
            packets_empty: AtomicU64::new(0),
            messages_truncated: AtomicU64::new(0),
            worker_errors: AtomicU64::new(0),
        }
    }

    /// Record a packet received
    #[inline]
    pub fn packet_received(&self, bytes: u64) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.base.bytes_read(bytes);
    }

    /// Record an empty packet
    #[inline]
    pub fn packet_empty(&self) {
        self.packets_empty.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a truncated message
    #[inline]
    pub fn message_truncated(&self) {
        self.messages_truncated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a worker error
    #[inline]
    pub fn worker_error(&self) {
        self.worker_errors.fetch_add(1, Ordering::Relaxed);
        self.base.error();
    }

    /// Record worker started
    #[inline]
    pub fn worker_started(&self) {
        self.base.connection_opened();
    }

    /// Record worker stopped
    #[inline]
    pub fn worker_stopped(&self) {
        self.base.connection_closed();
    }

    /// Get extended metrics snapshot
    pub fn snapshot(&self) -> SyslogUdpMetricsSnapshot {
        SyslogUdpMetricsSnapshot {
            workers_active: self.base.connections_active.load(Ordering::Relaxed),
            workers_total: self.base.connections_total.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            messages_received: self.base.messages_received.load(Ordering::Relaxed),
            bytes_received: self.base.bytes_received.load(Ordering::Relaxed),
            errors: self.base.errors.load(Ordering::Relaxed),
            packets_empty: self.packets_empty.load(Ordering::Relaxed),
            messages_truncated: self.messages_truncated.load(Ordering::Relaxed),
            worker_errors: self.worker_errors.load(Ordering::Relaxed),
        }
    }
}

/// Extended metrics snapshot for Syslog UDP source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyslogUdpMetricsSnapshot {
    pub workers_active: u64,
    pub workers_total: u64,
    pub packets_received: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
    pub errors: u64,
    pub packets_empty: u64,
    pub messages_truncated: u64,
    pub worker_errors: u64,
}

/// Handle for accessing Syslog UDP source metrics
///
/// Remains valid while the source runs and after it stops.
///
/// Note: For UDP sources, `connections_active` represents active workers,
/// and `connections_total` represents total workers started.
#[derive(Debug, Clone)]
pub struct SyslogUdpMetricsHandle {
    id: String,
    metrics: Arc<SyslogUdpSourceMetrics>,
}

impl SyslogUdpMetricsHandle {
    /// Get an extended snapshot including syslog UDP-specific metrics
    pub fn extended_snapshot(&self) -> SyslogUdpMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl SourceMetricsProvider for SyslogUdpMetricsHandle {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn source_type(&self) -> &str {
        "syslog_udp"
    }

    fn snapshot(&self) -> SourceMetricsSnapshot {
        self.metrics.base.snapshot()
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Syslog UDP source errors
#[derive(Debug, thiserror::Error)]
pub enum SyslogUdpSourceError {
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

    /// Failed to create worker
    #[error("failed to create worker {worker_id}: {source}")]
    WorkerCreation {
        worker_id: usize,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Source Implementation
// =============================================================================

/// Syslog UDP source
///
/// Receives UDP datagrams and ingests each as one syslog message. Uses
/// multiple workers for parallel processing.
pub struct SyslogUdpSource {
    /// Configuration
    config: SyslogUdpSourceConfig,

    /// Shared ingest path
    ingestor: Arc<Ingestor>,

    /// Metrics
    metrics: Arc<SyslogUdpSourceMetrics>,

    /// Running flag
    running: Arc<AtomicBool>,
}

impl SyslogUdpSource {
    /// Create a new Syslog UDP source
    pub fn new(config: SyslogUdpSourceConfig, ingestor: Arc<Ingestor>) -> Self {
        Self {
            config,
            ingestor,
            metrics: Arc::new(SyslogUdpSourceMetrics::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &SyslogUdpSourceConfig {
        &self.config
    }

    /// Get metrics reference
    pub fn metrics(&self) -> &Arc<SyslogUdpSourceMetrics> {
        &self.metrics
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> SyslogUdpMetricsHandle {
        SyslogUdpMetricsHandle {
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

    /// Bind one socket per worker
    ///
    /// Must be called inside a tokio runtime.
    pub fn bind(&self) -> Result<Vec<UdpSocket>, SyslogUdpSourceError> {
        let bind_addr = self.config.bind_address();
        let socket_addr: SocketAddr =
            bind_addr
                .parse()
                .map_err(|_| SyslogUdpSourceError::Bind {
                    address: bind_addr.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "invalid socket address",
                    ),
                })?;

        let num_workers = self.config.num_workers.max(1);
        let mut sockets = Vec::with_capacity(num_workers);

        // The first bind resolves port 0; the rest join it.
        let first = self
            .create_reuseport_socket(socket_addr)
            .map_err(|e| SyslogUdpSourceError::Bind {
                address: bind_addr.clone(),
                source: e,
            })?;
        let bound_addr = first.local_addr()?;
        sockets.push(first);

        for worker_id in 1..num_workers {
            let socket = self
                .create_reuseport_socket(bound_addr)
                .map_err(|e| SyslogUdpSourceError::WorkerCreation {
                    worker_id,
                    source: e,
                })?;
            sockets.push(socket);
        }

        Ok(sockets)
    }

    /// Run the source (bind, then serve until cancelled)
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SyslogUdpSourceError> {
        let sockets = self.bind()?;
        self.serve(sockets, cancel).await;
        Ok(())
    }

    /// Serve on already bound sockets, one worker each
    pub async fn serve(&self, sockets: Vec<UdpSocket>, cancel: CancellationToken) {
        self.running.store(true, Ordering::Relaxed);

        let local_addr = sockets
            .first()
            .and_then(|s| s.local_addr().ok())
            .map(|a| a.to_string())
            .unwrap_or_else(|| self.config.bind_address());

        tracing::info!(
            source_id = %self.config.id,
            address = %local_addr,
            num_workers = sockets.len(),
            max_message_size = self.config.max_message_size,
            "syslog UDP source listening"
        );

        let mut worker_handles = Vec::with_capacity(sockets.len());
        for (worker_id, socket) in sockets.into_iter().enumerate() {
            let worker = UdpWorker {
                id: worker_id,
                socket,
                max_message_size: self.config.max_message_size.clamp(1, MAX_DATAGRAM_SIZE),
                ingestor: Arc::clone(&self.ingestor),
                metrics: Arc::clone(&self.metrics),
                running: Arc::clone(&self.running),
                cancel: cancel.clone(),
            };

            self.metrics.worker_started();
            worker_handles.push(tokio::spawn(worker.run()));
        }

        // Wait for all workers to complete
        for handle in worker_handles {
            if let Err(e) = handle.await {
                tracing::warn!(source_id = %self.config.id, error = %e, "syslog UDP worker panicked");
            }
        }

        self.running.store(false, Ordering::Relaxed);
        tracing::info!(
            source_id = %self.config.id,
            "syslog UDP source stopped"
        );
    }

    /// Create a UDP socket with SO_REUSEPORT and a large receive buffer
    fn create_reuseport_socket(&self, addr: SocketAddr) -> std::io::Result<UdpSocket> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;

        #[cfg(unix)]
        socket.set_reuse_port(true)?;

        let recv_buffer_size = self.config.buffer_size * UDP_BUFFER_MULTIPLIER;
        if let Err(e) = socket.set_recv_buffer_size(recv_buffer_size) {
            tracing::warn!(
                error = %e,
                requested_size = recv_buffer_size,
                "failed to set UDP SO_RCVBUF"
            );
        }

        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;

        let std_socket: std::net::UdpSocket = socket.into();
        UdpSocket::from_std(std_socket)
    }
}

// =============================================================================
// UDP Worker
// =============================================================================

/// Individual UDP worker that processes datagrams
struct UdpWorker {
    id: usize,
    /// Owned socket - each worker has its own with SO_REUSEPORT
    socket: UdpSocket,
    max_message_size: usize,
    ingestor: Arc<Ingestor>,
    metrics: Arc<SyslogUdpSourceMetrics>,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl UdpWorker {
    async fn run(self) {
        tracing::debug!(worker_id = self.id, "syslog UDP worker started");

        // One extra byte tells a truncated datagram from one that fit exactly.
        let mut recv_buf = vec![0u8; self.max_message_size + 1];

        loop {
            if !self.running.load(Ordering::Relaxed) {
                break;
            }

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                recv_result = self.socket.recv_from(&mut recv_buf) => {
                    match recv_result {
                        Ok((len, peer_addr)) => {
                            self.process_packet(&recv_buf[..len], peer_addr);
                        }
                        Err(e) => {
                            if self.running.load(Ordering::Relaxed) {
                                self.metrics.worker_error();
                                tracing::debug!(
                                    worker_id = self.id,
                                    error = %e,
                                    "syslog UDP recv error"
                                );
                            }
                        }
                    }
                }
            }
        }

        self.metrics.worker_stopped();
        tracing::debug!(worker_id = self.id, "syslog UDP worker stopped");
    }

    /// Ingest one received datagram
    fn process_packet(&self, data: &[u8], peer_addr: SocketAddr) {
        let received_at = Utc::now();
        self.metrics.packet_received(data.len() as u64);

        let data = if data.len() > self.max_message_size {
            self.metrics.message_truncated();
            tracing::debug!(
                worker_id = self.id,
                peer = %peer_addr,
                max = self.max_message_size,
                "syslog UDP datagram truncated"
            );
            &data[..self.max_message_size]
        } else {
            data
        };

        if trim_trailing_newline(data).is_empty() {
            self.metrics.packet_empty();
        }

        self.metrics.base.message_received();
        self.ingestor
            .ingest(Bytes::copy_from_slice(data), peer_addr, received_at);
    }
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
