//! Collector runtime
//!
//! Turns a validated [`Config`] into a running collector in two steps:
//! [`Collector::bind`] builds the ingest path and binds every enabled
//! listener (any failure here is fatal), then [`Collector::start`] spawns the
//! listener, maintenance and reporting tasks.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use syslens_config::{Config, OverflowPolicyConfig, StreamFraming};
use syslens_pipeline::Ingestor;
use syslens_sources::{
    Framing, SourceMetricsProvider, SyslogTcpSource, SyslogTcpSourceConfig, SyslogUdpSource,
    SyslogUdpSourceConfig,
};
use syslens_store::RetentionPolicy;
use syslens_tap::{OverflowPolicy, TapConfig};

use crate::reporter::MetricsReporter;

/// Config files tried, in order, when no path is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["configs/syslens.toml", "syslens.toml"];

/// Load configuration
///
/// An explicit `path` must exist. Without one, the first of
/// [`DEFAULT_CONFIG_PATHS`] that exists is used, falling back to the
/// built-in defaults. Returns the file actually loaded, if any.
pub fn load_config(path: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        let config = Config::from_file(path).context("failed to load configuration")?;
        return Ok((config, Some(path.to_path_buf())));
    }

    for candidate in DEFAULT_CONFIG_PATHS {
        let candidate = Path::new(candidate);
        if candidate.exists() {
            let config = Config::from_file(candidate).context("failed to load configuration")?;
            return Ok((config, Some(candidate.to_path_buf())));
        }
    }

    Ok((Config::default(), None))
}

/// Build the retention policy from the `[retention]` section
pub fn retention_policy(config: &Config) -> RetentionPolicy {
    RetentionPolicy::new(
        config.retention.record_limit(),
        config.retention.age_limit(),
    )
}

/// Build broadcaster settings from the `[tap]` section
pub fn tap_config(config: &Config) -> TapConfig {
    TapConfig {
        queue_capacity: config.tap.queue_capacity,
        overflow_policy: match config.tap.overflow_policy {
            OverflowPolicyConfig::DropOldest => OverflowPolicy::DropOldest,
            OverflowPolicyConfig::DisconnectOnFull => OverflowPolicy::DisconnectOnFull,
        },
        max_subscribers: config.tap.max_subscribers,
    }
}

/// Build the UDP listener settings from `[sources.syslog_udp]`
pub fn udp_source_config(config: &syslens_config::SyslogUdpSourceConfig) -> SyslogUdpSourceConfig {
    let defaults = SyslogUdpSourceConfig::default();
    SyslogUdpSourceConfig {
        id: "syslog_udp".into(),
        address: config.address.clone(),
        port: config.port,
        buffer_size: config.buffer_size.unwrap_or(defaults.buffer_size),
        num_workers: config.num_workers,
        max_message_size: config.max_message_size,
    }
}

/// Build the TCP listener settings from `[sources.syslog_tcp]`
pub fn tcp_source_config(config: &syslens_config::SyslogTcpSourceConfig) -> SyslogTcpSourceConfig {
    let defaults = SyslogTcpSourceConfig::default();
    SyslogTcpSourceConfig {
        id: "syslog_tcp".into(),
        address: config.address.clone(),
        port: config.port,
        framing: match config.framing {
            StreamFraming::Auto => Framing::Auto,
            StreamFraming::Newline => Framing::NewlineDelimited,
            StreamFraming::OctetCounting => Framing::OctetCounting,
        },
        max_frame_size: config.max_frame_size,
        buffer_size: config.buffer_size.unwrap_or(defaults.buffer_size),
        max_connections: config.max_connections,
        idle_timeout: config.idle_timeout,
        nodelay: config.no_delay,
    }
}

struct BoundUdp {
    source: Arc<SyslogUdpSource>,
    sockets: Vec<UdpSocket>,
    local_addr: SocketAddr,
}

struct BoundTcp {
    source: Arc<SyslogTcpSource>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

/// Ingest path with its listeners bound but not yet serving
pub struct Collector {
    config: Config,
    ingestor: Arc<Ingestor>,
    udp: Option<BoundUdp>,
    tcp: Option<BoundTcp>,
}

impl Collector {
    /// Build the ingest path and bind every enabled listener
    ///
    /// # Errors
    ///
    /// Fails if the retention or tap settings are rejected, or if any
    /// enabled listener cannot bind its address.
    pub async fn bind(config: Config) -> Result<Self> {
        let ingestor = Arc::new(
            Ingestor::new(retention_policy(&config), tap_config(&config))
                .context("invalid ingest settings")?,
        );

        let udp = if config.sources.syslog_udp.enabled {
            let source = Arc::new(SyslogUdpSource::new(
                udp_source_config(&config.sources.syslog_udp),
                Arc::clone(&ingestor),
            ));
            let sockets = source.bind().context("failed to start syslog UDP source")?;
            let local_addr = match sockets.first() {
                Some(socket) => socket.local_addr()?,
                None => anyhow::bail!("syslog UDP source bound no sockets"),
            };
            Some(BoundUdp {
                source,
                sockets,
                local_addr,
            })
        } else {
            None
        };

        let tcp = if config.sources.syslog_tcp.enabled {
            let source = Arc::new(SyslogTcpSource::new(
                tcp_source_config(&config.sources.syslog_tcp),
                Arc::clone(&ingestor),
            ));
            let listener = source
                .bind()
                .await
                .context("failed to start syslog TCP source")?;
            let local_addr = listener.local_addr()?;
            Some(BoundTcp {
                source,
                listener,
                local_addr,
            })
        } else {
            None
        };

        Ok(Self {
            config,
            ingestor,
            udp,
            tcp,
        })
    }

    pub fn ingestor(&self) -> &Arc<Ingestor> {
        &self.ingestor
    }

    /// Address the UDP listener is bound to, if enabled
    pub fn udp_addr(&self) -> Option<SocketAddr> {
        self.udp.as_ref().map(|udp| udp.local_addr)
    }

    /// Address the TCP listener is bound to, if enabled
    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        self.tcp.as_ref().map(|tcp| tcp.local_addr)
    }

    /// Spawn listeners, maintenance and metrics reporting
    ///
    /// Everything stops when `cancel` fires; see [`RunningCollector::shutdown`].
    pub fn start(self, cancel: CancellationToken) -> RunningCollector {
        let mut source_tasks = Vec::new();
        let mut providers: Vec<Arc<dyn SourceMetricsProvider>> = Vec::new();
        let udp_addr = self.udp_addr();
        let tcp_addr = self.tcp_addr();

        if let Some(BoundUdp {
            source,
            sockets,
            local_addr,
        }) = self.udp
        {
            info!(
                source_id = %source.config().id,
                address = %local_addr,
                workers = sockets.len(),
                max_message_size = source.config().max_message_size,
                "starting syslog UDP source"
            );
            providers.push(Arc::new(source.metrics_handle()));
            let cancel = cancel.clone();
            source_tasks.push(tokio::spawn(async move {
                source.serve(sockets, cancel).await;
            }));
        }

        if let Some(BoundTcp {
            source,
            listener,
            local_addr,
        }) = self.tcp
        {
            info!(
                source_id = %source.config().id,
                address = %local_addr,
                framing = %source.config().framing,
                max_frame_size = source.config().max_frame_size,
                "starting syslog TCP source"
            );
            providers.push(Arc::new(source.metrics_handle()));
            let cancel = cancel.clone();
            source_tasks.push(tokio::spawn(async move {
                source.serve(listener, cancel).await;
            }));
        }

        let maintenance = self
            .ingestor
            .spawn_maintenance(self.config.retention.eviction_interval, cancel.clone());

        let reporter = if self.config.metrics.enabled {
            let reporter = MetricsReporter::new(
                self.config.metrics.clone(),
                Arc::clone(&self.ingestor),
                providers,
            );
            Some(tokio::spawn(reporter.run(cancel.clone())))
        } else {
            info!("metrics reporting disabled");
            None
        };

        RunningCollector {
            ingestor: self.ingestor,
            source_tasks,
            maintenance,
            reporter,
            cancel,
            udp_addr,
            tcp_addr,
        }
    }
}

/// A started collector
pub struct RunningCollector {
    ingestor: Arc<Ingestor>,
    source_tasks: Vec<JoinHandle<()>>,
    maintenance: JoinHandle<()>,
    reporter: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    udp_addr: Option<SocketAddr>,
    tcp_addr: Option<SocketAddr>,
}

impl RunningCollector {
    pub fn ingestor(&self) -> &Arc<Ingestor> {
        &self.ingestor
    }

    pub fn udp_addr(&self) -> Option<SocketAddr> {
        self.udp_addr
    }

    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        self.tcp_addr
    }

    pub fn source_count(&self) -> usize {
        self.source_tasks.len()
    }

    /// Stop listeners, wait up to `timeout` for each, then close all subscriptions
    pub async fn shutdown(self, timeout: Duration) {
        self.cancel.cancel();

        for task in self.source_tasks {
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "source task panicked during shutdown"),
                Err(_) => warn!("source task did not finish within timeout, continuing shutdown"),
            }
        }

        if tokio::time::timeout(timeout, self.maintenance).await.is_err() {
            warn!("maintenance task did not finish within timeout");
        }
        if let Some(reporter) = self.reporter {
            reporter.abort();
        }

        self.ingestor.shutdown();
    }
}

#[cfg(test)]
#[path = "runtime_test.rs"]
mod tests;
