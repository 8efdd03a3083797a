//! Serve command - run the collector until interrupted

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use syslens_collector::Collector;
use syslens_config::Config;

/// How long each task gets to stop after the shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the serve command
pub async fn run(config: Config, loaded_from: Option<PathBuf>) -> Result<()> {
    let config_path = loaded_from
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %config_path,
        "syslens starting"
    );

    if let Err(e) = run_server(config).await {
        error!(error = %format!("{e:#}"), "server error");
        return Err(e);
    }

    info!("syslens shutdown complete");
    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    let max_records = config.retention.record_limit();
    let max_age = config.retention.age_limit();
    let queue_capacity = config.tap.queue_capacity;
    let overflow_policy = config.tap.overflow_policy;

    // Bind failures end startup here
    let collector = Collector::bind(config).await?;

    let cancel = CancellationToken::new();
    let running = collector.start(cancel);

    info!(
        source_count = running.source_count(),
        udp = ?running.udp_addr(),
        tcp = ?running.tcp_addr(),
        max_records = ?max_records,
        max_age = ?max_age,
        queue_capacity,
        overflow_policy = ?overflow_policy,
        "syslens running"
    );

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping collector...");

    running.shutdown(SHUTDOWN_TIMEOUT).await;
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
