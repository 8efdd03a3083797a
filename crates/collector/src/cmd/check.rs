//! Check command - validate configuration without binding anything

use std::path::Path;

use anyhow::Result;
use clap::Args;

use syslens_collector::{retention_policy, tap_config, tcp_source_config, udp_source_config};
use syslens_config::Config;

/// Check command arguments
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Only report success or failure
    #[arg(short, long)]
    pub quiet: bool,
}

/// Run the check command
///
/// Loading already validated the config; this reports what it resolved to.
pub fn run(args: CheckArgs, config: &Config, loaded_from: Option<&Path>) -> Result<()> {
    let source = loaded_from
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());

    println!("config ok: {source}");
    if args.quiet {
        return Ok(());
    }

    if config.sources.syslog_udp.enabled {
        let udp = udp_source_config(&config.sources.syslog_udp);
        println!(
            "  syslog_udp  {}  workers={} max_message_size={}",
            udp.bind_address(),
            udp.num_workers,
            udp.max_message_size
        );
    }
    if config.sources.syslog_tcp.enabled {
        let tcp = tcp_source_config(&config.sources.syslog_tcp);
        println!(
            "  syslog_tcp  {}  framing={} max_frame_size={} max_connections={}",
            tcp.bind_address(),
            tcp.framing,
            tcp.max_frame_size,
            tcp.max_connections
        );
    }

    let retention = retention_policy(config);
    println!(
        "  retention   max_records={} max_age={}",
        retention
            .max_records
            .map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
        retention
            .max_age
            .map_or_else(|| "unbounded".to_string(), |d| format!("{d:?}")),
    );

    let tap = tap_config(config);
    println!(
        "  tap         queue_capacity={} overflow_policy={:?} max_subscribers={}",
        tap.queue_capacity, tap.overflow_policy, tap.max_subscribers
    );

    Ok(())
}
