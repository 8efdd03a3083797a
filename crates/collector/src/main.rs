//! Syslens - syslog collector with retention and live fan-out
//!
//! # Usage
//!
//! ```bash
//! # Run the collector (default)
//! syslens
//! syslens --config configs/syslens.toml
//!
//! # Validate a config file and print the effective settings
//! syslens check --config configs/syslens.toml
//! ```

mod cmd;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use syslens_config::{LogConfig, LogFormat, LogLevel, LogOutput};
use syslens_collector::load_config;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Syslens - syslog collector with retention and live fan-out
#[derive(Parser, Debug)]
#[command(name = "syslens")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the collector
    Serve,

    /// Validate configuration and print the effective settings
    Check(cmd::check::CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, loaded_from) = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Check(args)) => {
            // Check only prints to stdout
            cmd::check::run(args, &config, loaded_from.as_deref())
        }
        Some(Command::Serve) | None => {
            init_logging(&config.log, cli.log_level)?;
            cmd::serve::run(config, loaded_from).await
        }
    }
}

/// Initialize the tracing subscriber for logging
///
/// `RUST_LOG` directives, when set, take precedence over the configured level.
fn init_logging(config: &LogConfig, level_override: Option<LogLevel>) -> Result<()> {
    let level = level_override.unwrap_or(config.level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let (writer, ansi) = match &config.output {
        LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
        LogOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file '{path}'"))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_writer(writer))
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
