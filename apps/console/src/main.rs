//! Backdrop Console - headless driver for a Backdrop playback session.
//!
//! Runs the full session (persistence, readiness detection, reconciliation,
//! observers) against a simulated embed player and takes commands on stdin.

mod commands;
mod config;
mod reflector;
mod simulated;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use backdrop_core::{bootstrap_session, FileStore, KeyValueStore, MemoryStore};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use crate::commands::{execute, Command, Flow};
use crate::config::ConsoleConfig;
use crate::reflector::ConsoleReflector;
use crate::simulated::SimulatedBackend;

/// Backdrop Console - persistent background music session on the terminal.
#[derive(Parser, Debug)]
#[command(name = "backdrop-console")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "BACKDROP_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Data directory for the persisted session.
    #[arg(short = 'd', long, env = "BACKDROP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Default volume (overrides config file).
    #[arg(short = 'v', long)]
    volume: Option<u8>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Backdrop Console v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ConsoleConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }
    if let Some(volume) = args.volume {
        config.default_volume = volume.min(100);
    }

    let store: Arc<dyn KeyValueStore> = match &config.data_dir {
        Some(dir) => {
            log::info!("Using data directory: {}", dir.display());
            Arc::new(FileStore::new(dir).context("Failed to open data directory")?)
        }
        None => {
            log::info!("No data directory configured - session will not persist");
            MemoryStore::arc()
        }
    };

    let backend = SimulatedBackend::new(
        Duration::from_millis(config.api_load_delay_ms),
        Duration::from_millis(config.player_ready_delay_ms),
    );

    let session = bootstrap_session(
        &config.to_core_config(),
        config.catalog(),
        Arc::new(backend),
        store,
    )
    .context("Failed to bootstrap session")?;

    session
        .manager
        .register_observer(Arc::new(ConsoleReflector::new()));
    session.manager.resume().await;

    println!("Type `help` for commands.");

    tokio::select! {
        _ = command_loop(&session.manager) => {
            log::info!("Input closed, cleaning up...");
        }
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, cleaning up...");
        }
    }

    session.shutdown().await;
    Ok(())
}

/// Reads commands from stdin until `quit` or end of input.
async fn command_loop(manager: &Arc<backdrop_core::SessionManager>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("Failed to read stdin: {}", e);
                break;
            }
        };
        match Command::parse(&line) {
            Ok(Some(command)) => {
                if execute(manager, command).await == Flow::Quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => println!("! {message}"),
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
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
