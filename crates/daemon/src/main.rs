// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Herald Daemon (heraldd)
//!
//! Background process that owns the messaging session, serves the HTTP API
//! and posts the weekly announcement.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use herald_daemon::lifecycle::{self, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "heraldd",
    version,
    about = "Herald - weekly group announcement relay"
)]
struct Args {
    /// Settings file (default: <state-dir>/herald.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the lock, log and stored credentials
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Validate the settings file and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config = Config::new(args.state_dir, args.config)?;

    if args.check {
        return Ok(check(&config));
    }

    // Write startup marker to log (before tracing setup, so tooling can find it)
    write_startup_marker(&config)?;

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!("Starting heraldd in {}", config.state_dir.display());

    // Start daemon
    let daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("Daemon ready, listening on {}", daemon.local_addr);

    // Signal ready for parent process (e.g., systemd, scripts waiting for startup)
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }
    daemon.shutdown().await?;

    info!("Daemon stopped");
    Ok(ExitCode::SUCCESS)
}

/// Validate settings without starting anything
fn check(config: &Config) -> ExitCode {
    match config.settings() {
        Ok(settings) => {
            println!("{}: OK", config.config_path.display());
            println!("  bridge: {}", settings.session.bridge_url);
            println!("  http: {}", settings.http.bind);
            println!("  schedule: {}", settings.announcement.schedule);
            match settings.announcement.target_group() {
                Some(group) => println!("  target group: {}", group),
                None => println!("  target group: (none, scheduled fires are skipped)"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", config.config_path.display(), e);
            ExitCode::FAILURE
        }
    }
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- heraldd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- heraldd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    // Create log directory if needed
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Append marker to log file with PID
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Create log directory if needed
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Set up file appender
    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
