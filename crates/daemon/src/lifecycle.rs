// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use herald_adapters::{
    BridgeSessionClient, FileCredentialStore, SessionError, TracedSessionClient,
};
use herald_core::{ConfigError, HeraldConfig, SystemClock};
use herald_engine::{ContextConfig, ContextDeps, SessionContext};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::server::{self, AppState};

/// Session client with concrete adapter types (wrapped with tracing)
pub type DaemonClient = TracedSessionClient<BridgeSessionClient>;

/// Session context as run by the daemon
pub type DaemonContext = SessionContext<DaemonClient, SystemClock>;

/// Daemon paths
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the lock, log and credentials
    pub state_dir: PathBuf,
    /// TOML settings file
    pub config_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Stored session credentials
    pub credentials_path: PathBuf,
}

impl Config {
    /// Resolve paths. Without an explicit state dir the platform state
    /// directory is used; the settings file defaults to `herald.toml` inside it.
    pub fn new(state_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self, LifecycleError> {
        let state_dir = match state_dir {
            Some(dir) => dir,
            None => default_state_dir()?,
        };
        Ok(Self::in_dir(&state_dir, config_path))
    }

    fn in_dir(state_dir: &Path, config_path: Option<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
            config_path: config_path.unwrap_or_else(|| state_dir.join("herald.toml")),
            lock_path: state_dir.join("heraldd.pid"),
            log_path: state_dir.join("heraldd.log"),
            credentials_path: state_dir.join("credentials.json"),
        }
    }

    /// Load and validate the settings file
    pub fn settings(&self) -> Result<HeraldConfig, ConfigError> {
        HeraldConfig::load(&self.config_path)
    }
}

/// Daemon state during operation
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Address the HTTP server listens on
    pub local_addr: SocketAddr,
    context: DaemonContext,
    server: JoinHandle<()>,
    connector: Option<JoinHandle<()>>,
}

impl DaemonState {
    pub fn context(&self) -> &DaemonContext {
        &self.context
    }

    /// Shutdown the daemon gracefully
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Stop accepting HTTP requests
        self.server.abort();
        if let Some(connector) = self.connector {
            connector.abort();
        }

        // 2. End the session and stop the runtime
        if let Err(e) = self.context.handle().disconnect().await {
            warn!("Failed to disconnect session: {}", e);
        }
        self.context.stop().await;

        // 3. Remove PID file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 4. Lock file is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind HTTP server at {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Session client error: {0}")]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        // Another daemon owns the lock file; leave it alone
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directory (needed for lock, log, credentials)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    // Opened without truncation so a running daemon's PID survives a failed attempt
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Load settings BEFORE binding (fail fast, don't accept requests if invalid)
    let settings = config.settings()?;

    // 4. Set up adapters (wrapped with tracing for observability)
    let bridge = BridgeSessionClient::new(
        &settings.session.bridge_url,
        settings.session.request_timeout,
    )?;
    let client = TracedSessionClient::new(bridge);
    let credentials = FileCredentialStore::new(config.credentials_path.clone());

    // 5. Bind the HTTP listener (LAST - only after all validation passes)
    let listener = TcpListener::bind(settings.http.bind)
        .await
        .map_err(|e| LifecycleError::BindFailed(settings.http.bind, e))?;
    let local_addr = listener.local_addr()?;

    // 6. Start the session context and the weekly trigger
    let context = SessionContext::start(
        ContextDeps {
            client,
            credentials,
            clock: SystemClock,
        },
        ContextConfig {
            reconnect: settings.reconnect.clone(),
            announcement: settings.announcement.clone(),
        },
    );
    context.start_announcer();

    // 7. Serve
    let app = server::router(AppState {
        session: context.handle(),
        gateway: context.gateway(),
    });
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server failed: {}", e);
        }
    });

    // 8. Connect at launch if configured
    let connector = settings.session.auto_connect.then(|| {
        let handle = context.handle();
        tokio::spawn(async move {
            if let Err(e) = handle.connect().await {
                warn!("Auto-connect failed: {}", e);
            }
        })
    });

    info!(
        bridge = %settings.session.bridge_url,
        schedule = %settings.announcement.schedule,
        "Daemon started, listening on {}",
        local_addr
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        local_addr,
        context,
        server,
        connector,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    // Remove PID/lock file
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Get the state directory for herald
fn default_state_dir() -> Result<PathBuf, LifecycleError> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("herald"))
        .ok_or(LifecycleError::NoStateDir)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
