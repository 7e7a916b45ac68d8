// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: configuration, startup, shutdown.

use crate::env;
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tether_cloud::{
    CloudConfig, HttpCloudClient, NetworkMonitor, NetworkMonitorConfig,
};
use tether_core::{SystemClock, SystemContext};
use tether_engine::{DesktopNotifyAdapter, EngineConfig, Manager};
use tether_store::StateStore;
use tether_tools::{ChannelUserInput, InputRequest, Sandbox};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::info;

/// Daemon runtime with concrete adapter types.
pub type DaemonManager = Manager<HttpCloudClient, SystemClock>;

/// Errors during startup/shutdown.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("another daemon already holds the lock")]
    LockFailed(std::io::Error),
    #[error("no state directory available")]
    NoStateDir,
    #[error("storage error: {0}")]
    Store(#[from] tether_store::StoreError),
    #[error("invalid config file {path}: {message}")]
    BadConfig { path: PathBuf, message: String },
    #[error("sandbox error: {0}")]
    Sandbox(String),
}

/// Cloud connection settings from `config.toml`, overridable via
/// `TETHER_CLOUD_URL` / `TETHER_CLOUD_TOKEN`.
#[derive(Debug, Clone, serde::Deserialize, Default)]
pub struct CloudSettings {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    cloud: CloudSettings,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/tether)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the optional config.toml
    pub config_path: PathBuf,
    /// Cloud connection settings
    pub cloud: CloudConfig,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses fixed paths under `$XDG_STATE_HOME/tether` (or
    /// `~/.local/state/tether`). One daemon serves the whole user.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        let config_path = state_dir.join("config.toml");
        let cloud = load_cloud_settings(&config_path)?;

        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            db_path: state_dir.join("state.db"),
            config_path,
            cloud,
            state_dir,
        })
    }
}

fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("TETHER_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
        .map(|base| base.join("tether"))
        .ok_or(LifecycleError::NoStateDir)
}

fn load_cloud_settings(config_path: &PathBuf) -> Result<CloudConfig, LifecycleError> {
    let file: ConfigFile = match std::fs::read_to_string(config_path) {
        Ok(text) => toml::from_str(&text).map_err(|e| LifecycleError::BadConfig {
            path: config_path.clone(),
            message: e.to_string(),
        })?,
        Err(_) => ConfigFile::default(),
    };

    let base_url = std::env::var("TETHER_CLOUD_URL")
        .ok()
        .or(file.cloud.base_url)
        .unwrap_or_else(|| "https://api.tether.dev".to_string());
    let token = std::env::var("TETHER_CLOUD_TOKEN")
        .ok()
        .or(file.cloud.token)
        .unwrap_or_default();

    Ok(CloudConfig { base_url, token })
}

/// Everything `main` needs after startup.
pub struct StartupResult {
    pub config: Config,
    pub manager: Arc<DaemonManager>,
    pub listener: UnixListener,
    pub input_requests: mpsc::Receiver<InputRequest>,
    pub user_input: ChannelUserInput,
    // NOTE(lifetime): held to maintain the exclusive file lock
    pub lock_file: File,
}

impl std::fmt::Debug for StartupResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupResult").finish_non_exhaustive()
    }
}

/// Acquire the lock, open the store, wire the engine, bind the socket.
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Single-instance lock with pid for diagnostics. Opened without
    // truncation so a losing contender does not wipe the winner's pid.
    let lock_file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    std::fs::write(&config.lock_path, format!("{}\n", std::process::id()))?;

    let store = Arc::new(StateStore::open(&config.db_path)?);
    let cloud = Arc::new(HttpCloudClient::new(config.cloud.clone()));

    let sandbox = Sandbox::new().map_err(|e| LifecycleError::Sandbox(e.to_string()))?;
    let (user_input, input_requests) = ChannelUserInput::new();
    let dispatcher = Arc::new(tether_tools::Dispatcher::new(
        sandbox,
        Arc::new(user_input.clone()),
    ));

    let mut engine_config = EngineConfig::default();
    if let Some(v) = env::poll_interval() {
        engine_config.poll_interval = v;
    }
    if let Some(v) = env::sync_interval() {
        engine_config.sync_interval = v;
    }
    if let Some(v) = env::attempt_timeout() {
        engine_config.attempt_timeout = v;
    }
    if let Some(v) = env::max_retries() {
        engine_config.max_retries = v;
    }

    let manager = Arc::new(Manager::new(
        store,
        Arc::clone(&cloud),
        dispatcher,
        SystemClock,
        engine_config,
        SystemContext::gather(),
        Arc::new(DesktopNotifyAdapter::new()),
    ));

    // Background workers: sync flush and the network monitor feeding
    // online transitions into the manager.
    manager.spawn_sync_worker();
    spawn_network_monitor(Arc::clone(&manager), cloud);

    // A stale socket from a dead daemon blocks bind; the lock proves
    // nobody is serving it.
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    let listener = UnixListener::bind(&config.socket_path)?;

    Ok(StartupResult {
        config: config.clone(),
        manager,
        listener,
        input_requests,
        user_input,
        lock_file,
    })
}

fn spawn_network_monitor(manager: Arc<DaemonManager>, cloud: Arc<HttpCloudClient>) {
    let mut monitor_config = NetworkMonitorConfig::default();
    if let Some(v) = env::probe_interval() {
        monitor_config.probe_interval = v;
    }
    let monitor = NetworkMonitor::new(monitor_config);
    let mut transitions = monitor.subscribe();

    tokio::spawn(monitor.run(cloud));
    tokio::spawn(async move {
        while transitions.changed().await.is_ok() {
            let online = *transitions.borrow();
            manager.set_online(online);
        }
    });
}

/// Parked prompts shared between the input pump and the listener.
pub type PendingInputs = Arc<Mutex<Vec<crate::protocol::PendingInput>>>;

/// Graceful shutdown: stop runs, tear down tools, release the socket.
pub async fn shutdown(config: &Config, manager: &DaemonManager) {
    info!("shutting down daemon");
    manager.shutdown().await;
    let _ = std::fs::remove_file(&config.socket_path);
    let _ = std::fs::remove_file(&config.lock_path);
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
