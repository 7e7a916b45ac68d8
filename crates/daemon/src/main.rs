// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tether Daemon (tetherd)
//!
//! Background process that owns the execution engine, its SQLite state
//! and the Unix-socket IPC surface.
//!
//! Architecture:
//! - Listener task: socket I/O, request dispatch
//! - Manager: per-run executor tasks, sync worker, network monitor
//! - Main task: signals, user-input pump, shutdown

use tether_daemon::lifecycle::{self, Config, LifecycleError, StartupResult};
use tether_daemon::listener::{ListenCtx, Listener};
use tether_daemon::protocol::PendingInput;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("tetherd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("tetherd {}", env!("CARGO_PKG_VERSION"));
                println!("Tether daemon - runs automation plans on this machine");
                println!();
                println!("USAGE:");
                println!("    tetherd");
                println!();
                println!("The daemon is typically started by the `tether` CLI or the");
                println!("desktop app and should not be invoked directly. It listens on");
                println!("a Unix socket for executor commands.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: tetherd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!("starting tether daemon");

    let StartupResult {
        config,
        manager,
        listener: unix_listener,
        mut input_requests,
        user_input,
        lock_file: _lock_file,
    } = match lifecycle::startup(&config).await {
        Ok(result) => result,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("tetherd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config, &e);
            error!("failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let shutdown_notify = Arc::new(Notify::new());
    let pending_inputs: lifecycle::PendingInputs = Arc::new(Mutex::new(Vec::new()));

    let ctx = Arc::new(ListenCtx {
        manager: Arc::clone(&manager),
        user_input,
        pending_inputs: Arc::clone(&pending_inputs),
        shutdown: Arc::clone(&shutdown_notify),
    });
    tokio::spawn(Listener::new(unix_listener, ctx).run());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("daemon ready, listening on {}", config.socket_path.display());

    // Signal ready for a supervising process (CLI waiting for startup)
    println!("READY");

    // Reopen interrupted runs once the socket is accepting connections.
    {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            match manager.resume_active_runs() {
                Ok(0) => {}
                Ok(count) => info!(count, "resumed runs from previous session"),
                Err(e) => error!("resume failed: {}", e),
            }
        });
    }

    loop {
        tokio::select! {
            // Park user-input prompts for the UI to pick up.
            request = input_requests.recv() => {
                match request {
                    Some(request) => {
                        pending_inputs.lock().push(PendingInput {
                            request_id: request.request_id.to_string(),
                            prompt: request.prompt,
                        });
                    }
                    None => {
                        info!("input channel closed, shutting down");
                        break;
                    }
                }
            }

            _ = shutdown_notify.notified() => {
                info!("shutdown requested via command");
                break;
            }

            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }

            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    lifecycle::shutdown(&config, &manager).await;
    info!("daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` → `daemon.log.1` → `daemon.log.2` → `daemon.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently
/// ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to log before anything else.
/// The CLI uses this to find where the current startup attempt begins.
const STARTUP_MARKER_PREFIX: &str = "--- tetherd: starting (pid: ";

fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(
        file,
        "{}{}) ---\n",
        STARTUP_MARKER_PREFIX,
        std::process::id()
    )?;

    Ok(())
}

/// Write a startup error synchronously so it is visible even if the
/// process exits before the async appender flushes.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
