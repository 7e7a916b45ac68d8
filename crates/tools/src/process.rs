// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-lived subprocess registry.
//!
//! `system.start_process` spawns a detached child under a generated id,
//! captures its output into a ring buffer, and optionally blocks until a
//! ready marker appears. `monitor` and `stop` operate on the id; engine
//! shutdown signals every registered process.

use crate::args::{opt_bool, opt_str, opt_u64, require_str, ArgMap};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tether_core::{EngineError, IdGen, ProcessId, ShortId, ToolResult, UuidIdGen};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

/// Grace period between SIGTERM and SIGKILL.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Default wait for a ready marker.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Lines kept per process.
const LOG_CAPACITY: usize = 500;

/// Log lines returned by `monitor`.
const MONITOR_TAIL: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessState {
    Running,
    Exited(i32),
}

struct ProcessEntry {
    command: String,
    pid: u32,
    child: Child,
    started: Instant,
    log: Arc<Mutex<VecDeque<String>>>,
}

impl ProcessEntry {
    fn state(&mut self) -> ProcessState {
        match self.child.try_wait() {
            Ok(Some(status)) => ProcessState::Exited(status.code().unwrap_or(-1)),
            _ => ProcessState::Running,
        }
    }

    fn tail(&self, lines: usize) -> Vec<String> {
        let log = self.log.lock();
        log.iter()
            .skip(log.len().saturating_sub(lines))
            .cloned()
            .collect()
    }
}

/// Registry of long-lived subprocesses, keyed by [`ProcessId`].
#[derive(Clone)]
pub struct ProcessRegistry {
    entries: Arc<Mutex<HashMap<ProcessId, ProcessEntry>>>,
    idgen: UuidIdGen,
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            idgen: UuidIdGen,
        }
    }

    /// Ids of all registered processes.
    pub fn list(&self) -> Vec<ProcessId> {
        self.entries.lock().keys().cloned().collect()
    }

    /// `system.start_process`.
    pub async fn start(&self, args: &ArgMap) -> ToolResult {
        let command = match require_str(args, "command") {
            Ok(c) => c.to_string(),
            Err(e) => return ToolResult::err(e),
        };

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = opt_str(args, "cwd") {
            cmd.current_dir(cwd);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ToolResult::err(EngineError::tool_failure(format!("spawn failed: {e}")))
            }
        };
        let pid = child.id().unwrap_or(0);

        let log = Arc::new(Mutex::new(VecDeque::with_capacity(LOG_CAPACITY)));
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, Arc::clone(&log));
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, Arc::clone(&log));
        }

        let process_id = ProcessId::new(format!("proc-{}", self.idgen.next().short(8)));
        let entry = ProcessEntry {
            command: command.clone(),
            pid,
            child,
            started: Instant::now(),
            log: Arc::clone(&log),
        };
        self.entries.lock().insert(process_id.clone(), entry);

        tracing::info!(%process_id, pid, %command, "started long-lived process");

        // Optionally block until the process announces readiness.
        if let Some(marker) = opt_str(args, "wait_for_ready") {
            let timeout = opt_u64(args, "ready_timeout_sec")
                .map(Duration::from_secs)
                .unwrap_or(READY_TIMEOUT);
            if let Err(result) = self.wait_for_ready(&process_id, marker, timeout).await {
                return result;
            }
        }

        let uptime_ms = self
            .entries
            .lock()
            .get(&process_id)
            .map(|e| e.started.elapsed().as_millis() as u64)
            .unwrap_or(0);

        ToolResult::ok(format!("started {process_id} (pid {pid})")).with_evidence(json!({
            "process_id": process_id.as_str(),
            "pid": pid,
            "uptime_ms": uptime_ms,
        }))
    }

    /// Poll the ring buffer for `marker`, detecting early exit.
    async fn wait_for_ready(
        &self,
        process_id: &ProcessId,
        marker: &str,
        timeout: Duration,
    ) -> Result<(), ToolResult> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut entries = self.entries.lock();
                let Some(entry) = entries.get_mut(process_id) else {
                    return Err(ToolResult::err(EngineError::tool_failure(
                        "process vanished while waiting for ready",
                    )));
                };
                if entry.log.lock().iter().any(|line| line.contains(marker)) {
                    return Ok(());
                }
                if let ProcessState::Exited(code) = entry.state() {
                    let tail = entry.tail(10).join("\n");
                    entries.remove(process_id);
                    return Err(ToolResult::err(EngineError::tool_failure(format!(
                        "process exited with code {code} before ready marker: {tail}"
                    ))));
                }
            }
            if Instant::now() >= deadline {
                return Err(ToolResult::err(EngineError::timeout(format!(
                    "ready marker \"{marker}\" not seen within {}s",
                    timeout.as_secs()
                ))));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// `system.monitor_process`.
    pub fn monitor(&self, args: &ArgMap) -> ToolResult {
        let process_id = match require_str(args, "process_id") {
            Ok(id) => ProcessId::new(id),
            Err(e) => return ToolResult::err(e),
        };

        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&process_id) else {
            return ToolResult::err(EngineError::tool_failure(format!(
                "no such process: {process_id}"
            )));
        };

        let (status, exit_code) = match entry.state() {
            ProcessState::Running => ("running", None),
            ProcessState::Exited(code) => ("exited", Some(code)),
        };
        let tail = entry.tail(MONITOR_TAIL);

        ToolResult::ok(tail.join("\n")).with_evidence(json!({
            "process_id": process_id.as_str(),
            "pid": entry.pid,
            "command": entry.command,
            "status": status,
            "exit_code": exit_code,
            "uptime_ms": entry.started.elapsed().as_millis() as u64,
        }))
    }

    /// `system.stop_process` - graceful signal, then force-kill after the
    /// grace period (or immediately with `force=true`).
    pub async fn stop(&self, args: &ArgMap) -> ToolResult {
        let process_id = match require_str(args, "process_id") {
            Ok(id) => ProcessId::new(id),
            Err(e) => return ToolResult::err(e),
        };
        let force = opt_bool(args, "force").unwrap_or(false);

        let Some(mut entry) = self.entries.lock().remove(&process_id) else {
            return ToolResult::err(EngineError::tool_failure(format!(
                "no such process: {process_id}"
            )));
        };

        if let ProcessState::Exited(code) = entry.state() {
            return ToolResult::ok(format!("{process_id} had already exited with code {code}"));
        }

        if !force {
            send_sigterm(entry.pid);
            let deadline = Instant::now() + STOP_GRACE;
            while Instant::now() < deadline {
                if let ProcessState::Exited(code) = entry.state() {
                    return ToolResult::ok(format!("{process_id} terminated with code {code}"));
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        match entry.child.kill().await {
            Ok(()) => ToolResult::ok(format!("{process_id} killed")),
            Err(e) => ToolResult::err(EngineError::tool_failure(format!(
                "kill {process_id}: {e}"
            ))),
        }
    }

    /// Signal every registered process. Called on engine shutdown and by
    /// the emergency stop. All processes are signalled up front; children
    /// that ignore SIGTERM are killed after the grace period.
    pub async fn terminate_all(&self) {
        let mut drained: Vec<(ProcessId, ProcessEntry)> = {
            let mut entries = self.entries.lock();
            entries.drain().collect()
        };

        for (process_id, entry) in drained.iter_mut() {
            if let ProcessState::Running = entry.state() {
                tracing::info!(%process_id, pid = entry.pid, "terminating registered process");
                send_sigterm(entry.pid);
            }
        }

        for (_, mut entry) in drained {
            let exited = tokio::time::timeout(STOP_GRACE, entry.child.wait()).await;
            if exited.is_err() {
                let _ = entry.child.kill().await;
            }
        }
    }
}

fn send_sigterm(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if pid == 0 {
        return;
    }
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::warn!(pid, error = %e, "SIGTERM failed");
    }
}

fn spawn_line_reader(
    stream: impl tokio::io::AsyncRead + Unpin + Send + 'static,
    log: Arc<Mutex<VecDeque<String>>>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut log = log.lock();
            if log.len() >= LOG_CAPACITY {
                log.pop_front();
            }
            log.push_back(line);
        }
    });
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
