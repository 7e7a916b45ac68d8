// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `shell.exec` handler.

use crate::args::{opt_str, opt_u64, require_str, ArgMap};
use crate::sandbox::Sandbox;
use serde_json::json;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tether_core::{EngineError, ToolResult};
use tokio::process::Command;

/// Default attempt timeout for ordinary commands.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Extended timeout for commands matching [`LONG_RUNNING_PATTERNS`].
const LONG_TIMEOUT: Duration = Duration::from_secs(300);

/// Command prefixes known to run long: package installers, compilers,
/// clones. Matched anywhere in the command line.
const LONG_RUNNING_PATTERNS: &[&str] = &[
    "npm install",
    "npm ci",
    "yarn install",
    "pnpm install",
    "pip install",
    "pip3 install",
    "cargo build",
    "cargo install",
    "cargo test",
    "go build",
    "make",
    "cmake",
    "git clone",
    "apt-get install",
    "apt install",
    "brew install",
    "docker build",
    "docker pull",
    "bundle install",
    "composer install",
    "gradle",
    "mvn ",
];

/// Check whether a command line matches the long-running pattern list.
pub fn is_long_running(command: &str) -> bool {
    LONG_RUNNING_PATTERNS
        .iter()
        .any(|pattern| command.contains(pattern))
}

/// Rewrite a home-wide `find ... -name` into an indexed Spotlight search.
///
/// `find ~ -name "foo.txt"` walks the whole home tree; `mdfind` answers
/// from the index in milliseconds. Only home-rooted name searches are
/// rewritten; anything with extra predicates is left alone. Returns the
/// fallback depth-limited `find` alongside, for hosts without an index.
pub fn rewrite_home_find(command: &str, home: &str) -> Option<(String, String)> {
    let trimmed = command.trim();
    let rest = trimmed.strip_prefix("find ")?;
    let mut parts = rest.split_whitespace();

    let root = parts.next()?;
    if root != "~" && root != "$HOME" && root != home {
        return None;
    }
    if parts.next()? != "-name" {
        return None;
    }
    let pattern = parts.next()?.trim_matches(['"', '\'']);
    // Extra predicates mean the caller wanted real find semantics.
    if parts.next().is_some() {
        return None;
    }

    let spotlight = format!("mdfind -onlyin \"{home}\" -name \"{pattern}\"");
    let fallback = format!("find \"{home}\" -maxdepth 6 -name \"{pattern}\" 2>/dev/null");
    Some((spotlight, fallback))
}

/// Execute a shell command with captured streams and a wall-clock bound.
pub async fn exec(sandbox: &Sandbox, args: &ArgMap) -> ToolResult {
    let command = match require_str(args, "command") {
        Ok(c) => c.to_string(),
        Err(e) => return ToolResult::err(e),
    };

    let timeout = match opt_u64(args, "timeout_sec") {
        Some(secs) => Duration::from_secs(secs),
        None if is_long_running(&command) => LONG_TIMEOUT,
        None => DEFAULT_TIMEOUT,
    };

    let home = sandbox.home().to_string_lossy().to_string();
    let command = if cfg!(target_os = "macos") {
        match rewrite_home_find(&command, &home) {
            Some((spotlight, fallback)) => format!("{spotlight} || {fallback}"),
            None => command,
        }
    } else {
        command
    };

    let cwd = match opt_str(args, "cwd") {
        Some(dir) => match sandbox.resolve(dir) {
            Ok(path) => path,
            Err(e) => return ToolResult::err(e),
        },
        None => sandbox.home().to_owned(),
    };

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(&command)
        .current_dir(&cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(env) = args.get("env").and_then(|v| v.as_object()) {
        for (key, value) in env {
            if let Some(value) = value.as_str() {
                cmd.env(key, value);
            }
        }
    }

    tracing::info!(%command, cwd = %cwd.display(), timeout_sec = timeout.as_secs(), "shell exec");

    let start = Instant::now();
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            let exit_code = output.status.code().unwrap_or(-1);
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let status = if output.status.success() {
                "completed"
            } else {
                "failed"
            };

            let mut result = if output.status.success() {
                ToolResult::ok(stdout)
            } else {
                let mut failed = ToolResult::err(EngineError::tool_failure(format!(
                    "command exited with code {exit_code}"
                )));
                failed.stdout = stdout;
                failed
            };
            result.stderr = stderr;
            result.with_exit_code(exit_code).with_evidence(json!({
                "status": status,
                "duration_ms": start.elapsed().as_millis() as u64,
            }))
        }
        Ok(Err(e)) => ToolResult::err(EngineError::transient(format!("spawn failed: {e}"))),
        Err(_) => {
            let result = ToolResult::err(EngineError::timeout(format!(
                "command timed out after {}s",
                timeout.as_secs()
            )));
            result.with_evidence(json!({
                "status": "timeout",
                "duration_ms": start.elapsed().as_millis() as u64,
            }))
        }
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
