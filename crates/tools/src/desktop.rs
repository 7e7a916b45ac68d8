// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OS-level desktop actions.
//!
//! Screenshot, synthetic input, window management and clipboard, composed
//! from the host's `screencapture`/`osascript`/`pbcopy` tools. Only
//! supported on macOS; elsewhere every action returns `unsupported`.

use crate::applescript::run_osascript;
use crate::args::{opt_i64, require_str, ArgMap};
use tether_core::{EngineError, ToolResult};

fn unsupported(tool: &str) -> ToolResult {
    ToolResult::err(EngineError::unsupported(format!(
        "{tool} is not supported on this platform"
    )))
}

/// Dispatch a `desktop.*` action.
pub async fn dispatch(tool: &str, args: &ArgMap) -> ToolResult {
    if !cfg!(target_os = "macos") {
        return unsupported(tool);
    }

    match tool {
        "desktop.screenshot" => screenshot().await,
        "desktop.click" => click(args).await,
        "desktop.type" => type_text(args).await,
        "desktop.hotkey" => hotkey(args).await,
        "desktop.window_list" => window_list().await,
        "desktop.window_focus" => window_focus(args).await,
        "desktop.window_resize" => window_resize(args).await,
        "desktop.clipboard_read" => clipboard_read().await,
        "desktop.clipboard_write" => clipboard_write(args).await,
        other => ToolResult::err(EngineError::contract(format!(
            "unknown desktop action: {other}"
        ))),
    }
}

async fn screenshot() -> ToolResult {
    use crate::subprocess::{run_with_timeout, DESKTOP_TIMEOUT};
    use base64::Engine as _;

    let path = std::env::temp_dir().join(format!("tether-shot-{}.png", std::process::id()));
    let mut cmd = tokio::process::Command::new("screencapture");
    cmd.arg("-x").arg(&path);

    match run_with_timeout(cmd, DESKTOP_TIMEOUT, "screencapture").await {
        Ok(output) if output.status.success() => {
            let bytes = tokio::fs::read(&path).await.unwrap_or_default();
            let _ = tokio::fs::remove_file(&path).await;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            ToolResult::ok("captured screen")
                .with_evidence(serde_json::json!({ "screenshot_base64": encoded }))
        }
        Ok(output) => ToolResult::err(EngineError::tool_failure(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        )),
        Err(message) => ToolResult::err(EngineError::timeout(message)),
    }
}

async fn click(args: &ArgMap) -> ToolResult {
    let (Some(x), Some(y)) = (opt_i64(args, "x"), opt_i64(args, "y")) else {
        return ToolResult::err(EngineError::contract("click needs x and y"));
    };
    let script = format!("tell application \"System Events\" to click at {{{x}, {y}}}");
    run_osascript(&script, "desktop.click").await
}

async fn type_text(args: &ArgMap) -> ToolResult {
    let text = match require_str(args, "text") {
        Ok(t) => t,
        Err(e) => return ToolResult::err(e),
    };
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    let script = format!("tell application \"System Events\" to keystroke \"{escaped}\"");
    run_osascript(&script, "desktop.type").await
}

async fn hotkey(args: &ArgMap) -> ToolResult {
    let key = match require_str(args, "key") {
        Ok(k) => k,
        Err(e) => return ToolResult::err(e),
    };
    let modifiers: Vec<String> = args
        .get("modifiers")
        .and_then(|v| v.as_array())
        .map(|mods| {
            mods.iter()
                .filter_map(|m| m.as_str())
                .filter_map(|m| match m {
                    "cmd" | "command" => Some("command down".to_string()),
                    "shift" => Some("shift down".to_string()),
                    "alt" | "option" => Some("option down".to_string()),
                    "ctrl" | "control" => Some("control down".to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
    let script = if modifiers.is_empty() {
        format!("tell application \"System Events\" to keystroke \"{escaped}\"")
    } else {
        format!(
            "tell application \"System Events\" to keystroke \"{escaped}\" using {{{}}}",
            modifiers.join(", ")
        )
    };
    run_osascript(&script, "desktop.hotkey").await
}

async fn window_list() -> ToolResult {
    let script = concat!(
        "tell application \"System Events\"\n",
        "  set out to {}\n",
        "  repeat with proc in (every process whose visible is true)\n",
        "    repeat with w in (every window of proc)\n",
        "      set end of out to (name of proc) & \": \" & (name of w)\n",
        "    end repeat\n",
        "  end repeat\n",
        "end tell\n",
        "set AppleScript's text item delimiters to linefeed\n",
        "out as text"
    );
    run_osascript(script, "desktop.window_list").await
}

async fn window_focus(args: &ArgMap) -> ToolResult {
    let app = match require_str(args, "app") {
        Ok(a) => a,
        Err(e) => return ToolResult::err(e),
    };
    let escaped = app.replace('\\', "\\\\").replace('"', "\\\"");
    let script = format!(
        "tell application \"System Events\" to set frontmost of process \"{escaped}\" to true"
    );
    run_osascript(&script, "desktop.window_focus").await
}

async fn window_resize(args: &ArgMap) -> ToolResult {
    let app = match require_str(args, "app") {
        Ok(a) => a,
        Err(e) => return ToolResult::err(e),
    };
    let (Some(width), Some(height)) = (opt_i64(args, "width"), opt_i64(args, "height")) else {
        return ToolResult::err(EngineError::contract("resize needs width and height"));
    };
    let escaped = app.replace('\\', "\\\\").replace('"', "\\\"");
    let script = format!(
        "tell application \"System Events\" to set size of front window of process \"{escaped}\" to {{{width}, {height}}}"
    );
    run_osascript(&script, "desktop.window_resize").await
}

async fn clipboard_read() -> ToolResult {
    use crate::subprocess::{run_with_timeout, DESKTOP_TIMEOUT};

    let cmd = tokio::process::Command::new("pbpaste");
    match run_with_timeout(cmd, DESKTOP_TIMEOUT, "pbpaste").await {
        Ok(output) if output.status.success() => {
            ToolResult::ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => ToolResult::err(EngineError::tool_failure(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        )),
        Err(message) => ToolResult::err(EngineError::timeout(message)),
    }
}

async fn clipboard_write(args: &ArgMap) -> ToolResult {
    use std::process::Stdio;
    use tokio::io::AsyncWriteExt;

    let text = match require_str(args, "text") {
        Ok(t) => t.to_string(),
        Err(e) => return ToolResult::err(e),
    };

    let spawned = tokio::process::Command::new("pbcopy")
        .stdin(Stdio::piped())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => return ToolResult::err(EngineError::tool_failure(format!("pbcopy: {e}"))),
    };
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(text.as_bytes()).await {
            return ToolResult::err(EngineError::tool_failure(format!("pbcopy write: {e}")));
        }
    }
    match child.wait().await {
        Ok(status) if status.success() => ToolResult::ok("clipboard updated"),
        Ok(status) => ToolResult::err(EngineError::tool_failure(format!(
            "pbcopy exited with {status}"
        ))),
        Err(e) => ToolResult::err(EngineError::tool_failure(format!("pbcopy wait: {e}"))),
    }
}
