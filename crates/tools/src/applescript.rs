// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OS-scripted app actions composed as AppleScript.
//!
//! Each action has its own required arg set; the script runs through the
//! host's `osascript` bridge and returns success text or an error string.
//! On non-macOS hosts every action reports `unsupported`.

use crate::args::{opt_str, require_str, ArgMap};
use tether_core::{EngineError, ToolResult};

/// Escape a string for interpolation into an AppleScript literal.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Build the script for a canonical app action, validating its args.
pub fn build_script(tool: &str, args: &ArgMap) -> Result<String, EngineError> {
    match tool {
        "safari.navigate" => {
            let url = require_str(args, "url")?;
            Ok(format!(
                "tell application \"Safari\"\n  activate\n  open location \"{}\"\nend tell",
                escape(url)
            ))
        }
        "notes.create" => {
            let title = require_str(args, "title")?;
            let body = opt_str(args, "body").unwrap_or("");
            Ok(format!(
                "tell application \"Notes\"\n  make new note at folder \"Notes\" with properties {{name:\"{}\", body:\"{}\"}}\nend tell",
                escape(title),
                escape(body)
            ))
        }
        "mail.send" => {
            let to = require_str(args, "to")?;
            let subject = require_str(args, "subject")?;
            let body = opt_str(args, "body").unwrap_or("");
            Ok(format!(
                concat!(
                    "tell application \"Mail\"\n",
                    "  set msg to make new outgoing message with properties {{subject:\"{}\", content:\"{}\", visible:false}}\n",
                    "  tell msg to make new to recipient at end of to recipients with properties {{address:\"{}\"}}\n",
                    "  send msg\nend tell"
                ),
                escape(subject),
                escape(body),
                escape(to)
            ))
        }
        "calendar.create_event" => {
            let title = require_str(args, "title")?;
            let start = require_str(args, "start")?;
            let end = require_str(args, "end")?;
            let calendar = opt_str(args, "calendar").unwrap_or("Calendar");
            Ok(format!(
                concat!(
                    "tell application \"Calendar\"\n",
                    "  tell calendar \"{}\"\n",
                    "    make new event with properties {{summary:\"{}\", start date:date \"{}\", end date:date \"{}\"}}\n",
                    "  end tell\nend tell"
                ),
                escape(calendar),
                escape(title),
                escape(start),
                escape(end)
            ))
        }
        "reminders.create" => {
            let title = require_str(args, "title")?;
            let due = opt_str(args, "due");
            let base = match due {
                Some(due) => format!(
                    "make new reminder with properties {{name:\"{}\", due date:date \"{}\"}}",
                    escape(title),
                    escape(due)
                ),
                None => format!(
                    "make new reminder with properties {{name:\"{}\"}}",
                    escape(title)
                ),
            };
            Ok(format!("tell application \"Reminders\"\n  {base}\nend tell"))
        }
        "finder.reveal" => {
            let path = require_str(args, "path")?;
            Ok(format!(
                "tell application \"Finder\"\n  reveal POSIX file \"{}\"\n  activate\nend tell",
                escape(path)
            ))
        }
        "contacts.create" => {
            let name = require_str(args, "name")?;
            let phone = opt_str(args, "phone");
            let mut script = format!(
                concat!(
                    "tell application \"Contacts\"\n",
                    "  set p to make new person with properties {{first name:\"{}\"}}\n"
                ),
                escape(name)
            );
            if let Some(phone) = phone {
                script.push_str(&format!(
                    "  make new phone at end of phones of p with properties {{label:\"mobile\", value:\"{}\"}}\n",
                    escape(phone)
                ));
            }
            script.push_str("  save\nend tell");
            Ok(script)
        }
        other => Err(EngineError::contract(format!(
            "unknown app action: {other}"
        ))),
    }
}

/// Run an app action through `osascript`.
pub async fn run(tool: &str, args: &ArgMap) -> ToolResult {
    let script = match build_script(tool, args) {
        Ok(script) => script,
        Err(e) => return ToolResult::err(e),
    };

    if !cfg!(target_os = "macos") {
        return ToolResult::err(EngineError::unsupported(format!(
            "{tool} requires macOS scripting support"
        )));
    }

    run_osascript(&script, tool).await
}

/// Execute a script via the host scripting bridge.
pub async fn run_osascript(script: &str, description: &str) -> ToolResult {
    use crate::subprocess::{run_with_timeout, SCRIPT_TIMEOUT};

    let mut cmd = tokio::process::Command::new("osascript");
    cmd.arg("-e").arg(script);

    match run_with_timeout(cmd, SCRIPT_TIMEOUT, description).await {
        Ok(output) if output.status.success() => {
            ToolResult::ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            // Automation permission refusals surface as -1743.
            if stderr.contains("-1743") || stderr.contains("not allowed") {
                ToolResult::err(EngineError::access_denied(stderr))
            } else {
                ToolResult::err(EngineError::tool_failure(format!(
                    "{description}: {stderr}"
                )))
            }
        }
        Err(message) => ToolResult::err(EngineError::timeout(message)),
    }
}

#[cfg(test)]
#[path = "applescript_tests.rs"]
mod tests;
