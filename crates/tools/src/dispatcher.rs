// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool dispatcher: alias table → canonical name → handler.

use crate::args::ArgMap;
use crate::browser::BrowserHandler;
use crate::input::UserInputAdapter;
use crate::normalize::canonical_name;
use crate::process::ProcessRegistry;
use crate::sandbox::Sandbox;
use crate::{applescript, desktop, fs, shell, web};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{EngineError, IdGen, RequestId, ToolResult, UuidIdGen};

/// Wall-clock bound for a `user_input` prompt.
const USER_INPUT_TIMEOUT: Duration = Duration::from_secs(60);

/// Routes normalized tool names to their handlers and owns the shared
/// resources: the sandbox, the HTTP client, the lazy browser and the
/// long-process registry.
pub struct Dispatcher {
    sandbox: Sandbox,
    http: reqwest::Client,
    browser: BrowserHandler,
    processes: ProcessRegistry,
    input: Arc<dyn UserInputAdapter>,
    idgen: UuidIdGen,
}

impl Dispatcher {
    pub fn new(sandbox: Sandbox, input: Arc<dyn UserInputAdapter>) -> Self {
        Self {
            sandbox,
            http: web::build_client(),
            browser: BrowserHandler::new(),
            processes: ProcessRegistry::new(),
            input,
            idgen: UuidIdGen,
        }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn processes(&self) -> &ProcessRegistry {
        &self.processes
    }

    /// Invoke a tool by (possibly aliased) name.
    ///
    /// Never raises: every failure comes back as an unsuccessful
    /// [`ToolResult`] with a labeled error.
    pub async fn dispatch(&self, tool_name: &str, args: &ArgMap) -> ToolResult {
        let canonical = canonical_name(tool_name);

        let start = std::time::Instant::now();
        let result = self.dispatch_inner(canonical, args).await;

        tracing::info!(
            tool = canonical,
            success = result.success,
            elapsed_ms = start.elapsed().as_millis() as u64,
            error = result.error.as_ref().map(|e| e.kind.to_string()),
            "tool finished"
        );
        result
    }

    async fn dispatch_inner(&self, tool: &str, args: &ArgMap) -> ToolResult {
        match tool {
            "shell.exec" => shell::exec(&self.sandbox, args).await,

            "fs.write" => fs::write(&self.sandbox, args).await,
            "fs.read" => fs::read(&self.sandbox, args).await,
            "fs.append" => fs::append(&self.sandbox, args).await,
            "fs.list" => fs::list(&self.sandbox, args).await,
            "fs.delete" => fs::delete(&self.sandbox, args).await,
            "fs.search" | "fs.find" => fs::search(&self.sandbox, args).await,

            "web.fetch" => web::fetch(&self.http, args).await,

            "browser.open" => self.browser.open(args).await,
            "browser.fill" => self.browser.fill(args).await,
            "browser.click" => self.browser.click(args).await,
            "browser.get_text" => self.browser.get_text(args).await,
            "browser.screenshot" => self.browser.screenshot(args).await,

            name if name.starts_with("desktop.") => desktop::dispatch(name, args).await,

            "safari.navigate" | "notes.create" | "mail.send" | "calendar.create_event"
            | "reminders.create" | "finder.reveal" | "contacts.create" => {
                applescript::run(tool, args).await
            }

            "system.start_process" => self.processes.start(args).await,
            "system.monitor_process" => self.processes.monitor(args),
            "system.stop_process" => self.processes.stop(args).await,

            "think" => think(args),
            "user_input" => self.user_input(args).await,

            other => ToolResult::err(EngineError::contract(format!(
                "unknown tool: {other}"
            ))),
        }
    }

    async fn user_input(&self, args: &ArgMap) -> ToolResult {
        let prompt = match crate::args::require_str(args, "prompt") {
            Ok(p) => p.to_string(),
            Err(e) => return ToolResult::err(e),
        };
        let request_id = RequestId::new(self.idgen.next());

        match tokio::time::timeout(
            USER_INPUT_TIMEOUT,
            self.input.request(&request_id, &prompt),
        )
        .await
        {
            Ok(Ok(answer)) => ToolResult::ok(answer),
            Ok(Err(e)) => ToolResult::err(e),
            Err(_) => ToolResult::err(EngineError::timeout(format!(
                "no user response within {}s",
                USER_INPUT_TIMEOUT.as_secs()
            ))),
        }
    }

    /// Terminate registered processes and close the browser.
    pub async fn shutdown(&self) {
        self.processes.terminate_all().await;
        self.browser.shutdown().await;
    }
}

/// `think` records reasoning text and always succeeds.
fn think(args: &ArgMap) -> ToolResult {
    let text = crate::args::opt_str(args, "thought")
        .or_else(|| crate::args::opt_str(args, "text"))
        .unwrap_or("");
    ToolResult::ok(text)
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
