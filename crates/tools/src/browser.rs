// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Headless-browser handlers.
//!
//! One lazily launched Chromium instance per dispatcher, one shared page.
//! Every action captures a screenshot as evidence; selector waits share a
//! fixed timeout.

use crate::args::{require_str, ArgMap};
use base64::Engine as _;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures_util::StreamExt;
use serde_json::json;
use std::time::{Duration, Instant};
use tether_core::{EngineError, ToolResult};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Wait bound for selectors.
const SELECTOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval while waiting for a selector.
const SELECTOR_POLL: Duration = Duration::from_millis(250);

struct BrowserState {
    browser: Browser,
    page: Page,
    event_loop: JoinHandle<()>,
}

/// Owner of the lazy browser singleton.
pub struct BrowserHandler {
    state: Mutex<Option<BrowserState>>,
}

impl Default for BrowserHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserHandler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    /// `browser.open` - navigate the shared page.
    pub async fn open(&self, args: &ArgMap) -> ToolResult {
        let url = match require_str(args, "url") {
            Ok(u) => u.to_string(),
            Err(e) => return ToolResult::err(e),
        };

        let mut state = self.state.lock().await;
        let state = match ensure_browser(&mut state).await {
            Ok(state) => state,
            Err(e) => return ToolResult::err(e),
        };

        if let Err(e) = state.page.goto(url.as_str()).await {
            return ToolResult::err(EngineError::tool_failure(format!("navigate {url}: {e}")));
        }
        let _ = state.page.wait_for_navigation().await;

        let title = state.page.get_title().await.ok().flatten().unwrap_or_default();
        let evidence = action_evidence(&state.page, json!({ "url": url, "title": title })).await;
        ToolResult::ok(format!("opened {url} ({title})")).with_evidence(evidence)
    }

    /// `browser.fill` - focus a selector and type into it.
    pub async fn fill(&self, args: &ArgMap) -> ToolResult {
        let selector = match require_str(args, "selector") {
            Ok(s) => s.to_string(),
            Err(e) => return ToolResult::err(e),
        };
        let value = match require_str(args, "value") {
            Ok(v) => v.to_string(),
            Err(e) => return ToolResult::err(e),
        };

        let mut state = self.state.lock().await;
        let state = match ensure_browser(&mut state).await {
            Ok(state) => state,
            Err(e) => return ToolResult::err(e),
        };

        let element = match wait_for_selector(&state.page, &selector).await {
            Ok(element) => element,
            Err(e) => return ToolResult::err(e),
        };
        let typed = async {
            element.click().await?;
            element.type_str(&value).await
        }
        .await;
        if let Err(e) = typed {
            return ToolResult::err(EngineError::tool_failure(format!(
                "fill {selector}: {e}"
            )));
        }

        let evidence = action_evidence(&state.page, json!({ "selector": selector })).await;
        ToolResult::ok(format!("filled {selector}")).with_evidence(evidence)
    }

    /// `browser.click`.
    pub async fn click(&self, args: &ArgMap) -> ToolResult {
        let selector = match require_str(args, "selector") {
            Ok(s) => s.to_string(),
            Err(e) => return ToolResult::err(e),
        };

        let mut state = self.state.lock().await;
        let state = match ensure_browser(&mut state).await {
            Ok(state) => state,
            Err(e) => return ToolResult::err(e),
        };

        let element = match wait_for_selector(&state.page, &selector).await {
            Ok(element) => element,
            Err(e) => return ToolResult::err(e),
        };
        if let Err(e) = element.click().await {
            return ToolResult::err(EngineError::tool_failure(format!(
                "click {selector}: {e}"
            )));
        }

        let evidence = action_evidence(&state.page, json!({ "selector": selector })).await;
        ToolResult::ok(format!("clicked {selector}")).with_evidence(evidence)
    }

    /// `browser.get_text` - inner text of a selector.
    pub async fn get_text(&self, args: &ArgMap) -> ToolResult {
        let selector = match require_str(args, "selector") {
            Ok(s) => s.to_string(),
            Err(e) => return ToolResult::err(e),
        };

        let mut state = self.state.lock().await;
        let state = match ensure_browser(&mut state).await {
            Ok(state) => state,
            Err(e) => return ToolResult::err(e),
        };

        let element = match wait_for_selector(&state.page, &selector).await {
            Ok(element) => element,
            Err(e) => return ToolResult::err(e),
        };
        let text = match element.inner_text().await {
            Ok(text) => text.unwrap_or_default(),
            Err(e) => {
                return ToolResult::err(EngineError::tool_failure(format!(
                    "get_text {selector}: {e}"
                )))
            }
        };

        let evidence = action_evidence(&state.page, json!({ "selector": selector })).await;
        ToolResult::ok(text).with_evidence(evidence)
    }

    /// `browser.screenshot`.
    pub async fn screenshot(&self, _args: &ArgMap) -> ToolResult {
        let mut state = self.state.lock().await;
        let state = match ensure_browser(&mut state).await {
            Ok(state) => state,
            Err(e) => return ToolResult::err(e),
        };

        match capture(&state.page).await {
            Some(encoded) => ToolResult::ok("captured screenshot")
                .with_evidence(json!({ "screenshot_base64": encoded })),
            None => ToolResult::err(EngineError::tool_failure("screenshot capture failed")),
        }
    }

    /// Close the browser if it was ever launched.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if let Some(mut state) = state.take() {
            let _ = state.browser.close().await;
            state.event_loop.abort();
        }
    }
}

/// Launch the browser on first use.
async fn ensure_browser(
    slot: &mut Option<BrowserState>,
) -> Result<&mut BrowserState, EngineError> {
    if slot.is_none() {
        let config = BrowserConfig::builder()
            .build()
            .map_err(|e| EngineError::unsupported(format!("browser config: {e}")))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| EngineError::unsupported(format!("browser launch: {e}")))?;

        let event_loop = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| EngineError::tool_failure(format!("new page: {e}")))?;

        tracing::info!("launched headless browser");
        *slot = Some(BrowserState {
            browser,
            page,
            event_loop,
        });
    }

    match slot.as_mut() {
        Some(state) => Ok(state),
        None => Err(EngineError::fatal("browser state missing after launch")),
    }
}

/// Poll for a selector until it appears or the wait times out.
async fn wait_for_selector(page: &Page, selector: &str) -> Result<Element, EngineError> {
    let deadline = Instant::now() + SELECTOR_TIMEOUT;
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }
        if Instant::now() >= deadline {
            return Err(EngineError::timeout(format!(
                "selector \"{selector}\" not found within {}s",
                SELECTOR_TIMEOUT.as_secs()
            )));
        }
        tokio::time::sleep(SELECTOR_POLL).await;
    }
}

/// Screenshot plus action fields; capture failures degrade to fields only.
async fn action_evidence(page: &Page, mut fields: serde_json::Value) -> serde_json::Value {
    if let Some(encoded) = capture(page).await {
        if let Some(map) = fields.as_object_mut() {
            map.insert("screenshot_base64".into(), json!(encoded));
        }
    }
    fields
}

async fn capture(page: &Page) -> Option<String> {
    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .build();
    let bytes = page.screenshot(params).await.ok()?;
    Some(base64::engine::general_purpose::STANDARD.encode(bytes))
}
