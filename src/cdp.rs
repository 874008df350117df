//! Chrome DevTools Protocol backend
//!
//! `CdpPage` launches a headless Chrome, drives a single tab and exposes the
//! three things a capture needs from a live page: its geometry, scrolling,
//! and a grab of the visible viewport. It is synchronous; `async_api` runs it
//! on a worker thread.

use crate::host::{GrabError, ProbeError};
use crate::{Error, PageDimensions, Result, Viewport};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/// Page geometry, serialized so the CDP value comes back as one string
const PROBE_SCRIPT: &str = r#"(function() {
    const de = document.documentElement;
    const body = document.body || de;
    const totalHeight = Math.max(de.scrollHeight, body.scrollHeight,
        de.offsetHeight, body.offsetHeight, de.clientHeight);
    const totalWidth = Math.max(de.scrollWidth, body.scrollWidth,
        de.offsetWidth, body.offsetWidth, de.clientWidth);
    return JSON.stringify({
        totalHeight: totalHeight,
        viewportHeight: window.innerHeight || de.clientHeight,
        viewportWidth: Math.min(totalWidth, window.innerWidth || de.clientWidth)
    });
})()"#;

/// Scroll, then resolve once images inside the new viewport have loaded or
/// failed. `{{OFFSET}}` is substituted before evaluation.
const SCROLL_SCRIPT: &str = r#"new Promise(function(resolve) {
    window.scrollTo({ top: {{OFFSET}}, left: 0, behavior: 'instant' });
    setTimeout(function() {
        const height = window.innerHeight;
        const pending = Array.from(document.images).filter(function(img) {
            const r = img.getBoundingClientRect();
            return r.bottom > 0 && r.top < height && !img.complete;
        });
        let left = pending.length;
        const done = function() { setTimeout(function() { resolve(true); }, 50); };
        if (left === 0) { done(); return; }
        const guard = setTimeout(done, {{IMAGE_WAIT_MS}});
        pending.forEach(function(img) {
            const settle = function() { if (--left === 0) { clearTimeout(guard); done(); } };
            img.addEventListener('load', settle, { once: true });
            img.addEventListener('error', settle, { once: true });
        });
    }, 100);
})"#;

const RESET_SCRIPT: &str = "window.scrollTo({ top: 0, left: 0, behavior: 'instant' }); true";

/// Longest a scroll waits for images in the viewport
const IMAGE_WAIT_MS: u64 = 3000;

/// Navigation settle time after `wait_until_navigated`
const LOAD_SETTLE: Duration = Duration::from_millis(500);

/// A headless Chrome tab driven over CDP
pub struct CdpPage {
    browser: Browser,
    tab: Arc<Tab>,
}

impl CdpPage {
    /// Launch Chrome with a window of `viewport` size and open a tab
    pub fn launch(viewport: Viewport) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((viewport.width, viewport.height)))
            .build()
            .map_err(|e| Error::CdpError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::CdpError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::CdpError(format!("Failed to create tab: {}", e)))?;

        Ok(Self { browser, tab })
    }

    pub fn load_url(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::CdpError(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::CdpError(format!("Wait for navigation failed: {}", e)))?;

        // Let late layout and fonts land before anyone measures the page
        std::thread::sleep(LOAD_SETTLE);
        Ok(())
    }

    pub fn url(&self) -> String {
        self.tab.get_url()
    }

    pub fn probe_dimensions(&self) -> std::result::Result<PageDimensions, ProbeError> {
        let eval = self
            .tab
            .evaluate(PROBE_SCRIPT, false)
            .map_err(|e| ProbeError::Unreachable(e.to_string()))?;
        let dims = dimensions_from_value(eval.value)?;
        debug!("Probed {:?}", dims);
        Ok(dims)
    }

    pub fn scroll_to(&self, offset: u32) -> std::result::Result<(), ProbeError> {
        let script = SCROLL_SCRIPT
            .replace("{{OFFSET}}", &offset.to_string())
            .replace("{{IMAGE_WAIT_MS}}", &IMAGE_WAIT_MS.to_string());
        self.tab
            .evaluate(&script, true)
            .map(|_| ())
            .map_err(|e| ProbeError::Unreachable(e.to_string()))
    }

    pub fn reset_scroll(&self) -> std::result::Result<(), ProbeError> {
        self.tab
            .evaluate(RESET_SCRIPT, false)
            .map(|_| ())
            .map_err(|e| ProbeError::Unreachable(e.to_string()))
    }

    /// PNG of the visible viewport
    pub fn capture_visible(&self) -> std::result::Result<Vec<u8>, GrabError> {
        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| GrabError::classify(e.to_string()))
    }

    pub fn close(self) -> Result<()> {
        // Dropping the browser terminates the Chrome child process
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}

/// Decode the probe result, which arrives either as a JSON string or an object
fn dimensions_from_value(
    value: Option<serde_json::Value>,
) -> std::result::Result<PageDimensions, ProbeError> {
    let value = value.ok_or_else(|| ProbeError::BadResponse("probe returned no value".into()))?;
    let parsed = match value {
        serde_json::Value::String(raw) => serde_json::from_str(&raw),
        other => serde_json::from_value(other),
    };
    parsed.map_err(|e| ProbeError::BadResponse(format!("unexpected probe result: {}", e)))
}
