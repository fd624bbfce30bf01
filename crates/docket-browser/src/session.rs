//! Browsing session lifecycle.
//!
//! One `Session` owns one Chrome process and one page. The court site
//! keeps its own cookie/session state server-side, so the handle is
//! passed explicitly to every operation instead of living in a global.

use crate::actions::SessionActions;
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::Page;
use docket_core::BrowserSettings;
use futures_util::stream::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Polling interval for `wait_for_selector`.
const SELECTOR_POLL_MS: u64 = 250;

/// A live browsing session against the court site.
///
/// Launching spawns an external Chrome process; `close` tears it down
/// and is idempotent. Dropping a session that was never closed aborts
/// the event handler task, which lets chromiumoxide reap the child
/// process.
pub struct Session {
    browser: Mutex<Option<Browser>>,
    handler_task: JoinHandle<()>,
    page: Page,
    navigation_timeout: Duration,
}

impl Session {
    /// Launch a browser and open a blank page.
    ///
    /// # Errors
    /// Returns `BrowserError::Launch` if the chromium binary cannot be
    /// found or the process fails to start.
    pub async fn open(settings: &BrowserSettings) -> Result<Self> {
        let fingerprint = FingerprintConfig::from_settings(settings);

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", fingerprint.user_agent));

        if !settings.headless {
            builder = builder.with_head();
        }

        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // Drive CDP events until the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(BrowserError::cdp)?;

        tracing::info!(
            headless = settings.headless,
            "browser session launched"
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler_task,
            page,
            navigation_timeout: Duration::from_secs(settings.navigation_timeout_secs),
        })
    }

    async fn find_element(&self, selector: &str) -> Result<chromiumoxide::element::Element> {
        self.page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))
    }
}

#[async_trait::async_trait]
impl SessionActions for Session {
    async fn navigate(&self, url: &str) -> Result<()> {
        tracing::debug!(url, "navigating");

        let load = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
            Ok::<_, BrowserError>(())
        };

        tokio::time::timeout(self.navigation_timeout, load)
            .await
            .map_err(|_| BrowserError::Timeout(format!("navigation to {url}")))?
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let element = self.find_element(selector).await?;

        element.click().await.map_err(BrowserError::cdp)?;
        // Clear any stale value before typing.
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(BrowserError::cdp)?;
        element.type_str(value).await.map_err(BrowserError::cdp)?;

        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        // <select> elements don't respond to typing; set the value and
        // fire a change event like a user picking from the dropdown.
        let js = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) return false; \
             el.value = {val}; \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return el.value === {val}; }})()",
            sel = serde_json::to_string(selector).map_err(BrowserError::cdp)?,
            val = serde_json::to_string(value).map_err(BrowserError::cdp)?,
        );

        let selected: bool = self
            .page
            .evaluate(js)
            .await
            .map_err(BrowserError::cdp)?
            .into_value()
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;

        if selected {
            Ok(())
        } else {
            Err(BrowserError::SelectorNotFound(format!(
                "{selector} has no option '{value}'"
            )))
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self.find_element(selector).await?;
        element.click().await.map_err(BrowserError::cdp)?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "waiting for selector {selector}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(SELECTOR_POLL_MS)).await;
        }
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        let element = self.find_element(selector).await?;
        let text = element
            .inner_text()
            .await
            .map_err(BrowserError::cdp)?
            .unwrap_or_default();
        Ok(text.trim().to_string())
    }

    async fn extract_attribute(&self, selector: &str, attribute: &str) -> Result<Option<String>> {
        let element = self.find_element(selector).await?;
        element.attribute(attribute).await.map_err(BrowserError::cdp)
    }

    async fn page_content(&self) -> Result<String> {
        self.page.content().await.map_err(BrowserError::cdp)
    }

    async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>> {
        let element = self.find_element(selector).await?;
        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(BrowserError::cdp)
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("browser close reported: {}", e);
            }
            let _ = browser.wait().await;
            self.handler_task.abort();
            tracing::info!("browser session closed");
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // If close() was never awaited, the browser child is reaped by
        // chromiumoxide when the Browser drops; the handler task must
        // still be stopped here.
        self.handler_task.abort();
    }
}
