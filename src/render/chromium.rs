// src/render/chromium.rs
// =============================================================================
// A PageRenderer backed by headless Chromium (only built with `--features chromium`).
//
// How it works:
// 1. One browser is launched up front and owned by the renderer
// 2. Every fetch opens its own tab, navigates, and waits for <body>
// 3. Text is the body's rendered innerText, links are every a[href] as the
//    browser resolved it
// 4. The tab is closed afterwards, even if the fetch is dropped by a timeout
//
// Unlike HttpRenderer this sees content that scripts add after load, at the
// cost of a browser process.
// =============================================================================

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{PageContent, PageRenderer};
use crate::config::RendererConfig;
use crate::error::FetchError;

// Absolute hrefs of every link on the page. `a.href` is already resolved
// against the document's base URL.
const LINKS_SCRIPT: &str = "Array.from(document.querySelectorAll('a[href]'), a => a.href)";

/// Renders pages in a headless Chromium instance.
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launches the browser. Chromium must be installed and discoverable.
    pub async fn launch(config: &RendererConfig) -> Result<Self, FetchError> {
        let browser_config = BrowserConfig::builder()
            .request_timeout(config.timeout)
            .arg(format!("--user-agent={}", config.user_agent))
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| FetchError::Render(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Render(format!("failed to launch Chromium: {e}")))?;

        // The handler drives the CDP connection and must be polled for as
        // long as the browser is in use
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler event failed");
                }
            }
        });

        info!("launched headless Chromium");
        Ok(Self { browser, handler })
    }

    async fn read_page(&self, page: &Page, url: &str) -> Result<PageContent, FetchError> {
        page.goto(url).await.map_err(render_error)?;

        let body = page.find_element("body").await.map_err(render_error)?;
        let text = body
            .inner_text()
            .await
            .map_err(render_error)?
            .unwrap_or_default();

        let links: Vec<String> = page
            .evaluate(LINKS_SCRIPT)
            .await
            .map_err(render_error)?
            .into_value()
            .map_err(|e| FetchError::Render(format!("unexpected link list: {e}")))?;

        Ok(PageContent {
            text: text.split_whitespace().collect::<Vec<_>>().join(" "),
            links: links
                .into_iter()
                .filter(|link| link.starts_with("http://") || link.starts_with("https://"))
                .collect(),
        })
    }
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        // Dropping the Browser kills the Chromium process
        self.handler.abort();
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn fetch_page(&self, url: &str) -> Result<PageContent, FetchError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(render_error)?;
        let _tab = OpenTab(Some(page.clone()));

        let content = self.read_page(&page, url).await?;
        debug!(url, links = content.links.len(), "rendered page in browser");
        Ok(content)
    }
}

// Closes the tab when dropped, on success, error or cancellation alike
struct OpenTab(Option<Page>);

impl Drop for OpenTab {
    fn drop(&mut self) {
        if let Some(page) = self.0.take() {
            tokio::spawn(async move {
                if let Err(e) = page.close().await {
                    debug!(error = %e, "failed to close tab");
                }
            });
        }
    }
}

fn render_error(error: chromiumoxide::error::CdpError) -> FetchError {
    FetchError::Render(error.to_string())
}
