// src/render/mod.rs
// =============================================================================
// Page rendering: turning a URL into its text and its outgoing links.
//
// The crawl engine only knows about the PageRenderer trait. The renderer is
// built by the caller and handed to the engine, which keeps it for the whole
// crawl, so one HTTP client (or browser session) serves every fetch.
//
// Submodules:
// - http: HttpRenderer, fetches pages with reqwest
// - html: text and link extraction with scraper
// - chromium: ChromiumRenderer, renders pages in headless Chromium
//   (behind the `chromium` cargo feature)
// =============================================================================

#[cfg(feature = "chromium")]
mod chromium;
mod html;
mod http;

use async_trait::async_trait;

use crate::error::FetchError;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumRenderer;
pub use http::HttpRenderer;

/// What a renderer returns for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    /// Visible text of the page body.
    pub text: String,
    /// Every hyperlink target found on the page, as absolute URLs.
    pub links: Vec<String>,
}

/// Loads a page and extracts its text and links.
///
/// Implementations must be safe to call concurrently: the engine issues
/// several fetches at once within a level.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<PageContent, FetchError>;
}
