// src/config.rs
// =============================================================================
// Crawl and renderer settings.
//
// The CLI fills these in from flags; tests build them directly with the
// with_* helpers. Everything has a sensible default so callers only set what
// they care about.
// =============================================================================

use std::time::Duration;

use crate::error::CrawlError;

/// Settings that drive the crawl engine.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Deepest level that is still fetched. The seed is level 0.
    pub max_depth: usize,
    /// Maximum number of fetches in flight within one level.
    pub concurrency: usize,
    /// Upper bound for a single page fetch.
    pub fetch_timeout: Duration,
    /// Optional deadline for the whole crawl, checked between levels.
    pub crawl_timeout: Option<Duration>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            concurrency: 8,
            fetch_timeout: Duration::from_secs(60),
            crawl_timeout: None,
        }
    }
}

impl CrawlConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_crawl_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.crawl_timeout = timeout;
        self
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.concurrency == 0 {
            return Err(CrawlError::ZeroConcurrency);
        }
        if self.fetch_timeout.is_zero() {
            return Err(CrawlError::ZeroTimeout);
        }
        if matches!(self.crawl_timeout, Some(t) if t.is_zero()) {
            return Err(CrawlError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Settings for the HTTP page renderer.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Larger responses are rejected instead of being read into memory.
    pub max_body_bytes: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("keyword-crawl/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(60),
            max_redirects: 5,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl RendererConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}
