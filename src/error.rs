// src/error.rs
// =============================================================================
// Error types for the crawler.
//
// Two families:
// - CrawlError: the crawl cannot start (bad seed, bad configuration).
//   These are the only errors that abort a whole crawl.
// - FetchError: one page could not be loaded. The engine logs it, counts it,
//   and moves on with the rest of the level.
// =============================================================================

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    #[error("seed URL is empty")]
    EmptySeed,

    #[error("invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("target domain is empty")]
    EmptyDomain,

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("fetch timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("could not resolve hostname: {0}")]
    Dns(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("request failed: {0}")]
    Http(String),

    #[error("response larger than {max} bytes")]
    ContentTooLarge { max: usize },

    #[error("could not extract page content: {0}")]
    Render(String),
}
