// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API: the struct below *is* the CLI. Each field becomes
// a flag, doc comments become the --help text, and clap does the parsing and
// validation (a negative --depth is rejected before we ever see it).
// =============================================================================

use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::config::{CrawlConfig, RendererConfig};

pub const DEFAULT_URL: &str = "https://www.kayako.com/";
pub const DEFAULT_KEYWORD: &str = "kayako";

/// How pages are loaded.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererKind {
    /// Plain HTTP GET + HTML parsing (fast, no JavaScript)
    Http,
    /// Headless Chromium (needs the `chromium` build feature)
    Chromium,
}

#[derive(Parser, Debug)]
#[command(
    name = "keyword-crawl",
    version,
    about = "Crawl a website and count how often a keyword appears",
    long_about = "keyword-crawl starts at a URL, follows same-site links breadth-first up to a \
                  depth limit, and counts case-insensitive occurrences of a keyword in the text \
                  of every page it visits."
)]
pub struct Cli {
    /// URL to start crawling from
    #[arg(short = 'u', long, default_value = DEFAULT_URL)]
    pub url: String,

    /// How many link hops to follow from the starting page
    ///
    /// Depth 0 = just the starting page
    /// Depth 1 = starting page + the pages it links to
    #[arg(short = 'd', long, default_value_t = 2)]
    pub depth: usize,

    /// Keyword to count (case-insensitive)
    #[arg(short = 'k', long, default_value = DEFAULT_KEYWORD)]
    pub keyword: String,

    /// Only follow links on this domain (default: the starting URL's host without "www.")
    #[arg(long)]
    pub domain: Option<String>,

    /// Maximum number of pages fetched at the same time
    #[arg(short = 'c', long, default_value_t = 8)]
    pub concurrency: usize,

    /// Per-page timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Stop following new levels after this many seconds
    #[arg(long)]
    pub crawl_timeout: Option<u64>,

    /// Page loader to use
    #[arg(long, value_enum, default_value_t = RendererKind::Http)]
    pub renderer: RendererKind,

    /// Skip pages whose body is larger than this many bytes
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub max_page_bytes: usize,

    /// Output results in JSON format instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Show debug logs (RUST_LOG overrides this)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig::default()
            .with_max_depth(self.depth)
            .with_concurrency(self.concurrency)
            .with_fetch_timeout(Duration::from_secs(self.timeout))
            .with_crawl_timeout(self.crawl_timeout.map(Duration::from_secs))
    }

    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig::default()
            .with_timeout(Duration::from_secs(self.timeout))
            .with_max_body_bytes(self.max_page_bytes)
    }
}
