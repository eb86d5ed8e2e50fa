// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - Breadth-first crawling, one depth level at a time
// - Concurrent fetches within a level, bounded by the configured concurrency
// - Same-site restriction through the scope filter
// - Configurable depth limit, per-page timeout and optional crawl timeout
//
// Submodules:
// - engine: the frontier, the visited set and the level loop
// - scope: the in-scope link filter
// =============================================================================

mod engine;
mod scope;

pub use engine::{CrawlEngine, CrawlResult, CrawlStats};
pub use scope::ScopeFilter;
