// src/crawl/engine.rs
// =============================================================================
// Breadth-first, level-by-level crawl engine.
//
// How it works:
// 1. The frontier starts with the seed URL at depth 0
// 2. The whole frontier is drained into one batch (a "level")
// 3. Every page in the batch is fetched concurrently, a few at a time
// 4. Each finished page adds its text to the result, and its in-scope,
//    never-seen links go into the next level at depth + 1
// 5. Once every fetch of the level is done, repeat until nothing is left
//
// Guarantees:
// - A URL is fetched at most once. It is claimed in the visited set before
//   its fetch starts, so two parents in the same level can't both fetch it
// - Nothing deeper than max_depth is fetched, so the crawl always ends
// - Level d+1 never starts before every fetch of level d has finished
//
// A page that fails to load is logged and counted; the rest of the level
// carries on without it.
// =============================================================================

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::scope::ScopeFilter;
use crate::config::CrawlConfig;
use crate::error::{CrawlError, FetchError};
use crate::render::{PageContent, PageRenderer};

/// A URL waiting to be fetched, tagged with how many hops it is from the seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: usize,
}

/// Counters describing what happened during a crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub skipped_visited: usize,
    pub skipped_depth: usize,
    pub levels: usize,
    pub cancelled: bool,
    pub failed_urls: Vec<String>,
}

/// Everything a crawl collected.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    /// Text of every fetched page, one page per line, in completion order.
    pub text: String,
    /// Every in-scope link discovered, without duplicates, in discovery order.
    pub links: Vec<String>,
    pub stats: CrawlStats,
}

// Mutable state of one crawl. Only the driving task touches it.
#[derive(Default)]
struct CrawlState {
    visited: HashSet<String>,
    discovered: HashSet<String>,
    result: CrawlResult,
}

pub struct CrawlEngine<R> {
    renderer: R,
    scope: ScopeFilter,
    config: CrawlConfig,
}

impl<R: PageRenderer> CrawlEngine<R> {
    /// Takes ownership of the renderer for the lifetime of the engine.
    pub fn new(renderer: R, scope: ScopeFilter, config: CrawlConfig) -> Self {
        Self {
            renderer,
            scope,
            config,
        }
    }

    pub fn scope(&self) -> &ScopeFilter {
        &self.scope
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawls from `seed_url` down to `config.max_depth`.
    ///
    /// Only configuration problems are returned as errors; pages that fail
    /// to load are recorded in `CrawlResult::stats`.
    pub async fn crawl(&self, seed_url: &str) -> Result<CrawlResult, CrawlError> {
        self.crawl_with_cancellation(seed_url, CancellationToken::new())
            .await
    }

    /// Like [`crawl`](Self::crawl), but stops at the next level boundary once
    /// `cancel` fires or the configured crawl timeout has passed. The pages
    /// collected so far are returned with `stats.cancelled` set.
    pub async fn crawl_with_cancellation(
        &self,
        seed_url: &str,
        cancel: CancellationToken,
    ) -> Result<CrawlResult, CrawlError> {
        let seed = self.validate(seed_url)?;
        let deadline = self.config.crawl_timeout.map(|timeout| Instant::now() + timeout);

        info!(
            seed = %seed,
            domain = self.scope.domain(),
            max_depth = self.config.max_depth,
            concurrency = self.config.concurrency,
            "starting crawl"
        );

        let mut state = CrawlState::default();
        let mut frontier = vec![FrontierEntry {
            url: seed,
            depth: 0,
        }];

        while !frontier.is_empty() {
            if cancel.is_cancelled() {
                warn!(pending = frontier.len(), "crawl cancelled");
                state.result.stats.cancelled = true;
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(pending = frontier.len(), "crawl timeout reached");
                state.result.stats.cancelled = true;
                break;
            }

            let batch = std::mem::take(&mut frontier);
            frontier = self.process_level(batch, &mut state).await;
        }

        let stats = &state.result.stats;
        info!(
            pages = stats.pages_fetched,
            failures = stats.fetch_failures,
            links = state.result.links.len(),
            levels = stats.levels,
            "crawl finished"
        );

        Ok(state.result)
    }

    fn validate(&self, seed_url: &str) -> Result<String, CrawlError> {
        self.config.validate()?;

        if self.scope.domain().is_empty() {
            return Err(CrawlError::EmptyDomain);
        }

        let seed = seed_url.trim();
        if seed.is_empty() {
            return Err(CrawlError::EmptySeed);
        }

        let parsed = Url::parse(seed).map_err(|e| CrawlError::InvalidSeed {
            url: seed.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.host_str().is_none() {
            return Err(CrawlError::InvalidSeed {
                url: seed.to_string(),
                reason: "URL has no host".to_string(),
            });
        }

        Ok(seed.to_string())
    }

    // Fetches one level and returns the entries for the next one
    async fn process_level(
        &self,
        batch: Vec<FrontierEntry>,
        state: &mut CrawlState,
    ) -> Vec<FrontierEntry> {
        // Claim every URL before any fetch of this level starts
        let mut claimed = Vec::with_capacity(batch.len());
        for entry in batch {
            let key = dedup_key(&entry.url);
            if state.visited.contains(key) {
                debug!(url = %entry.url, "already visited, skipping");
                state.result.stats.skipped_visited += 1;
            } else if entry.depth > self.config.max_depth {
                state.result.stats.skipped_depth += 1;
            } else {
                state.visited.insert(key.to_string());
                claimed.push(entry);
            }
        }

        if claimed.is_empty() {
            return Vec::new();
        }

        state.result.stats.levels += 1;
        debug!(depth = claimed[0].depth, pages = claimed.len(), "processing level");

        let fetches = claimed.into_iter().map(|entry| async move {
            let outcome = self.fetch(&entry.url).await;
            (entry, outcome)
        });
        let mut completed = stream::iter(fetches).buffer_unordered(self.config.concurrency);

        let mut next_level = Vec::new();
        while let Some((entry, outcome)) = completed.next().await {
            match outcome {
                Ok(page) => self.merge_page(&entry, page, state, &mut next_level),
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "failed to fetch page");
                    state.result.stats.fetch_failures += 1;
                    state.result.stats.failed_urls.push(entry.url);
                }
            }
        }

        next_level
    }

    async fn fetch(&self, url: &str) -> Result<PageContent, FetchError> {
        let timeout = self.config.fetch_timeout;
        match tokio::time::timeout(timeout, self.renderer.fetch_page(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        }
    }

    fn merge_page(
        &self,
        entry: &FrontierEntry,
        page: PageContent,
        state: &mut CrawlState,
        next_level: &mut Vec<FrontierEntry>,
    ) {
        let result = &mut state.result;
        result.stats.pages_fetched += 1;

        if !page.text.is_empty() {
            if !result.text.is_empty() {
                result.text.push('\n');
            }
            result.text.push_str(&page.text);
        }

        let mut found = 0;
        for link in page.links {
            if !self.scope.is_in_scope(&link) {
                continue;
            }

            // `discovered` covers both earlier pages and repeats on this page
            let key = dedup_key(&link);
            if state.visited.contains(key) || !state.discovered.insert(key.to_string()) {
                continue;
            }

            result.links.push(link.clone());
            next_level.push(FrontierEntry {
                url: link,
                depth: entry.depth + 1,
            });
            found += 1;
        }

        debug!(url = %entry.url, depth = entry.depth, new_links = found, "merged page");
    }
}

// "https://example.com/about/" and "https://example.com/about" are one page
fn dedup_key(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum FetchEvent {
        Started(String),
        Finished(String),
    }

    // Serves canned pages and records every fetch
    #[derive(Default)]
    struct ScriptedRenderer {
        pages: HashMap<String, PageContent>,
        delays: HashMap<String, Duration>,
        calls: Mutex<Vec<String>>,
        events: Mutex<Vec<FetchEvent>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedRenderer {
        fn new() -> Self {
            Self::default()
        }

        fn page(mut self, url: &str, text: &str, links: &[&str]) -> Self {
            self.pages.insert(
                url.to_string(),
                PageContent {
                    text: text.to_string(),
                    links: links.iter().map(|l| l.to_string()).collect(),
                },
            );
            self
        }

        fn delay(mut self, url: &str, delay: Duration) -> Self {
            self.delays.insert(url.to_string(), delay);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn position(&self, event: FetchEvent) -> usize {
            let events = self.events.lock().unwrap();
            events
                .iter()
                .position(|e| *e == event)
                .unwrap_or_else(|| panic!("{event:?} not in {events:?}"))
        }
    }

    #[async_trait]
    impl PageRenderer for ScriptedRenderer {
        async fn fetch_page(&self, url: &str) -> Result<PageContent, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.events
                .lock()
                .unwrap()
                .push(FetchEvent::Started(url.to_string()));

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delays.get(url) {
                tokio::time::sleep(*delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.events
                .lock()
                .unwrap()
                .push(FetchEvent::Finished(url.to_string()));
            self.pages.get(url).cloned().ok_or(FetchError::Status(404))
        }
    }

    fn engine(renderer: ScriptedRenderer, max_depth: usize) -> CrawlEngine<ScriptedRenderer> {
        CrawlEngine::new(
            renderer,
            ScopeFilter::new("example.com"),
            CrawlConfig::default().with_max_depth(max_depth),
        )
    }

    fn assert_fetched_once(calls: &[String]) {
        let unique: HashSet<&String> = calls.iter().collect();
        assert_eq!(unique.len(), calls.len(), "duplicate fetch in {calls:?}");
    }

    #[tokio::test]
    async fn test_seed_page_and_one_level() {
        let renderer = ScriptedRenderer::new()
            .page(
                "https://example.com/",
                "Hello Example",
                &[
                    "https://example.com/about",
                    "https://example.com/report.pdf",
                    "https://other.com/",
                ],
            )
            .page("https://example.com/about", "About Example", &[]);
        let engine = engine(renderer, 1);

        let result = engine.crawl("https://example.com/").await.unwrap();

        assert!(result.text.contains("Hello Example"));
        assert!(result.text.contains("About Example"));
        assert_eq!(result.links, vec!["https://example.com/about"]);
        assert_eq!(engine.renderer.calls().len(), 2);
        assert_eq!(result.stats.pages_fetched, 2);
        assert_eq!(result.stats.levels, 2);
    }

    #[tokio::test]
    async fn test_self_link_is_not_refetched() {
        let renderer = ScriptedRenderer::new().page(
            "https://example.com/",
            "Home",
            &["https://example.com/"],
        );
        let engine = engine(renderer, 3);

        let result = engine.crawl("https://example.com/").await.unwrap();

        assert_eq!(engine.renderer.calls(), vec!["https://example.com/"]);
        assert!(result.links.is_empty());
    }

    #[tokio::test]
    async fn test_depth_zero_fetches_only_the_seed() {
        let renderer = ScriptedRenderer::new()
            .page(
                "https://example.com/",
                "Home",
                &["https://example.com/a", "https://example.com/b"],
            )
            .page("https://example.com/a", "A", &[])
            .page("https://example.com/b", "B", &[]);
        let engine = engine(renderer, 0);

        let result = engine.crawl("https://example.com/").await.unwrap();

        assert_eq!(engine.renderer.calls(), vec!["https://example.com/"]);
        assert_eq!(result.text, "Home");
        // Links on the last level are still reported, just never fetched
        assert_eq!(result.links.len(), 2);
        assert_eq!(result.stats.skipped_depth, 2);
    }

    #[tokio::test]
    async fn test_shared_link_in_one_level_is_fetched_once() {
        let renderer = ScriptedRenderer::new()
            .page(
                "https://example.com/",
                "Home",
                &["https://example.com/a", "https://example.com/b"],
            )
            .page("https://example.com/a", "A", &["https://example.com/shared"])
            .page("https://example.com/b", "B", &["https://example.com/shared"])
            .page("https://example.com/shared", "Shared", &[]);
        let engine = engine(renderer, 2);

        let result = engine.crawl("https://example.com/").await.unwrap();

        let calls = engine.renderer.calls();
        assert_eq!(calls.len(), 4);
        assert_fetched_once(&calls);
        assert_eq!(result.text.matches("Shared").count(), 1);
        assert_eq!(
            result.links.iter().filter(|l| l.ends_with("/shared")).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_cycles_terminate() {
        let renderer = ScriptedRenderer::new()
            .page("https://example.com/", "Home", &["https://example.com/a"])
            .page("https://example.com/a", "A", &["https://example.com/b"])
            .page("https://example.com/b", "B", &["https://example.com/", "https://example.com/a"]);
        let engine = engine(renderer, 50);

        let result = engine.crawl("https://example.com/").await.unwrap();

        let calls = engine.renderer.calls();
        assert_eq!(calls.len(), 3);
        assert_fetched_once(&calls);
        assert_eq!(result.stats.levels, 3);
    }

    #[tokio::test]
    async fn test_trailing_slash_variants_are_one_page() {
        let renderer = ScriptedRenderer::new()
            .page(
                "https://example.com/",
                "Home",
                &[
                    "https://example.com",
                    "https://example.com/about/",
                    "https://example.com/about",
                ],
            )
            .page("https://example.com/about/", "About", &["https://example.com/about"]);
        let engine = engine(renderer, 2);

        let result = engine.crawl("https://example.com/").await.unwrap();

        assert_eq!(result.links, vec!["https://example.com/about/"]);
        assert_eq!(
            engine.renderer.calls(),
            vec!["https://example.com/", "https://example.com/about/"]
        );
    }

    #[tokio::test]
    async fn test_every_reported_link_is_in_scope() {
        let renderer = ScriptedRenderer::new()
            .page(
                "https://example.com/",
                "Home",
                &[
                    "https://www.example.com/pricing",
                    "https://example.com/a/b/c",
                    "https://example.com/#top",
                    "mailto:hi@example.com",
                    "https://example.com/logo.svg",
                    "https://example.com/blog/post",
                ],
            )
            .page("https://www.example.com/pricing", "Pricing", &[])
            .page("https://example.com/blog/post", "Post", &[]);
        let engine = engine(renderer, 1);

        let result = engine.crawl("https://example.com/").await.unwrap();

        assert_eq!(
            result.links,
            vec!["https://www.example.com/pricing", "https://example.com/blog/post"]
        );
        assert!(result.links.iter().all(|l| engine.scope().is_in_scope(l)));
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_stop_siblings() {
        let renderer = ScriptedRenderer::new()
            .page(
                "https://example.com/",
                "Home",
                &["https://example.com/missing", "https://example.com/ok"],
            )
            .page("https://example.com/ok", "Still here", &[]);
        let engine = engine(renderer, 1);

        let result = engine.crawl("https://example.com/").await.unwrap();

        assert!(result.text.contains("Still here"));
        assert_eq!(result.stats.pages_fetched, 2);
        assert_eq!(result.stats.fetch_failures, 1);
        assert_eq!(result.stats.failed_urls, vec!["https://example.com/missing"]);
    }

    #[tokio::test]
    async fn test_slow_page_times_out() {
        let renderer = ScriptedRenderer::new()
            .page(
                "https://example.com/",
                "Home",
                &["https://example.com/slow", "https://example.com/fast"],
            )
            .page("https://example.com/slow", "Slow", &[])
            .page("https://example.com/fast", "Fast", &[])
            .delay("https://example.com/slow", Duration::from_secs(5));
        let engine = CrawlEngine::new(
            renderer,
            ScopeFilter::new("example.com"),
            CrawlConfig::default()
                .with_max_depth(1)
                .with_fetch_timeout(Duration::from_millis(100)),
        );

        let result = engine.crawl("https://example.com/").await.unwrap();

        assert!(result.text.contains("Fast"));
        assert!(!result.text.contains("Slow"));
        assert_eq!(result.stats.failed_urls, vec!["https://example.com/slow"]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let children: Vec<String> = (0..6).map(|i| format!("https://example.com/p{i}")).collect();
        let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();

        let mut renderer = ScriptedRenderer::new().page("https://example.com/", "Home", &child_refs);
        for child in &children {
            renderer = renderer
                .page(child, "Child", &[])
                .delay(child, Duration::from_millis(20));
        }
        let engine = CrawlEngine::new(
            renderer,
            ScopeFilter::new("example.com"),
            CrawlConfig::default().with_max_depth(1).with_concurrency(2),
        );

        let result = engine.crawl("https://example.com/").await.unwrap();

        assert_eq!(result.stats.pages_fetched, 7);
        // Reaches the limit but never goes past it
        assert_eq!(engine.renderer.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_next_level_waits_for_slow_sibling() {
        let renderer = ScriptedRenderer::new()
            .page(
                "https://example.com/",
                "Home",
                &["https://example.com/a", "https://example.com/b"],
            )
            .page("https://example.com/a", "A", &[])
            .page("https://example.com/b", "B", &["https://example.com/c"])
            .page("https://example.com/c", "C", &[])
            .delay("https://example.com/a", Duration::from_millis(100));
        let engine = engine(renderer, 2);

        let result = engine.crawl("https://example.com/").await.unwrap();
        assert_eq!(result.stats.pages_fetched, 4);

        let renderer = &engine.renderer;
        let slow_done = renderer.position(FetchEvent::Finished("https://example.com/a".into()));
        let fast_done = renderer.position(FetchEvent::Finished("https://example.com/b".into()));
        let next_start = renderer.position(FetchEvent::Started("https://example.com/c".into()));

        // /b finishes first, yet /c has to wait for /a
        assert!(fast_done < slow_done);
        assert!(next_start > slow_done);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let renderer = ScriptedRenderer::new().page("https://example.com/", "Home", &[]);
        let engine = engine(renderer, 2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = engine
            .crawl_with_cancellation("https://example.com/", cancel)
            .await
            .unwrap();

        assert!(result.stats.cancelled);
        assert!(result.text.is_empty());
        assert!(engine.renderer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_crawl_timeout_stops_at_level_boundary() {
        let renderer = ScriptedRenderer::new()
            .page("https://example.com/", "Home", &["https://example.com/next"])
            .page("https://example.com/next", "Next", &[])
            .delay("https://example.com/", Duration::from_millis(150));
        let engine = CrawlEngine::new(
            renderer,
            ScopeFilter::new("example.com"),
            CrawlConfig::default()
                .with_max_depth(2)
                .with_crawl_timeout(Some(Duration::from_millis(50))),
        );

        let result = engine.crawl("https://example.com/").await.unwrap();

        assert!(result.stats.cancelled);
        assert_eq!(result.text, "Home");
        assert_eq!(engine.renderer.calls(), vec!["https://example.com/"]);
    }

    #[tokio::test]
    async fn test_configuration_errors() {
        let engine = engine(ScriptedRenderer::new(), 1);
        assert_eq!(engine.crawl("   ").await.unwrap_err(), CrawlError::EmptySeed);
        assert!(matches!(
            engine.crawl("example.com").await.unwrap_err(),
            CrawlError::InvalidSeed { .. }
        ));

        let engine = CrawlEngine::new(
            ScriptedRenderer::new(),
            ScopeFilter::new(""),
            CrawlConfig::default(),
        );
        assert_eq!(
            engine.crawl("https://example.com/").await.unwrap_err(),
            CrawlError::EmptyDomain
        );

        let engine = CrawlEngine::new(
            ScriptedRenderer::new(),
            ScopeFilter::new("example.com"),
            CrawlConfig::default().with_concurrency(0),
        );
        assert_eq!(
            engine.crawl("https://example.com/").await.unwrap_err(),
            CrawlError::ZeroConcurrency
        );
    }

    #[test]
    fn test_dedup_key_strips_one_slash() {
        assert_eq!(dedup_key("https://example.com/"), "https://example.com");
        assert_eq!(dedup_key("https://example.com/a/"), "https://example.com/a");
        assert_eq!(dedup_key("https://example.com/a"), "https://example.com/a");
    }
}
