// src/report.rs
// =============================================================================
// Turns a finished crawl into something a person (or a script) can read.
//
// Two output formats:
// - a short human-readable summary (default)
// - JSON (--json), handy for CI pipelines and scripts
// =============================================================================

use anyhow::Result;
use serde::Serialize;

use crate::crawl::{CrawlResult, CrawlStats};
use crate::keyword::count_occurrences;

/// The outcome of one crawl, as printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub seed_url: String,
    pub domain: String,
    pub keyword: String,
    pub max_depth: usize,
    /// Case-insensitive occurrences of `keyword` across every fetched page.
    pub occurrences: usize,
    pub links: Vec<String>,
    #[serde(flatten)]
    pub stats: CrawlStats,
}

impl CrawlReport {
    /// Counts the keyword in the crawled text and keeps what's worth printing.
    pub fn new(
        seed_url: &str,
        domain: &str,
        keyword: &str,
        max_depth: usize,
        result: CrawlResult,
    ) -> Self {
        let occurrences = count_occurrences(&result.text, keyword);

        Self {
            seed_url: seed_url.to_string(),
            domain: domain.to_string(),
            keyword: keyword.to_string(),
            max_depth,
            occurrences,
            links: result.links,
            stats: result.stats,
        }
    }
}

// Prints the report either as a summary or as JSON
pub fn print_report(report: &CrawlReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", format_summary(report));
    }
    Ok(())
}

fn format_summary(report: &CrawlReport) -> String {
    let stats = &report.stats;
    let mut out = String::new();

    out.push_str(&format!(
        "Found {} instances of '{}' in the body of the page\n\n",
        report.occurrences, report.keyword
    ));

    out.push_str("📊 Summary:\n");
    out.push_str(&format!("   📄 Pages crawled: {}\n", stats.pages_fetched));
    out.push_str(&format!("   🔗 In-scope links: {}\n", report.links.len()));
    out.push_str(&format!("   ❌ Failed: {}\n", stats.fetch_failures));
    for url in &stats.failed_urls {
        out.push_str(&format!("      - {}\n", url));
    }
    if stats.cancelled {
        out.push_str("   ⏹️  Crawl stopped early, results are partial\n");
    }

    out
}
