// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (to stderr, so --json output stays clean)
// 3. Build the page renderer (HTTP or Chromium) and the crawl engine
// 4. Crawl, count the keyword, print the report
// 5. Exit with proper code (0 = success, 1 = nothing could be fetched, 2 = error)
// =============================================================================

mod cli;       // src/cli.rs - command-line parsing
mod config;    // src/config.rs - crawl and renderer settings
mod crawl;     // src/crawl/ - crawl engine and scope filter
mod error;     // src/error.rs - error types
mod keyword;   // src/keyword.rs - keyword counting
mod render;    // src/render/ - fetching pages and extracting text/links
mod report;    // src/report.rs - summary and JSON output

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cli::{Cli, RendererKind};
use config::CrawlConfig;
use crawl::{CrawlEngine, ScopeFilter};
use render::{HttpRenderer, PageRenderer};
use report::CrawlReport;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = crawl finished and at least one page was read
//   Ok(1) = crawl ran but no page could be fetched
//   Err   = bad arguments or setup failure (exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let scope = match &cli.domain {
        Some(domain) => ScopeFilter::new(domain),
        None => ScopeFilter::for_seed(&cli.url)
            .ok_or_else(|| anyhow!("cannot determine a domain from '{}', pass --domain", cli.url))?,
    };
    let config = cli.crawl_config();

    // One client (or browser) for the whole crawl, dropped together with the engine
    match cli.renderer {
        RendererKind::Http => {
            let renderer = HttpRenderer::new(&cli.renderer_config())
                .context("failed to set up the HTTP client")?;
            crawl_and_report(&cli, CrawlEngine::new(renderer, scope, config)).await
        }
        RendererKind::Chromium => crawl_with_chromium(&cli, scope, config).await,
    }
}

#[cfg(feature = "chromium")]
async fn crawl_with_chromium(cli: &Cli, scope: ScopeFilter, config: CrawlConfig) -> Result<i32> {
    let renderer = render::ChromiumRenderer::launch(&cli.renderer_config())
        .await
        .context("failed to start Chromium")?;
    crawl_and_report(cli, CrawlEngine::new(renderer, scope, config)).await
}

#[cfg(not(feature = "chromium"))]
async fn crawl_with_chromium(_cli: &Cli, _scope: ScopeFilter, _config: CrawlConfig) -> Result<i32> {
    Err(anyhow!(
        "this build has no Chromium support, rebuild with `--features chromium`"
    ))
}

async fn crawl_and_report<R: PageRenderer>(cli: &Cli, engine: CrawlEngine<R>) -> Result<i32> {
    if !cli.json {
        println!("🔍 Crawling: {}", cli.url);
        println!(
            "📊 Max depth: {}, domain: {}",
            engine.config().max_depth,
            engine.scope().domain()
        );
    }

    // Ctrl-C stops the crawl at the next level boundary
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let result = engine.crawl_with_cancellation(&cli.url, cancel).await?;

    let report = CrawlReport::new(
        &cli.url,
        engine.scope().domain(),
        &cli.keyword,
        engine.config().max_depth,
        result,
    );
    report::print_report(&report, cli.json)?;

    if report.stats.pages_fetched == 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Logs go to stderr. RUST_LOG wins over --verbose when it is set.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keyword_crawl={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
