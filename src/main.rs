//! # Awful Feed News
//!
//! An RSS/Atom ingest pipeline that collects recent articles from a registry
//! of portals, company blogs, social accounts and regional media outlets,
//! deduplicates them against a rolling JSON archive, and optionally rewrites
//! long summaries through an OpenAI-compatible LLM API.
//!
//! ## Usage
//!
//! ```sh
//! awful_feed_news --store data/articles.json --digest-dir ./digest
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: each source's feed is downloaded, primary URL first and
//!    fallback URL if the primary yields nothing
//! 2. **Extraction**: RSS 2.0 and Atom entries are normalized into articles
//!    dated within the trailing window (UTC+8 calendar)
//! 3. **Summarization**: new articles only, one call at a time
//! 4. **Merge**: URL dedup against the archive, 30-day retention, newest first
//! 5. **Output**: archive rewritten atomically, optional daily digest

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod error;
mod feeds;
mod merge;
mod models;
mod outputs;
mod pipeline;
mod sources;
mod summarize;
mod utils;

use api::ChatCompletionsClient;
use cli::Cli;
use feeds::HttpFetcher;
use pipeline::{PipelineConfig, RunReport, run_pipeline};
use summarize::{LlmSummarizer, PassThrough};
use utils::{ReferenceClock, ensure_writable_dir};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("feed_update starting up");

    let args = Cli::parse();
    debug!(
        store = %args.store.display(),
        sources = ?args.sources,
        digest_dir = ?args.digest_dir,
        window_days = args.window_days,
        retention_days = args.retention_days,
        summarizer = args.llm_api_key.is_some(),
        "Parsed CLI arguments"
    );

    // Fail before any network work if the archive cannot be written.
    let store_dir = args
        .store
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if let Err(e) = ensure_writable_dir(store_dir).await {
        error!(
            path = %store_dir.display(),
            error = %e,
            "Archive directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let registry = match &args.sources {
        Some(path) => sources::load_sources(path)?,
        None => sources::default_sources(),
    };
    info!(count = registry.len(), "Source registry ready");

    let timeout = Duration::from_secs(args.timeout_secs);
    let fetcher = HttpFetcher::new(timeout)?;
    let clock = ReferenceClock::system();
    let config = PipelineConfig {
        store_path: args.store.clone(),
        digest_dir: args.digest_dir.clone(),
        window_days: args.window_days,
        retention_days: args.retention_days,
    };

    let report = match args.llm_api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            let client = ChatCompletionsClient::new(
                &args.llm_base_url,
                key,
                &args.llm_model,
                args.llm_max_tokens,
                timeout,
            )?;
            info!(endpoint = %client.endpoint(), model = %args.llm_model, "Summarizer enabled");
            let summarizer = LlmSummarizer::new(client);
            run_pipeline(&config, clock, &registry, &fetcher, &summarizer).await
        }
        None => {
            info!("No summarizer API key; keeping feed summaries");
            run_pipeline(&config, clock, &registry, &fetcher, &PassThrough).await
        }
    };

    let report: RunReport = match report {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            return Err(e.into());
        }
    };

    info!(
        sources = report.sources_attempted,
        sources_with_results = report.sources_with_results,
        fallbacks = report.fallbacks_used,
        fetched = report.fetched,
        new = report.new,
        retained = report.retained,
        expired = report.expired,
        total = report.total,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "feed_update finished"
    );
    Ok(())
}
