//! One end-to-end ingest run.
//!
//! load archive → fetch every source → drop already-archived URLs →
//! summarize the rest → merge with retention → write archive → digest.
//!
//! Everything a run depends on (clock, sources, transport, summarizer) is
//! passed in, so the whole flow runs under test with stubs.

use crate::error::StoreError;
use crate::feeds::{Extractor, FeedFetcher, fetch_all};
use crate::merge::{merge_articles, unseen_articles};
use crate::models::SourceDescriptor;
use crate::outputs::{json, markdown};
use crate::summarize::{Summarizer, summarize_new_articles};
use crate::utils::ReferenceClock;
use std::path::PathBuf;
use tracing::{error, info, instrument};

/// Where a run reads and writes, and its date windows.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub store_path: PathBuf,
    pub digest_dir: Option<PathBuf>,
    pub window_days: u32,
    pub retention_days: u32,
}

/// Counters from a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sources_attempted: usize,
    pub sources_with_results: usize,
    pub fallbacks_used: usize,
    /// Articles extracted from all feeds, duplicates included.
    pub fetched: usize,
    /// Articles added to the archive.
    pub new: usize,
    pub retained: usize,
    pub expired: usize,
    /// Articles in the archive after the write.
    pub total: usize,
}

/// Run the pipeline once. Only a failed archive write is an error.
#[instrument(level = "info", skip_all, fields(store = %config.store_path.display(), today = %clock.today()))]
pub async fn run_pipeline<F, S>(
    config: &PipelineConfig,
    clock: ReferenceClock,
    sources: &[SourceDescriptor],
    fetcher: &F,
    summarizer: &S,
) -> Result<RunReport, StoreError>
where
    F: FeedFetcher,
    S: Summarizer,
{
    let existing = json::load_articles(&config.store_path).await;

    let extractor = Extractor::new(clock, config.window_days);
    let window = extractor.window();
    info!(
        sources = sources.len(),
        window_start = %window.start,
        window_end = %window.end,
        "Fetching sources"
    );
    let fetched = fetch_all(fetcher, sources, &extractor).await;
    let fetched_count = fetched.articles.len();

    let mut fresh = unseen_articles(fetched.articles, &existing);
    info!(fetched = fetched_count, new = fresh.len(), "Filtered against archive");
    summarize_new_articles(summarizer, &mut fresh).await;

    let today = clock.today();
    let (merged, merge) = merge_articles(fresh, existing, today, config.retention_days);
    json::write_articles(&config.store_path, &merged).await?;

    if let Some(dir) = &config.digest_dir {
        if let Err(e) = markdown::write_digest(dir, today, &merged).await {
            error!(error = %e, "Failed to write daily digest");
        }
    }

    Ok(RunReport {
        sources_attempted: fetched.sources_attempted,
        sources_with_results: fetched.sources_with_results,
        fallbacks_used: fetched.fallbacks_used,
        fetched: fetched_count,
        new: merge.fresh,
        retained: merge.retained,
        expired: merge.expired,
        total: merged.len(),
    })
}
