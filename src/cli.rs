//! Command-line interface definitions for Awful Feed News.
//!
//! Every option can also be set through the environment variable shown in
//! `--help`, which is how scheduled runs are usually configured.

use crate::feeds::extract::DEFAULT_WINDOW_DAYS;
use crate::merge::DEFAULT_RETENTION_DAYS;
use clap::Parser;
use std::path::PathBuf;

/// Ingest RSS/Atom feeds into a rolling JSON article archive.
///
/// # Examples
///
/// ```sh
/// # Built-in sources, default archive location
/// awful_feed_news
///
/// # Custom registry, daily digest, summaries through an OpenAI-compatible API
/// awful_feed_news --sources sources.yaml --digest-dir ./digest \
///     --llm-api-key "$KEY" --llm-base-url http://localhost:8080/v1
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path of the JSON article archive
    #[arg(short, long, env = "FEED_STORE_PATH", default_value = "data/articles.json")]
    pub store: PathBuf,

    /// YAML source registry replacing the built-in list
    #[arg(long, env = "FEED_SOURCES_FILE")]
    pub sources: Option<PathBuf>,

    /// Directory for the daily Markdown digest (disabled when unset)
    #[arg(short, long, env = "FEED_DIGEST_DIR")]
    pub digest_dir: Option<PathBuf>,

    /// Accept entries dated up to this many days before today (0 = today only)
    #[arg(long, env = "FEED_WINDOW_DAYS", default_value_t = DEFAULT_WINDOW_DAYS)]
    pub window_days: u32,

    /// Drop articles, archived or new, older than this many days
    #[arg(long, env = "FEED_RETENTION_DAYS", default_value_t = DEFAULT_RETENTION_DAYS)]
    pub retention_days: u32,

    /// Per-request timeout in seconds for feeds and the summarizer
    #[arg(long, env = "FEED_TIMEOUT_SECS", default_value_t = 15)]
    pub timeout_secs: u64,

    /// API key for the summarizer; summaries are left as-is when unset
    #[arg(long, env = "SUMMARIZER_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "SUMMARIZER_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub llm_base_url: String,

    /// Model used for summaries
    #[arg(long, env = "SUMMARIZER_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    /// Completion token limit per summary
    #[arg(long, env = "SUMMARIZER_MAX_TOKENS", default_value_t = 200)]
    pub llm_max_tokens: u32,
}
