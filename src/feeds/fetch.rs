//! Per-source fetching with a single fallback attempt.

use crate::error::FetchError;
use crate::feeds::extract::Extractor;
use crate::feeds::parser::{ParsedFeed, parse_feed};
use crate::models::{Article, SourceDescriptor};
use futures::stream::{self, StreamExt};
use reqwest::header::ACCEPT;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Sent on every feed request.
pub const USER_AGENT: &str = concat!(
    "awful_feed_news/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/graves/awful_feed_news)"
);

/// Mime types a feed endpoint may answer with.
pub const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml";

/// Retrieves the raw body of a feed URL.
pub trait FeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// [`FeedFetcher`] over a shared `reqwest` client with a request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl FeedFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, FEED_ACCEPT)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched feed body"
        );
        Ok(body)
    }
}

/// Articles obtained for one source.
#[derive(Debug, Default)]
pub struct SourceResult {
    pub articles: Vec<Article>,
    /// The fallback URL was attempted.
    pub used_fallback: bool,
}

/// Articles from a whole registry pass plus per-source counters.
#[derive(Debug, Default)]
pub struct FetchSummary {
    pub articles: Vec<Article>,
    pub sources_attempted: usize,
    pub sources_with_results: usize,
    pub fallbacks_used: usize,
}

async fn fetch_feed<F: FeedFetcher>(fetcher: &F, url: &str) -> Result<ParsedFeed, FetchError> {
    let body = fetcher.fetch(url).await?;
    Ok(parse_feed(&body)?)
}

/// Fetch, parse and extract one URL. Every failure degrades to no articles.
async fn fetch_url<F: FeedFetcher>(
    fetcher: &F,
    url: &str,
    source: &SourceDescriptor,
    extractor: &Extractor,
) -> Vec<Article> {
    match fetch_feed(fetcher, url).await {
        Ok(feed) => {
            let articles = extractor.extract_all(&feed.entries, source);
            debug!(
                %url,
                dialect = ?feed.dialect,
                entries = feed.entries.len(),
                kept = articles.len(),
                "Parsed feed"
            );
            articles
        }
        Err(e) => {
            warn!(%url, source = %source.name, error = %e, "Feed fetch failed");
            Vec::new()
        }
    }
}

/// Try the primary URL, then the fallback if the primary produced nothing.
///
/// # Arguments
///
/// * `fetcher` - Transport used for both attempts
/// * `source` - The source to fetch; its `fallback_url` is optional
/// * `extractor` - Date window and normalization applied to each entry
///
/// # Returns
///
/// The articles of the last URL attempted; results of the two attempts are
/// never combined. Transport errors, non-success statuses and unparseable
/// bodies are logged and count as zero articles, so this never fails.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn fetch_source<F: FeedFetcher>(
    fetcher: &F,
    source: &SourceDescriptor,
    extractor: &Extractor,
) -> SourceResult {
    let articles = fetch_url(fetcher, &source.primary_url, source, extractor).await;
    if !articles.is_empty() {
        info!(count = articles.len(), "Fetched source");
        return SourceResult {
            articles,
            used_fallback: false,
        };
    }

    let Some(fallback) = source.fallback_url.as_deref() else {
        info!("Source yielded no articles in window");
        return SourceResult::default();
    };

    info!(%fallback, "Primary feed yielded nothing; trying fallback");
    let articles = fetch_url(fetcher, fallback, source, extractor).await;
    info!(count = articles.len(), "Fetched source via fallback");
    SourceResult {
        articles,
        used_fallback: true,
    }
}

/// Walk every source in order, one request at a time.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn fetch_all<F: FeedFetcher>(
    fetcher: &F,
    sources: &[SourceDescriptor],
    extractor: &Extractor,
) -> FetchSummary {
    let results: Vec<SourceResult> = stream::iter(sources)
        .then(|source| fetch_source(fetcher, source, extractor))
        .collect()
        .await;

    let mut summary = FetchSummary {
        sources_attempted: sources.len(),
        ..Default::default()
    };
    for result in results {
        if result.used_fallback {
            summary.fallbacks_used += 1;
        }
        if !result.articles.is_empty() {
            summary.sources_with_results += 1;
        }
        summary.articles.extend(result.articles);
    }

    info!(
        articles = summary.articles.len(),
        with_results = summary.sources_with_results,
        fallbacks = summary.fallbacks_used,
        "Fetched all sources"
    );
    summary
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Language, SourceCategory};
    use crate::utils::ReferenceClock;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned responses keyed by URL; unknown URLs answer 404.
    #[derive(Default)]
    pub(crate) struct StubFetcher {
        responses: HashMap<String, Result<String, u16>>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub(crate) fn with(mut self, url: &str, response: Result<&str, u16>) -> Self {
            self.responses
                .insert(url.to_string(), response.map(str::to_string));
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl FeedFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(FetchError::Status(*status)),
                None => Err(FetchError::Status(404)),
            }
        }
    }

    pub(crate) fn rss(items: &[(&str, &str)]) -> String {
        let items: String = items
            .iter()
            .map(|(title, link)| format!("<item><title>{title}</title><link>{link}</link></item>"))
            .collect();
        format!("<rss version=\"2.0\"><channel><title>t</title>{items}</channel></rss>")
    }

    fn extractor() -> Extractor {
        Extractor::new(
            ReferenceClock::fixed(Utc.with_ymd_and_hms(2025, 5, 10, 4, 0, 0).unwrap()),
            7,
        )
    }

    fn source(primary: &str, fallback: Option<&str>) -> SourceDescriptor {
        SourceDescriptor::new(
            "Example",
            SourceCategory::Portal,
            Language::En,
            "",
            primary,
            fallback,
        )
    }

    #[tokio::test]
    async fn test_fallback_after_server_error() {
        let fetcher = StubFetcher::default()
            .with("http://primary", Err(500))
            .with("http://fallback", Ok(&rss(&[("Fallback story", "http://a/1")])));

        let result = fetch_source(
            &fetcher,
            &source("http://primary", Some("http://fallback")),
            &extractor(),
        )
        .await;

        assert!(result.used_fallback);
        assert_eq!(result.articles.len(), 1);
        assert_eq!(result.articles[0].title, "Fallback story");
        assert_eq!(fetcher.calls(), vec!["http://primary", "http://fallback"]);
    }

    #[tokio::test]
    async fn test_fallback_after_empty_primary() {
        let fetcher = StubFetcher::default()
            .with("http://primary", Ok(&rss(&[])))
            .with("http://fallback", Ok(&rss(&[("Story", "http://a/1")])));

        let result = fetch_source(
            &fetcher,
            &source("http://primary", Some("http://fallback")),
            &extractor(),
        )
        .await;

        assert!(result.used_fallback);
        assert_eq!(result.articles.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_after_malformed_primary() {
        let fetcher = StubFetcher::default()
            .with("http://primary", Ok("<html><body>not a feed"))
            .with("http://fallback", Ok(&rss(&[("Story", "http://a/1")])));

        let result = fetch_source(
            &fetcher,
            &source("http://primary", Some("http://fallback")),
            &extractor(),
        )
        .await;

        assert_eq!(result.articles.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_not_tried_when_primary_has_articles() {
        let fetcher = StubFetcher::default()
            .with("http://primary", Ok(&rss(&[("Story", "http://a/1")])))
            .with("http://fallback", Ok(&rss(&[("Other", "http://a/2")])));

        let result = fetch_source(
            &fetcher,
            &source("http://primary", Some("http://fallback")),
            &extractor(),
        )
        .await;

        assert!(!result.used_fallback);
        assert_eq!(result.articles[0].title, "Story");
        assert_eq!(fetcher.calls(), vec!["http://primary"]);
    }

    #[tokio::test]
    async fn test_no_fallback_configured() {
        let fetcher = StubFetcher::default().with("http://primary", Err(503));

        let result = fetch_source(&fetcher, &source("http://primary", None), &extractor()).await;

        assert!(result.articles.is_empty());
        assert!(!result.used_fallback);
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_both_urls_failing_yields_nothing() {
        let fetcher = StubFetcher::default();

        let result = fetch_source(
            &fetcher,
            &source("http://primary", Some("http://fallback")),
            &extractor(),
        )
        .await;

        assert!(result.articles.is_empty());
        assert!(result.used_fallback);
    }

    #[tokio::test]
    async fn test_fetch_all_is_sequential_and_counts() {
        let fetcher = StubFetcher::default()
            .with("http://a", Ok(&rss(&[("A1", "http://a/1"), ("A2", "http://a/2")])))
            .with("http://b", Err(500))
            .with("http://b-alt", Ok(&rss(&[("B1", "http://b/1")])))
            .with("http://c", Ok(&rss(&[])));
        let sources = vec![
            source("http://a", None),
            source("http://b", Some("http://b-alt")),
            source("http://c", None),
        ];

        let summary = fetch_all(&fetcher, &sources, &extractor()).await;

        assert_eq!(summary.sources_attempted, 3);
        assert_eq!(summary.sources_with_results, 2);
        assert_eq!(summary.fallbacks_used, 1);
        let titles: Vec<&str> = summary.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["A1", "A2", "B1"]);
        assert_eq!(
            fetcher.calls(),
            vec!["http://a", "http://b", "http://b-alt", "http://c"]
        );
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new(Duration::from_secs(15)).is_ok());
    }
}
