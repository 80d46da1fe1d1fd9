//! The source registry: built-in defaults or a YAML override file.
//!
//! A registry file is a YAML list using the archive's field names:
//!
//! ```yaml
//! - name: OpenAI News
//!   category: company
//!   language: en
//!   company: OpenAI
//!   url: https://openai.com/news/rss.xml
//!   fallbackUrl: https://rsshub.app/openai/news
//! ```

use crate::error::SourcesError;
use crate::models::{Language, SourceCategory, SourceDescriptor};
use std::fs;
use std::path::Path;
use tracing::{info, instrument};
use url::Url;

/// Feeds ingested when no registry file is given.
pub fn default_sources() -> Vec<SourceDescriptor> {
    use Language::{En, Zh};
    use SourceCategory::{Company, Portal, RegionalMedia, Social};

    vec![
        // Portals
        SourceDescriptor::new(
            "Hacker News",
            Portal,
            En,
            "",
            "https://hnrss.org/frontpage",
            Some("https://news.ycombinator.com/rss"),
        ),
        SourceDescriptor::new(
            "TechCrunch AI",
            Portal,
            En,
            "",
            "https://techcrunch.com/category/artificial-intelligence/feed/",
            None,
        ),
        SourceDescriptor::new(
            "The Verge AI",
            Portal,
            En,
            "",
            "https://www.theverge.com/rss/ai-artificial-intelligence/index.xml",
            None,
        ),
        // Company blogs
        SourceDescriptor::new(
            "OpenAI News",
            Company,
            En,
            "OpenAI",
            "https://openai.com/news/rss.xml",
            Some("https://rsshub.app/openai/news"),
        ),
        SourceDescriptor::new(
            "Google DeepMind Blog",
            Company,
            En,
            "Google DeepMind",
            "https://deepmind.google/blog/rss.xml",
            None,
        ),
        SourceDescriptor::new(
            "Hugging Face Blog",
            Company,
            En,
            "Hugging Face",
            "https://huggingface.co/blog/feed.xml",
            None,
        ),
        SourceDescriptor::new(
            "Microsoft AI Blog",
            Company,
            En,
            "Microsoft",
            "https://blogs.microsoft.com/ai/feed/",
            None,
        ),
        // Social accounts via RSSHub
        SourceDescriptor::new(
            "Sam Altman on X",
            Social,
            En,
            "OpenAI",
            "https://rsshub.app/twitter/user/sama",
            Some("https://rsshub.rssforever.com/twitter/user/sama"),
        ),
        SourceDescriptor::new(
            "Qwen on Weibo",
            Social,
            Zh,
            "Alibaba",
            "https://rsshub.app/weibo/user/7915486893",
            None,
        ),
        // Regional media
        SourceDescriptor::new(
            "36Kr",
            RegionalMedia,
            Zh,
            "",
            "https://36kr.com/feed",
            Some("https://rsshub.app/36kr/newsflashes"),
        ),
        SourceDescriptor::new(
            "机器之心",
            RegionalMedia,
            Zh,
            "",
            "https://www.jiqizhixin.com/rss",
            Some("https://rsshub.app/jiqizhixin/latest"),
        ),
        SourceDescriptor::new(
            "量子位",
            RegionalMedia,
            Zh,
            "",
            "https://www.qbitai.com/feed",
            None,
        ),
    ]
}

/// Parse and validate a YAML registry.
pub fn parse_sources(yaml: &str) -> Result<Vec<SourceDescriptor>, SourcesError> {
    let sources: Vec<SourceDescriptor> = serde_yaml::from_str(yaml)?;
    if sources.is_empty() {
        return Err(SourcesError::Empty);
    }
    for source in &sources {
        let urls = std::iter::once(&source.primary_url).chain(source.fallback_url.as_ref());
        for url in urls {
            Url::parse(url).map_err(|e| SourcesError::InvalidUrl {
                name: source.name.clone(),
                url: url.clone(),
                source: e,
            })?;
        }
    }
    Ok(sources)
}

/// Load the registry from `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_sources(path: &Path) -> Result<Vec<SourceDescriptor>, SourcesError> {
    let yaml = fs::read_to_string(path).map_err(|e| SourcesError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let sources = parse_sources(&yaml)?;
    info!(count = sources.len(), "Loaded source registry");
    Ok(sources)
}
