//! Daily Markdown digest of the articles dated today.
//!
//! ```text
//! digest_dir/
//! └── 2025-05-06.md
//! ```
//!
//! The digest is rewritten on every run so it always reflects the archive.

use crate::error::StoreError;
use crate::models::Article;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Render today's articles grouped by source name, sources in alphabetical
/// order and articles in archive order within each source.
pub fn render_digest(today: NaiveDate, articles: &[Article]) -> String {
    let mut by_source: BTreeMap<&str, Vec<&Article>> = BTreeMap::new();
    for article in articles.iter().filter(|a| a.date == today) {
        by_source
            .entry(article.source_name.as_str())
            .or_default()
            .push(article);
    }
    let count: usize = by_source.values().map(Vec::len).sum();

    let mut md = String::new();
    let _ = writeln!(md, "# News digest for {today}\n");
    let _ = writeln!(
        md,
        "{count} article{} from {} source{}.",
        if count == 1 { "" } else { "s" },
        by_source.len(),
        if by_source.len() == 1 { "" } else { "s" },
    );

    for (source, items) in by_source {
        let _ = writeln!(md, "\n## {source}\n");
        for a in items {
            let title = escape_link_text(&a.title);
            if a.summary.is_empty() || a.summary == a.title {
                let _ = writeln!(md, "- [{title}]({})", a.url);
            } else {
                let _ = writeln!(md, "- [{title}]({}) — {}", a.url, a.summary);
            }
        }
    }
    md
}

fn escape_link_text(title: &str) -> String {
    title.replace('[', "\\[").replace(']', "\\]")
}

/// Write `{dir}/{today}.md`, returning its path.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %today))]
pub async fn write_digest(
    dir: &Path,
    today: NaiveDate,
    articles: &[Article],
) -> Result<PathBuf, StoreError> {
    let path = dir.join(format!("{today}.md"));
    fs::create_dir_all(dir).await.map_err(|e| StoreError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;
    fs::write(&path, render_digest(today, articles))
        .await
        .map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
    info!(path = %path.display(), "Wrote daily digest");
    Ok(path)
}
