//! The JSON article archive.
//!
//! The archive is a single pretty-printed JSON array of
//! [`Article`](crate::models::Article)s, newest first:
//!
//! ```text
//! data/
//! └── articles.json
//! ```
//!
//! It is read once at start-up and replaced wholesale at the end of a run.
//! Writes go to a sibling `.tmp` file that is then renamed over the archive,
//! so an interrupted run leaves the previous archive intact.

use crate::error::StoreError;
use crate::models::Article;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read the archive.
///
/// A missing file is a first run; an unreadable or malformed one is logged
/// and treated as empty. Neither is an error.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_articles(path: &Path) -> Vec<Article> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No archive yet; starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, "Archive unreadable; starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Article>>(&raw) {
        Ok(articles) => {
            info!(count = articles.len(), "Loaded archive");
            articles
        }
        Err(e) => {
            warn!(error = %e, "Archive is not a valid article list; starting empty");
            Vec::new()
        }
    }
}

/// Replace the archive with `articles`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = articles.len()))]
pub async fn write_articles(path: &Path, articles: &[Article]) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(articles)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| io_error(dir, e))?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, json).await.map_err(|e| io_error(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_error(path, e));
    }

    info!("Wrote archive");
    Ok(())
}
