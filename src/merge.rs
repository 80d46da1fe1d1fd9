//! Combining freshly fetched articles with the persisted archive.

use crate::models::Article;
use chrono::{Days, NaiveDate};
use itertools::Itertools;
use std::collections::HashSet;
use tracing::info;

/// Articles older than this many days are dropped.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Counts from one merge, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// New articles kept: URL not already archived and inside retention.
    pub fresh: usize,
    /// New articles dropped as duplicates (of the archive or of each other).
    pub duplicates: usize,
    /// Archived articles kept.
    pub retained: usize,
    /// Articles dropped for age, archived or new.
    pub expired: usize,
}

impl MergeReport {
    pub fn total(&self) -> usize {
        self.fresh + self.retained
    }
}

/// First date still inside the retention window.
pub fn retention_cutoff(today: NaiveDate, retention_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(retention_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// URLs of `articles`, for membership checks against new fetches.
pub fn known_urls(articles: &[Article]) -> HashSet<&str> {
    articles.iter().map(|a| a.url.as_str()).collect()
}

/// Drop new articles whose URL is archived or already seen earlier in `new`.
pub fn unseen_articles(new: Vec<Article>, existing: &[Article]) -> Vec<Article> {
    let known = known_urls(existing);
    new.into_iter()
        .filter(|a| !known.contains(a.url.as_str()))
        .unique_by(|a| a.url.clone())
        .collect()
}

/// Merge `new` into `existing`.
///
/// URL is the identity: an archived article always wins over a new one with
/// the same URL, and the first of several new ones wins. Anything dated
/// before `today - retention_days` is dropped, whether archived or new. The
/// result is sorted by date, newest first; the sort is stable so same-day
/// articles keep new-before-archived order.
///
/// # Arguments
///
/// * `new` - Articles from this run, in fetch order
/// * `existing` - The archive as loaded from the store
/// * `today` - The reference date (UTC+8)
/// * `retention_days` - Age limit; the cutoff date itself is kept
///
/// # Returns
///
/// The merged archive and a [`MergeReport`] with the counts behind it.
///
/// # Examples
///
/// ```ignore
/// let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
/// let (merged, report) = merge_articles(fetched, archive, today, DEFAULT_RETENTION_DAYS);
/// assert!(merged.iter().all(|a| a.date >= retention_cutoff(today, DEFAULT_RETENTION_DAYS)));
/// assert_eq!(merged.len(), report.total());
/// ```
pub fn merge_articles(
    new: Vec<Article>,
    existing: Vec<Article>,
    today: NaiveDate,
    retention_days: u32,
) -> (Vec<Article>, MergeReport) {
    let incoming = new.len();
    let unique = unseen_articles(new, &existing);
    let duplicates = incoming - unique.len();

    let cutoff = retention_cutoff(today, retention_days);
    let (fresh, stale): (Vec<Article>, Vec<Article>) =
        unique.into_iter().partition(|a| a.date >= cutoff);
    let archived = existing.len();
    let retained: Vec<Article> = existing.into_iter().filter(|a| a.date >= cutoff).collect();

    let report = MergeReport {
        fresh: fresh.len(),
        duplicates,
        retained: retained.len(),
        expired: archived - retained.len() + stale.len(),
    };

    let mut merged = fresh;
    merged.extend(retained);
    merged.sort_by(|a, b| b.date.cmp(&a.date));

    info!(
        fresh = report.fresh,
        duplicates = report.duplicates,
        retained = report.retained,
        expired = report.expired,
        total = report.total(),
        %cutoff,
        "Merged articles"
    );
    (merged, report)
}
