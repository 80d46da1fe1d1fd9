//! Helpers for reference-timezone dates, text cleanup, ids and file system checks.
//!
//! All "today" and window arithmetic in the crate goes through
//! [`ReferenceClock`] so that article dates, the extraction window and the
//! retention cutoff are computed on the same UTC+8 calendar no matter where
//! the process runs.

use chrono::{DateTime, Days, NaiveDate, TimeDelta, TimeZone, Utc};
use once_cell::sync::Lazy;
use rand::{Rng, rng};
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Offset of the reference timezone from UTC, in hours.
pub const REFERENCE_UTC_OFFSET_HOURS: i64 = 8;

/// Calendar date of `instant` in the reference timezone.
///
/// The fixed offset is added to the UTC instant before the date is taken, so
/// the result does not depend on the host's local timezone.
pub fn reference_date<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveDate {
    (instant.naive_utc() + TimeDelta::hours(REFERENCE_UTC_OFFSET_HOURS)).date()
}

/// The "now" of one pipeline run.
///
/// Captured once at start-up and passed down explicitly; tests build it with
/// [`ReferenceClock::fixed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceClock {
    now: DateTime<Utc>,
}

impl ReferenceClock {
    pub fn system() -> Self {
        Self { now: Utc::now() }
    }

    pub fn fixed(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Today's date in the reference timezone.
    pub fn today(&self) -> NaiveDate {
        reference_date(&self.now)
    }

    /// `days` calendar days before today, in the reference timezone.
    pub fn days_ago(&self, days: u32) -> NaiveDate {
        self.today()
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Inclusive window `[today - days, today]`. `days == 0` means today only.
    pub fn trailing_window(&self, days: u32) -> DateWindow {
        DateWindow {
            start: self.days_ago(days),
            end: self.today(),
        }
    }
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Last day of the window; the date assigned to undated entries.
    pub fn today(&self) -> NaiveDate {
        self.end
    }
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]*>").expect("tag regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Strip HTML tags, decode HTML entities and collapse whitespace.
///
/// Entities are decoded in a single pass, so `&amp;lt;` becomes `&lt;` and
/// not `<`. Non-breaking spaces count as whitespace.
pub fn clean_text(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, " ");
    let decoded = html_escape::decode_html_entities(&stripped).replace('\u{a0}', " ");
    WS_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Keep at most `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a character boundary)
/// with an ellipsis and the number of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Fresh article id: millisecond timestamp plus a random 64-bit suffix, hex encoded.
pub fn generate_id(now: DateTime<Utc>) -> String {
    let suffix: u64 = rng().random();
    format!("{:x}-{:016x}", now.timestamp_millis(), suffix)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a scratch file.
/// Run before any network work so an unwritable store fails fast.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let scratch_path = path.join("..__write_check__");
    stdfs::File::create(&scratch_path)?;
    let _ = stdfs::remove_file(&scratch_path);
    info!("Output directory is writable");
    Ok(())
}
