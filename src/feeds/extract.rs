//! Normalization of raw feed entries into [`Article`]s.
//!
//! Field resolution is priority-ordered per dialect:
//!
//! | field | RSS | Atom |
//! |-------|-----|------|
//! | date | `pubDate`, `dc:date` | `published`, `updated`, `dc:date` |
//! | link | `link`, `atom:link@href`, permalink `guid` | `link@href` (alternate first), link text, `id` |
//! | summary | `description`, `content:encoded` | `summary`, `content` |
//!
//! Dates are mapped to the reference timezone before the window check, so an
//! entry's date and "today" are always read off the same calendar.

use crate::feeds::parser::{AtomEntry, FeedEntry, RssItem};
use crate::models::{Article, SourceDescriptor};
use crate::utils::{DateWindow, ReferenceClock, clean_text, generate_id, reference_date, truncate_chars};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use tracing::trace;

/// Summaries are cut to this many characters before being stored.
pub const MAX_SUMMARY_CHARS: usize = 300;

/// Days before today still accepted when no window is configured.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Turns entries from one fetch into articles dated inside a trailing window.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    clock: ReferenceClock,
    window: DateWindow,
}

impl Extractor {
    /// Accept entries dated within `[today - window_days, today]`.
    pub fn new(clock: ReferenceClock, window_days: u32) -> Self {
        Self {
            clock,
            window: clock.trailing_window(window_days),
        }
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    /// Extract every acceptable entry, preserving feed order.
    pub fn extract_all(&self, entries: &[FeedEntry], source: &SourceDescriptor) -> Vec<Article> {
        entries
            .iter()
            .filter_map(|entry| self.extract(entry, source))
            .collect()
    }

    /// Normalize one entry into an [`Article`].
    ///
    /// # Arguments
    ///
    /// * `entry` - A raw RSS item or Atom entry from [`parse_feed`](crate::feeds::parser::parse_feed)
    /// * `source` - The descriptor whose name, category, language and entity
    ///   label are copied onto the article
    ///
    /// # Returns
    ///
    /// `None` when the entry's date (in UTC+8) falls outside the window, or
    /// when the cleaned title or the resolved link is empty. Undated entries
    /// are dated today. The summary is the cleaned description cut to
    /// [`MAX_SUMMARY_CHARS`], or the title when there is no description.
    pub fn extract(&self, entry: &FeedEntry, source: &SourceDescriptor) -> Option<Article> {
        let fields = EntryFields::from(entry);

        let date = fields
            .date
            .and_then(parse_date)
            .map(|instant| reference_date(&instant))
            .unwrap_or_else(|| self.window.today());
        if !self.window.contains(date) {
            trace!(%date, source = %source.name, "entry outside extraction window");
            return None;
        }

        let title = fields.title.map(clean_text).unwrap_or_default();
        let url = fields.link.map(|l| l.trim().to_string()).unwrap_or_default();
        if title.is_empty() || url.is_empty() {
            trace!(source = %source.name, %title, %url, "entry missing title or link");
            return None;
        }

        let description = fields
            .description
            .map(|d| truncate_chars(&clean_text(d), MAX_SUMMARY_CHARS))
            .unwrap_or_default();
        let summary = if description.is_empty() {
            title.clone()
        } else {
            description
        };

        Some(Article {
            id: generate_id(self.clock.now()),
            date,
            source_category: source.category,
            source_name: source.name.clone(),
            entity_label: source.entity_label.clone(),
            language: source.language,
            title,
            summary,
            url,
        })
    }
}

/// The fields of an entry after dialect-specific priority resolution.
struct EntryFields<'a> {
    title: Option<&'a str>,
    link: Option<&'a str>,
    date: Option<&'a str>,
    description: Option<&'a str>,
}

impl<'a> From<&'a FeedEntry> for EntryFields<'a> {
    fn from(entry: &'a FeedEntry) -> Self {
        match entry {
            FeedEntry::Rss(item) => rss_fields(item),
            FeedEntry::Atom(entry) => atom_fields(entry),
        }
    }
}

fn rss_fields(item: &RssItem) -> EntryFields<'_> {
    let link = item
        .link
        .as_deref()
        .or(item.atom_link.as_deref())
        .or_else(|| {
            item.guid
                .as_ref()
                .filter(|g| g.is_permalink)
                .map(|g| g.value.as_str())
        });
    EntryFields {
        title: item.title.as_deref(),
        link,
        date: item.pub_date.as_deref().or(item.dc_date.as_deref()),
        description: item.description.as_deref().or(item.content.as_deref()),
    }
}

fn atom_fields(entry: &AtomEntry) -> EntryFields<'_> {
    let alternate = entry.links.iter().find_map(|l| {
        let rel_ok = l.rel.as_deref().is_none_or(|r| r == "alternate");
        l.href.as_deref().filter(|_| rel_ok)
    });
    let link = alternate
        .or_else(|| entry.links.iter().find_map(|l| l.href.as_deref()))
        .or_else(|| entry.links.iter().find_map(|l| l.text.as_deref()))
        .or(entry.id.as_deref());
    EntryFields {
        title: entry.title.as_deref(),
        link,
        date: entry
            .published
            .as_deref()
            .or(entry.updated.as_deref())
            .or(entry.dc_date.as_deref()),
        description: entry.summary.as_deref().or(entry.content.as_deref()),
    }
}

/// Parse a feed timestamp.
///
/// Accepts RFC 2822 (with or without a correct weekday), RFC 3339 and a few
/// loose ISO-like forms. Timestamps without an offset are taken as UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }
    // Feeds often carry a weekday that does not match the date.
    if let Some((_, rest)) = s.split_once(", ") {
        if let Ok(dt) = DateTime::parse_from_rfc2822(rest.trim()) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc().fixed_offset());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::parser::{AtomLink, Guid, parse_feed};
    use crate::models::{Language, SourceCategory};
    use chrono::{TimeZone, Utc};

    // 2025-05-10 12:00 in UTC+8.
    fn clock() -> ReferenceClock {
        ReferenceClock::fixed(Utc.with_ymd_and_hms(2025, 5, 10, 4, 0, 0).unwrap())
    }

    fn source() -> SourceDescriptor {
        SourceDescriptor::new(
            "Example Blog",
            SourceCategory::Company,
            Language::En,
            "Example",
            "https://example.com/feed",
            None,
        )
    }

    fn item(title: &str, link: Option<&str>, date: Option<&str>) -> FeedEntry {
        FeedEntry::Rss(RssItem {
            title: Some(title.to_string()),
            link: link.map(str::to_string),
            pub_date: date.map(str::to_string),
            ..Default::default()
        })
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rss_field_extraction() {
        let today = clock().now().to_rfc2822();
        let xml = format!(
            "<rss><channel><item><title>A &amp; B</title><link>http://x</link>\
             <description><![CDATA[hello]]></description><pubDate>{today}</pubDate></item></channel></rss>"
        );
        let feed = parse_feed(&xml).unwrap();
        let article = Extractor::new(clock(), 7)
            .extract(&feed.entries[0], &source())
            .unwrap();

        assert_eq!(article.title, "A & B");
        assert_eq!(article.url, "http://x");
        assert_eq!(article.summary, "hello");
        assert_eq!(article.date, date(2025, 5, 10));
        assert_eq!(article.source_name, "Example Blog");
        assert_eq!(article.entity_label, "Example");
        assert_eq!(article.source_category, SourceCategory::Company);
    }

    #[test]
    fn test_window_boundaries_are_inclusive() {
        let extractor = Extractor::new(clock(), 7);
        let cutoff = extractor.window().start;
        assert_eq!(cutoff, date(2025, 5, 3));

        let dated = |d: NaiveDate| {
            item("t", Some("http://x"), Some(&format!("{d}T12:00:00+08:00")))
        };
        let accepted: Vec<NaiveDate> = [
            cutoff.pred_opt().unwrap(),
            cutoff,
            date(2025, 5, 10),
            date(2025, 5, 11),
        ]
        .into_iter()
        .filter(|d| extractor.extract(&dated(*d), &source()).is_some())
        .collect();

        assert_eq!(accepted, vec![cutoff, date(2025, 5, 10)]);
    }

    #[test]
    fn test_today_only_window() {
        let extractor = Extractor::new(clock(), 0);
        assert!(
            extractor
                .extract(&item("t", Some("http://x"), Some("2025-05-10T01:00:00+08:00")), &source())
                .is_some()
        );
        assert!(
            extractor
                .extract(&item("t", Some("http://x"), Some("2025-05-09T23:00:00+08:00")), &source())
                .is_none()
        );
    }

    #[test]
    fn test_date_is_taken_in_reference_timezone() {
        // 20:00 UTC on the 9th is 04:00 on the 10th in UTC+8.
        let article = Extractor::new(clock(), 0)
            .extract(
                &item("t", Some("http://x"), Some("Fri, 09 May 2025 20:00:00 GMT")),
                &source(),
            )
            .unwrap();
        assert_eq!(article.date, date(2025, 5, 10));
    }

    #[test]
    fn test_missing_or_bad_date_defaults_to_today() {
        let extractor = Extractor::new(clock(), 0);
        let undated = extractor
            .extract(&item("t", Some("http://x"), None), &source())
            .unwrap();
        assert_eq!(undated.date, date(2025, 5, 10));
        let garbage = extractor
            .extract(&item("t", Some("http://x"), Some("yesterday-ish")), &source())
            .unwrap();
        assert_eq!(garbage.date, date(2025, 5, 10));
    }

    #[test]
    fn test_missing_link_is_rejected() {
        let extractor = Extractor::new(clock(), 7);
        assert!(extractor.extract(&item("Title", None, None), &source()).is_none());
        assert!(extractor.extract(&item("Title", Some("   "), None), &source()).is_none());
    }

    #[test]
    fn test_missing_title_is_rejected() {
        let extractor = Extractor::new(clock(), 7);
        assert!(extractor.extract(&item("", Some("http://x"), None), &source()).is_none());
        assert!(extractor.extract(&item("<br/>", Some("http://x"), None), &source()).is_none());
    }

    #[test]
    fn test_atom_entry_without_link_or_id_is_rejected() {
        let extractor = Extractor::new(clock(), 7);
        let entry = AtomEntry {
            title: Some("Untethered".into()),
            links: vec![],
            id: None,
            summary: Some("no way to link this".into()),
            ..Default::default()
        };
        assert!(extractor.extract(&FeedEntry::Atom(entry), &source()).is_none());
    }

    #[test]
    fn test_rss_link_falls_back_to_permalink_guid() {
        let extractor = Extractor::new(clock(), 7);
        let mut rss = RssItem {
            title: Some("t".into()),
            guid: Some(Guid {
                value: "http://guid/1".into(),
                is_permalink: true,
            }),
            ..Default::default()
        };
        let article = extractor.extract(&FeedEntry::Rss(rss.clone()), &source()).unwrap();
        assert_eq!(article.url, "http://guid/1");

        rss.guid = Some(Guid {
            value: "opaque-1".into(),
            is_permalink: false,
        });
        assert!(extractor.extract(&FeedEntry::Rss(rss), &source()).is_none());
    }

    #[test]
    fn test_atom_link_resolution_order() {
        let extractor = Extractor::new(clock(), 7);
        let mut entry = AtomEntry {
            title: Some("t".into()),
            id: Some("tag:example.com,2025:1".into()),
            links: vec![
                AtomLink {
                    href: Some("http://x/replies".into()),
                    rel: Some("replies".into()),
                    text: None,
                },
                AtomLink {
                    href: Some("http://x/post".into()),
                    rel: Some("alternate".into()),
                    text: None,
                },
            ],
            ..Default::default()
        };
        let url = |e: &AtomEntry| {
            extractor
                .extract(&FeedEntry::Atom(e.clone()), &source())
                .map(|a| a.url)
        };

        assert_eq!(url(&entry).as_deref(), Some("http://x/post"));

        entry.links.remove(1);
        assert_eq!(url(&entry).as_deref(), Some("http://x/replies"));

        entry.links = vec![AtomLink {
            href: None,
            rel: None,
            text: Some("http://x/text".into()),
        }];
        assert_eq!(url(&entry).as_deref(), Some("http://x/text"));

        entry.links.clear();
        assert_eq!(url(&entry).as_deref(), Some("tag:example.com,2025:1"));
    }

    #[test]
    fn test_atom_date_priority() {
        let extractor = Extractor::new(clock(), 30);
        let entry = AtomEntry {
            title: Some("t".into()),
            id: Some("http://x".into()),
            published: Some("2025-05-01T00:00:00Z".into()),
            updated: Some("2025-05-09T00:00:00Z".into()),
            ..Default::default()
        };
        let article = extractor.extract(&FeedEntry::Atom(entry), &source()).unwrap();
        assert_eq!(article.date, date(2025, 5, 1));
    }

    #[test]
    fn test_summary_is_truncated_to_300_chars() {
        let extractor = Extractor::new(clock(), 7);
        let entry = FeedEntry::Rss(RssItem {
            title: Some("t".into()),
            link: Some("http://x".into()),
            description: Some("x".repeat(450)),
            ..Default::default()
        });
        let article = extractor.extract(&entry, &source()).unwrap();
        assert_eq!(article.summary.chars().count(), 300);
    }

    #[test]
    fn test_summary_falls_back_to_title() {
        let extractor = Extractor::new(clock(), 7);
        let entry = FeedEntry::Rss(RssItem {
            title: Some("Only a title".into()),
            link: Some("http://x".into()),
            description: Some("<img src=\"a.png\"/>".into()),
            ..Default::default()
        });
        let article = extractor.extract(&entry, &source()).unwrap();
        assert_eq!(article.summary, "Only a title");
    }

    #[test]
    fn test_summary_uses_content_when_no_description() {
        let extractor = Extractor::new(clock(), 7);
        let entry = FeedEntry::Rss(RssItem {
            title: Some("t".into()),
            link: Some("http://x".into()),
            content: Some("<p>Body &amp; more</p>".into()),
            ..Default::default()
        });
        let article = extractor.extract(&entry, &source()).unwrap();
        assert_eq!(article.summary, "Body & more");
    }

    #[test]
    fn test_extract_all_keeps_order_and_drops_invalid() {
        let extractor = Extractor::new(clock(), 7);
        let entries = vec![
            item("first", Some("http://1"), None),
            item("no link", None, None),
            item("second", Some("http://2"), None),
        ];
        let articles = extractor.extract_all(&entries, &source());
        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert_ne!(articles[0].id, articles[1].id);
    }

    #[test]
    fn test_parse_date_formats() {
        let expect = Utc.with_ymd_and_hms(2025, 5, 6, 2, 0, 0).unwrap();
        for raw in [
            "Tue, 06 May 2025 10:00:00 +0800",
            "Mon, 06 May 2025 10:00:00 +0800",
            "06 May 2025 02:00:00 GMT",
            "2025-05-06T10:00:00+08:00",
            "2025-05-06T02:00:00.000Z",
            "2025-05-06 10:00:00 +0800",
            "2025-05-06T02:00:00",
            "2025-05-06 02:00:00",
        ] {
            let parsed = parse_date(raw).unwrap_or_else(|| panic!("failed to parse {raw}"));
            assert_eq!(parsed.with_timezone(&Utc), expect, "{raw}");
        }
        assert_eq!(
            parse_date("2025-05-06").map(|d| d.with_timezone(&Utc)),
            Some(Utc.with_ymd_and_hms(2025, 5, 6, 0, 0, 0).unwrap())
        );
        assert!(parse_date("").is_none());
        assert!(parse_date("not a date").is_none());
    }
}
