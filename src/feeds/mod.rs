//! Feed ingestion: download, parse and normalize RSS 2.0 / Atom feeds.
//!
//! - [`parser`]: XML body to dialect-tagged entries
//! - [`extract`]: entries to [`Article`](crate::models::Article)s within a date window
//! - [`fetch`]: per-source primary/fallback orchestration over a [`FeedFetcher`]

pub mod extract;
pub mod fetch;
pub mod parser;

pub use extract::Extractor;
pub use fetch::{FeedFetcher, HttpFetcher, fetch_all};
