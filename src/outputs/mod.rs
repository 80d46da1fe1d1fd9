//! Persistent outputs of a run.
//!
//! - [`json`]: the article archive, read at start-up and replaced at the end
//! - [`markdown`]: the optional daily digest of today's articles
//!
//! ```text
//! data/
//! └── articles.json      # rolling archive
//!
//! digest_dir/
//! └── 2025-05-06.md      # one digest per reference-timezone day
//! ```

pub mod json;
pub mod markdown;
