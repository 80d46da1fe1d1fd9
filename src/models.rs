//! Data models for feed sources and archived articles.
//!
//! - [`SourceDescriptor`]: one configured feed origin
//! - [`Article`]: the normalized record persisted in the archive
//!
//! The JSON field names of [`Article`] are part of the archive format read by
//! downstream consumers, so they are pinned with serde renames rather than
//! following the Rust field names.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of outlet a source is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceCategory {
    Portal,
    Company,
    Social,
    RegionalMedia,
}

impl SourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceCategory::Portal => "portal",
            SourceCategory::Company => "company",
            SourceCategory::Social => "social",
            SourceCategory::RegionalMedia => "regional-media",
        }
    }
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language an article is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// Human-readable name used when asking the model to answer in this language.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Zh => "Simplified Chinese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured feed origin.
///
/// Descriptors are built once per run (either from the built-in registry or
/// from a YAML file) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Display name, copied into every article as `sourceName`.
    pub name: String,
    pub category: SourceCategory,
    pub language: Language,
    /// Entity the source is about (a company, a product). May be empty.
    #[serde(rename = "company", default)]
    pub entity_label: String,
    /// Feed URL tried first.
    #[serde(rename = "url")]
    pub primary_url: String,
    /// Feed URL tried when the primary yields nothing.
    #[serde(rename = "fallbackUrl", default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
}

impl SourceDescriptor {
    pub fn new(
        name: &str,
        category: SourceCategory,
        language: Language,
        entity_label: &str,
        primary_url: &str,
        fallback_url: Option<&str>,
    ) -> Self {
        Self {
            name: name.to_string(),
            category,
            language,
            entity_label: entity_label.to_string(),
            primary_url: primary_url.to_string(),
            fallback_url: fallback_url.map(str::to_string),
        }
    }
}

/// A normalized article as stored in the archive.
///
/// `title` and `url` are never empty; `url` is the deduplication key across
/// the whole archive. `date` is the publication date in the reference
/// timezone (UTC+8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub date: NaiveDate,
    #[serde(rename = "sourceType")]
    pub source_category: SourceCategory,
    pub source_name: String,
    #[serde(rename = "company")]
    pub entity_label: String,
    pub language: Language,
    pub title: String,
    pub summary: String,
    pub url: String,
}
