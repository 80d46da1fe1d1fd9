//! Error types for each stage of the pipeline.
//!
//! Most of these never reach `main`: feed, fetch and API errors are logged
//! where they happen and degrade to "no results" or "keep the original
//! text". Only [`StoreError`] and [`SourcesError`] are fatal.

use thiserror::Error;

/// Failure to turn a response body into feed entries.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The body is not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Well-formed XML, but neither an RSS `channel` nor an Atom `feed`.
    #[error("no <channel> or <feed> root element")]
    MissingRoot,

    /// The document ended with elements still open.
    #[error("document ended inside <{0}>")]
    Unclosed(String),
}

/// Failure to fetch one feed URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connect, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The body could not be parsed as a feed.
    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Failure of the text-generation endpoint.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("response contained no completion text")]
    EmptyResponse,
}

/// Failure to persist the article collection.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize articles: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure to load a source registry file.
#[derive(Debug, Error)]
pub enum SourcesError {
    #[error("cannot read source file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid source file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("source {name:?} has an invalid URL {url:?}: {source}")]
    InvalidUrl {
        name: String,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("source file defines no sources")]
    Empty,
}
