//! Optional rewriting of long article summaries into one short sentence.
//!
//! [`Summarizer::summarize`] never fails: any problem with the backing
//! [`AskAsync`] call leaves the original text in place.

use crate::api::AskAsync;
use crate::feeds::extract::MAX_SUMMARY_CHARS;
use crate::models::{Article, Language};
use crate::utils::{clean_text, truncate_chars};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

/// Texts at or below this length are kept as-is.
pub const SHORT_TEXT_CHARS: usize = 120;

/// Longest body excerpt included in a prompt.
pub const PROMPT_BODY_CHARS: usize = 1000;

/// Target length requested from the model.
pub const TARGET_SUMMARY_CHARS: usize = 100;

pub trait Summarizer {
    /// Return a replacement summary for `text`, or `text` itself.
    async fn summarize(&self, title: &str, text: &str, language: Language) -> String;
}

/// Leaves every summary untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Summarizer for PassThrough {
    async fn summarize(&self, _title: &str, text: &str, _language: Language) -> String {
        text.to_string()
    }
}

/// Summarizer backed by a text-generation call.
#[derive(Debug)]
pub struct LlmSummarizer<A> {
    api: A,
}

impl<A: AskAsync> LlmSummarizer<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

impl<A: AskAsync> Summarizer for LlmSummarizer<A> {
    #[instrument(level = "debug", skip_all, fields(%title))]
    async fn summarize(&self, title: &str, text: &str, language: Language) -> String {
        if text.chars().count() <= SHORT_TEXT_CHARS {
            return text.to_string();
        }

        let prompt = build_prompt(title, text, language);
        match self.api.ask(&prompt).await {
            Ok(reply) => match sanitize_reply(&reply) {
                Some(summary) => {
                    debug!(chars = summary.chars().count(), "Summary rewritten");
                    summary
                }
                None => {
                    warn!("Model reply was blank after cleanup; keeping original summary");
                    text.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "Summarization failed; keeping original summary");
                text.to_string()
            }
        }
    }
}

/// One user-role prompt asking for a single sentence in `language`.
pub fn build_prompt(title: &str, text: &str, language: Language) -> String {
    format!(
        "Summarize the following news article in ONE sentence of at most {TARGET_SUMMARY_CHARS} \
         characters, written in {lang}. Reply with the sentence only.\n\n\
         Title: {title}\n\nArticle:\n{body}",
        lang = language.display_name(),
        body = truncate_chars(text, PROMPT_BODY_CHARS),
    )
}

/// First non-empty line of a reply, unquoted and whitespace-normalized.
fn sanitize_reply(reply: &str) -> Option<String> {
    let line = reply.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '「' | '」'))
        .trim();
    let cleaned = truncate_chars(&clean_text(line), MAX_SUMMARY_CHARS);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Rewrite each article's summary in place, one call at a time.
#[instrument(level = "info", skip_all, fields(count = articles.len()))]
pub async fn summarize_new_articles<S: Summarizer>(summarizer: &S, articles: &mut [Article]) {
    let rewritten: Vec<String> = stream::iter(articles.iter())
        .then(|a| summarizer.summarize(&a.title, &a.summary, a.language))
        .collect()
        .await;

    let mut changed = 0usize;
    for (article, summary) in articles.iter_mut().zip(rewritten) {
        if article.summary != summary {
            article.summary = summary;
            changed += 1;
        }
    }
    info!(changed, "Summarization pass complete");
}
