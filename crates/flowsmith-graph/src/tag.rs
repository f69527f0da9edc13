//! Identifier and webhook-tag generation
//!
//! Display names and webhook actions arrive as free English text; the
//! remote platform wants `[a-z0-9_]` identifiers. Tags must be stable:
//! the same text always produces the same tag, so re-running a sync maps
//! onto the same remote objects.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NON_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("valid regex"));
static UNDERSCORE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("valid regex"));

/// Filler words dropped before tag words are selected.
const STOPWORDS: &[&str] = &[
    "for", "the", "and", "or", "with", "from", "to", "a", "an", "in", "on", "at", "of",
];

/// How many meaningful words a webhook tag keeps.
const TAG_WORD_LIMIT: usize = 4;

/// Convert a string to a lowercase `[a-z0-9_]` identifier.
pub fn slugify(s: &str) -> String {
    let s = s.trim().to_lowercase();
    let s = WHITESPACE.replace_all(&s, "_");
    let s = NON_IDENT.replace_all(&s, "");
    let s = UNDERSCORE_RUN.replace_all(&s, "_");
    s.trim_matches('_').to_string()
}

/// Derive a webhook tag from a plain-English action description.
///
/// Lowercases, drops filler words, keeps the first four remaining words
/// joined with underscores, then strips everything outside `[a-z0-9_]`.
/// Returns `None` when nothing usable remains, in which case the action
/// has no webhook.
pub fn webhook_tag(action_text: &str) -> Option<String> {
    let lowered = action_text.to_lowercase();
    let words: Vec<&str> = lowered
        .split_whitespace()
        .filter(|w| !STOPWORDS.contains(w))
        .take(TAG_WORD_LIMIT)
        .collect();

    let tag = words.join("_");
    let tag = NON_IDENT.replace_all(&tag, "");
    let tag = UNDERSCORE_RUN.replace_all(&tag, "_");
    let tag = tag.trim_matches('_');
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}
