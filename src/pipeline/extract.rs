//! URL extraction: find every URL-looking token in free-form message text.
//!
//! This is a lexical match, not a URL parser. A token starts with
//! `http://`, `https://` or `www.` (any case) and runs until whitespace,
//! a comma or an angle bracket. A trailing `(word)` group is kept, a single
//! trailing `!` is not.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:https?://|www\.)[^\s,()<>]+(?:\([A-Za-z0-9_]+\)|[^,()<>!\s]|\([^,()<>!\s]*\))",
    )
    .unwrap()
});

/// Extract every URL in `message`, left to right, duplicates included.
///
/// Total over any input; an empty message yields an empty vector.
pub fn extract_urls(message: &str) -> Vec<String> {
    if message.is_empty() {
        return Vec::new();
    }
    let urls: Vec<String> = RE_URL
        .find_iter(message)
        .map(|m| m.as_str().to_string())
        .collect();
    debug!("Extracted {} URL(s) from message", urls.len());
    urls
}
