use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const UNTITLED: &str = "Untitled";

/// Snippet placeholder for articles discovered on a listing page.
pub const LISTING_SNIPPET: &str = "Fetched from web listing";

const SNIPPET_CHARS: usize = 150;
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub guid: String,
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub author: String,
    pub snippet: String,
    pub content: String,
    pub source_id: String,
}

impl Article {
    pub fn new(source_id: &str, guid: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            title: UNTITLED.to_string(),
            link: link.into(),
            published_at: Utc::now(),
            author: String::new(),
            snippet: String::new(),
            content: String::new(),
            source_id: source_id.to_string(),
        }
    }

    /// Identity used for cross-page deduplication within a source.
    pub fn dedup_key(&self) -> &str {
        if self.guid.is_empty() {
            &self.link
        } else {
            &self.guid
        }
    }

    /// Stable hex id of `(source_id, dedup_key)`.
    pub fn id(&self) -> String {
        Self::fingerprint(&self.source_id, self.dedup_key())
    }

    pub fn fingerprint(source_id: &str, key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source_id.as_bytes());
        hasher.update(b"\n");
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Replace the content and re-derive the snippet from it.
    pub fn set_content(&mut self, html: String) {
        self.snippet = snippet_from_html(&html);
        self.content = html;
    }
}

/// First 150 characters of the plain text of `html`, with `...` appended
/// when anything was cut.
pub fn snippet_from_html(html: &str) -> String {
    let text = crate::normalizer::plain_text(html);
    truncate_snippet(&text)
}

pub fn truncate_snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
