//! JSON API listings mapped to articles through per-source field maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::app::{FeedRelayError, Result};
use crate::domain::article::{snippet_from_html, truncate_snippet, UNTITLED};
use crate::domain::Article;
use crate::normalizer::normalize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampUnit {
    #[default]
    Seconds,
    Millis,
    /// RFC 3339 / RFC 2822 strings
    Text,
}

/// Where each article field lives in an API response.
///
/// Paths are JSON pointers (`/author/nickname`). `link_template` may use
/// `{guid}` and takes precedence over `link`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonFieldMap {
    pub items: String,
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    pub link_template: Option<String>,
    pub published: Option<String>,
    pub timestamp_unit: TimestampUnit,
    pub author: Option<String>,
    pub default_author: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    /// Base URL for content normalization (default: the article link)
    pub content_base: Option<String>,
}

impl Default for JsonFieldMap {
    fn default() -> Self {
        Self {
            items: "/data".to_string(),
            guid: "/id".to_string(),
            title: "/title".to_string(),
            link: Some("/link".to_string()),
            link_template: None,
            published: None,
            timestamp_unit: TimestampUnit::Seconds,
            author: None,
            default_author: String::new(),
            summary: None,
            content: None,
            content_base: None,
        }
    }
}

impl JsonFieldMap {
    /// Field map for the SSPai article index API.
    pub fn sspai() -> Self {
        Self {
            link: None,
            link_template: Some("https://sspai.com/post/{guid}".to_string()),
            published: Some("/released_time".to_string()),
            author: Some("/author/nickname".to_string()),
            default_author: "SSPai".to_string(),
            summary: Some("/summary".to_string()),
            content: Some("/body".to_string()),
            content_base: Some("https://sspai.com".to_string()),
            ..Default::default()
        }
    }
}

/// Parse an API payload. Malformed JSON or a missing item array is an
/// error; individual items that yield neither a guid nor a link are
/// skipped.
pub fn parse_json(payload: &str, fields: &JsonFieldMap, source_id: &str) -> Result<Vec<Article>> {
    let value: Value = serde_json::from_str(payload)?;

    let items = value
        .pointer(&fields.items)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            FeedRelayError::FeedParse(format!("JSON payload has no array at {}", fields.items))
        })?;

    let now = Utc::now();
    Ok(items
        .iter()
        .filter_map(|item| article_from_value(item, fields, source_id, now))
        .collect())
}

fn article_from_value(
    item: &Value,
    fields: &JsonFieldMap,
    source_id: &str,
    now: DateTime<Utc>,
) -> Option<Article> {
    let guid = text_at(item, &fields.guid);

    let link = match (&fields.link_template, guid.is_empty()) {
        (Some(template), false) => template.replace("{guid}", &guid),
        _ => fields
            .link
            .as_deref()
            .map(|path| text_at(item, path))
            .unwrap_or_default(),
    };

    if guid.is_empty() && link.is_empty() {
        debug!(source_id, "Skipping API item without id or link");
        return None;
    }

    let guid = if guid.is_empty() { link.clone() } else { guid };
    let mut article = Article::new(source_id, guid, link);

    let title = text_at(item, &fields.title);
    article.title = if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    };

    article.published_at = fields
        .published
        .as_deref()
        .and_then(|path| item.pointer(path))
        .and_then(|v| timestamp(v, fields.timestamp_unit))
        .unwrap_or(now);

    article.author = fields
        .author
        .as_deref()
        .map(|path| text_at(item, path))
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| fields.default_author.clone());

    let raw_content = fields
        .content
        .as_deref()
        .map(|path| text_at(item, path))
        .unwrap_or_default();
    let base = fields.content_base.as_deref().unwrap_or(&article.link);
    let content = normalize(&raw_content, base);

    let summary = fields
        .summary
        .as_deref()
        .map(|path| text_at(item, path))
        .unwrap_or_default();
    article.snippet = if summary.is_empty() {
        snippet_from_html(&content)
    } else {
        truncate_snippet(summary.trim())
    };
    article.content = content;

    Some(article)
}

fn text_at(item: &Value, path: &str) -> String {
    match item.pointer(path) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn timestamp(value: &Value, unit: TimestampUnit) -> Option<DateTime<Utc>> {
    match (unit, value) {
        (TimestampUnit::Seconds, v) => DateTime::from_timestamp(v.as_i64()?, 0),
        (TimestampUnit::Millis, v) => DateTime::from_timestamp_millis(v.as_i64()?),
        (TimestampUnit::Text, Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_rfc2822(s))
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        (TimestampUnit::Text, _) => None,
    }
}
