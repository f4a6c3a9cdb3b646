//! RSS / Atom item extraction.
//!
//! Every field has a documented default, so one odd item never costs the
//! rest of the batch.

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::article::{snippet_from_html, UNTITLED};
use crate::domain::Article;
use crate::normalizer::normalize;
use crate::parser::xml::{self, XmlElement};

const DATE_FIELDS: [&str; 4] = ["pubDate", "published", "updated", "date"];
const CONTENT_FIELDS: [&str; 4] = ["encoded", "content", "description", "summary"];

/// Parse a syndication document into articles.
///
/// `source_url` is the base for content normalization when an item has no
/// link of its own.
pub fn parse_feed(body: &str, source_id: &str, source_url: &str) -> Result<Vec<Article>> {
    let root = xml::parse(body)?;

    let mut items = root.find_all("item");
    if items.is_empty() {
        items = root.find_all("entry");
    }

    let now = Utc::now();
    Ok(items
        .into_iter()
        .map(|item| article_from_item(item, source_id, source_url, now))
        .collect())
}

fn article_from_item(
    item: &XmlElement,
    source_id: &str,
    source_url: &str,
    now: DateTime<Utc>,
) -> Article {
    let link = item_link(item);
    let guid = first_text(item, &["guid", "id"]).unwrap_or_else(|| link.clone());

    let mut article = Article::new(source_id, guid, link);
    article.title = first_text(item, &["title"]).unwrap_or_else(|| UNTITLED.to_string());
    article.published_at = first_text(item, &DATE_FIELDS)
        .and_then(|raw| parse_date(&raw))
        .unwrap_or(now);
    article.author = item_author(item).unwrap_or_default();

    let raw_content = first_text(item, &CONTENT_FIELDS).unwrap_or_default();
    let base = if article.link.is_empty() {
        source_url
    } else {
        &article.link
    };
    let content = normalize(&raw_content, base);
    article.snippet = snippet_from_html(&content);
    article.content = content;
    article
}

/// Text of the first descendant named by any of `fields`, tried in order.
fn first_text(item: &XmlElement, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| {
        item.find(field)
            .map(|e| e.text().trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

fn item_link(item: &XmlElement) -> String {
    if let Some(text) = first_text(item, &["link"]) {
        return text;
    }

    let links = item.find_all("link");
    links
        .iter()
        .find(|l| l.attr("rel") == Some("alternate"))
        .or_else(|| links.first())
        .and_then(|l| l.attr("href"))
        .map(|href| href.trim().to_string())
        .unwrap_or_default()
}

fn item_author(item: &XmlElement) -> Option<String> {
    let non_empty = |e: &XmlElement| Some(e.text().trim().to_string()).filter(|t| !t.is_empty());

    item.find("author")
        .and_then(|a| a.find("name"))
        .and_then(non_empty)
        .or_else(|| item.find("author").and_then(non_empty))
        .or_else(|| item.find_qualified("dc:creator").and_then(non_empty))
        .or_else(|| item.find("creator").and_then(non_empty))
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Test Feed</title>
    <item>
      <title>Test Item 1</title>
      <link>https://example.com/item1</link>
      <guid>item-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
      <dc:creator>Alice</dc:creator>
      <description>Short description</description>
      <content:encoded><![CDATA[<p>Full <img data-src="/a.png"> body</p>]]></content:encoded>
    </item>
    <item>
      <title>Test Item 2</title>
      <link>https://example.com/item2</link>
      <description>This is item 2</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test Feed</title>
  <entry>
    <title>Atom Entry 1</title>
    <link rel="self" href="https://example.com/atom1.xml"/>
    <link rel="alternate" href="https://example.com/atom1"/>
    <id>atom-entry-1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <author><name>Bob</name><email>bob@example.com</email></author>
    <summary>This is Atom entry 1</summary>
  </entry>
</feed>"#;

    fn parse(body: &str) -> Vec<Article> {
        parse_feed(body, "test", "https://example.com/feed.xml").unwrap()
    }

    #[test]
    fn test_parse_rss() {
        let items = parse(RSS_SAMPLE);
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title, "Test Item 1");
        assert_eq!(first.link, "https://example.com/item1");
        assert_eq!(first.guid, "item-1");
        assert_eq!(first.author, "Alice");
        assert_eq!(first.source_id, "test");
        assert_eq!(first.published_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_encoded_content_preferred_and_normalized() {
        let items = parse(RSS_SAMPLE);
        assert!(items[0].content.contains(r#"src="https://example.com/a.png""#));
        assert_eq!(items[0].snippet, "Full  body");
        assert_eq!(items[1].content, "This is item 2");
    }

    #[test]
    fn test_guid_falls_back_to_link() {
        let items = parse(RSS_SAMPLE);
        assert_eq!(items[1].guid, "https://example.com/item2");
    }

    #[test]
    fn test_parse_atom() {
        let items = parse(ATOM_SAMPLE);
        assert_eq!(items.len(), 1);

        let entry = &items[0];
        assert_eq!(entry.title, "Atom Entry 1");
        assert_eq!(entry.link, "https://example.com/atom1");
        assert_eq!(entry.guid, "atom-entry-1");
        assert_eq!(entry.author, "Bob");
        assert_eq!(entry.content, "This is Atom entry 1");
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let body = "<rss><channel><item><description>x</description></item></channel></rss>";
        let before = Utc::now();
        let items = parse(body);

        let item = &items[0];
        assert_eq!(item.title, "Untitled");
        assert_eq!(item.link, "");
        assert_eq!(item.guid, "");
        assert_eq!(item.author, "");
        assert!(item.published_at >= before);
    }

    #[test]
    fn test_unparsable_date_defaults_to_now() {
        let body = "<rss><channel><item><title>T</title><pubDate>someday</pubDate></item></channel></rss>";
        let before = Utc::now();
        assert!(parse(body)[0].published_at >= before);
    }

    #[test]
    fn test_atom_link_without_alternate_uses_first_href() {
        let body = r#"<feed><entry><title>T</title><link href="https://example.com/only"/></entry></feed>"#;
        assert_eq!(parse(body)[0].link, "https://example.com/only");
    }

    #[test]
    fn test_empty_channel_is_empty_batch() {
        let body = "<rss><channel><title>Nothing</title></channel></rss>";
        assert!(parse(body).is_empty());
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let result = parse_feed("<rss><channel><item></channel>", "s", "https://example.com");
        assert!(result.is_err());
    }

    #[test]
    fn test_long_content_snippet_truncated() {
        let body = format!(
            "<rss><channel><item><title>T</title><description>{}</description></item></channel></rss>",
            "z".repeat(400)
        );
        let snippet = &parse(&body)[0].snippet;
        assert_eq!(snippet.len(), 153);
        assert!(snippet.ends_with("..."));
    }
}
