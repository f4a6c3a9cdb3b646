//! Article discovery on HTML listing pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::domain::article::{LISTING_SNIPPET, UNTITLED};
use crate::domain::Article;
use crate::parser::{first_non_empty, select_all};

/// Common heading / entry anchor patterns tried when a source's own
/// selector matches nothing.
pub const GENERIC_LISTING_SELECTORS: &str =
    "h2 a, h3 a, .entry-title a, .post-title a, article a, .card a";

/// Titles this short are navigation noise, not articles.
const MIN_TITLE_CHARS: usize = 6;

const SKIPPED_LINK_PATTERNS: [&str; 4] = ["#comment", "/tag/", "/category/", "javascript:"];

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid anchor selector"));

/// Scrape article links from a listing page.
///
/// The resulting articles carry no content and a synthetic publish time;
/// both are expected to be backfilled by full-text extraction.
pub fn scrape_listing(html: &str, page_url: &str, selector_hint: &str, source_id: &str) -> Vec<Article> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let candidates = [selector_hint, GENERIC_LISTING_SELECTORS];
    let Some((used, nodes)) = first_non_empty(&candidates, |s| select_all(document.root_element(), s)) else {
        debug!(url = page_url, "No listing entries matched");
        return Vec::new();
    };
    if *used != selector_hint {
        debug!(url = page_url, selector_hint, "Selector hint matched nothing, used generic fallback");
    }

    let mut seen = HashSet::new();
    nodes
        .into_iter()
        .filter_map(|node| listing_entry(node, base.as_ref()))
        .filter(|(_, link)| seen.insert(link.clone()))
        .map(|(title, link)| {
            let mut article = Article::new(source_id, link.clone(), link);
            article.title = title;
            article.snippet = LISTING_SNIPPET.to_string();
            article
        })
        .collect()
}

fn listing_entry(node: ElementRef<'_>, base: Option<&Url>) -> Option<(String, String)> {
    let anchor = if node.value().name() == "a" {
        node
    } else {
        node.select(&ANCHOR).next()?
    };

    let text = anchor.text().collect::<String>();
    let title = match text.trim() {
        "" => anchor
            .value()
            .attr("title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED),
        trimmed => trimmed,
    };
    if title.chars().count() < MIN_TITLE_CHARS {
        return None;
    }

    let href = anchor.value().attr("href").filter(|h| !h.is_empty())?;
    let link = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    let link = String::from(link);

    if SKIPPED_LINK_PATTERNS.iter().any(|p| link.contains(p)) {
        return None;
    }

    Some((title.to_string(), link))
}
