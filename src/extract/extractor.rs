use std::sync::{Arc, LazyLock};

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};

use crate::extract::ExtractorConfig;
use crate::fetcher::RelayClient;
use crate::normalizer::normalize;
use crate::parser::{first_non_empty, select_all};

static ARTICLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article").expect("valid article selector"));
static BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div, section, main").expect("valid block selector"));
static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid paragraph selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid link selector"));

/// Which boundary heuristic isolated the article body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    Article,
    Selector(String),
    Density { paragraphs: usize },
}

/// Isolates the article body of a live page.
pub struct ArticleExtractor {
    relay: Arc<RelayClient>,
    config: ExtractorConfig,
}

impl ArticleExtractor {
    pub fn new(relay: Arc<RelayClient>, config: ExtractorConfig) -> Self {
        Self { relay, config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Fetch `url` and extract its article body. `None` when the page is
    /// unreachable or no heuristic matched.
    #[instrument(level = "debug", skip(self))]
    pub async fn extract_full_text(&self, url: &str) -> Option<String> {
        let html = self.relay.fetch_text(url).await?;
        match self.extract_from_html(&html, url) {
            Some((content, boundary)) => {
                info!(url, ?boundary, chars = content.len(), "Extracted article");
                Some(content)
            }
            None => {
                debug!(url, "No content boundary matched");
                None
            }
        }
    }

    /// Run the boundary heuristics over an already fetched page.
    pub fn extract_from_html(&self, html: &str, url: &str) -> Option<(String, Boundary)> {
        let normalized = normalize(html, url);
        let mut document = Html::parse_document(&normalized);
        self.remove_junk(&mut document);
        let root = document.root_element();

        if let Some(article) = root.select(&ARTICLE).next() {
            return Some((article.inner_html(), Boundary::Article));
        }

        if let Some((selector, matches)) =
            first_non_empty(&self.config.content_selectors, |s| select_all(root, s))
        {
            let content = matches
                .iter()
                .map(|el| el.inner_html())
                .collect::<Vec<_>>()
                .join(&self.config.separator);
            return Some((content, Boundary::Selector(selector.clone())));
        }

        self.densest_block(root).map(|(el, paragraphs)| {
            (el.inner_html(), Boundary::Density { paragraphs })
        })
    }

    fn remove_junk(&self, document: &mut Html) {
        let root = document.root_element();
        let ids: Vec<_> = self
            .config
            .remove_selectors
            .iter()
            .flat_map(|s| select_all(root, s))
            .map(|el| el.id())
            .collect();

        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    /// The block with the most paragraphs, among those above the minimum
    /// count and ratio. Ties go to the first in document order.
    fn densest_block<'a>(&self, root: ElementRef<'a>) -> Option<(ElementRef<'a>, usize)> {
        let mut best: Option<(ElementRef<'a>, usize)> = None;

        for block in root.select(&BLOCKS) {
            let paragraphs = block.select(&PARAGRAPH).count();
            if paragraphs <= self.config.min_paragraphs {
                continue;
            }
            if best.is_some_and(|(_, count)| paragraphs <= count) {
                continue;
            }
            if let Some(threshold) = self.config.min_paragraph_link_ratio {
                let links = block.select(&LINK).count();
                if links > 0 && (paragraphs as f64 / links as f64) <= threshold {
                    continue;
                }
            }
            best = Some((block, paragraphs));
        }

        best
    }

    /// Fetch the raw page for embedded rendering, with a `<base>` pointing
    /// back at `url`. Nothing is stripped.
    pub async fn fetch_for_embedding(&self, url: &str) -> Option<String> {
        let html = self.relay.fetch_text(url).await?;
        Some(inject_base(&html, url))
    }
}

pub fn inject_base(html: &str, url: &str) -> String {
    let base = format!(
        r#"<base href="{}" target="_blank">"#,
        html_escape::encode_double_quoted_attribute(url)
    );
    if html.contains("<head>") {
        html.replacen("<head>", &format!("<head>{base}"), 1)
    } else {
        format!("{base}{html}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::stub::StubFetcher;
    use crate::fetcher::RelayConfig;

    fn extractor_with(stub: StubFetcher, config: ExtractorConfig) -> ArticleExtractor {
        let relay = RelayClient::new(Arc::new(stub), RelayConfig::direct());
        ArticleExtractor::new(Arc::new(relay), config)
    }

    fn extractor() -> ArticleExtractor {
        extractor_with(StubFetcher::new(), ExtractorConfig::default())
    }

    fn paragraphs(prefix: &str, n: usize) -> String {
        (0..n).map(|i| format!("<p>{prefix} {i}</p>")).collect()
    }

    const URL: &str = "https://news.example/2024/story";

    #[test]
    fn test_article_wins_over_denser_container() {
        let html = format!(
            "<html><body><article>{}</article><div class=\"story-body\">{}</div></body></html>",
            paragraphs("short", 2),
            paragraphs("long", 8)
        );
        let (content, boundary) = extractor().extract_from_html(&html, URL).unwrap();
        assert_eq!(boundary, Boundary::Article);
        assert!(content.contains("short 1"));
        assert!(!content.contains("long"));
    }

    #[test]
    fn test_content_selector_single_match() {
        let html = format!(
            "<body><div class=\"article-body\">{}</div><div>{}</div></body>",
            paragraphs("body", 1),
            paragraphs("other", 6)
        );
        let (content, boundary) = extractor().extract_from_html(&html, URL).unwrap();
        assert_eq!(boundary, Boundary::Selector(".article-body".into()));
        assert_eq!(content, "<p>body 0</p>");
    }

    #[test]
    fn test_content_selector_priority_order() {
        let html = r#"<body><div class="content">late</div><div class="entry-content">early</div></body>"#;
        let (content, _) = extractor().extract_from_html(html, URL).unwrap();
        assert_eq!(content, "early");
    }

    #[test]
    fn test_split_article_is_joined() {
        let html = r#"<body>
            <div class="duet--article--text-component"><p>one</p></div>
            <div class="duet--article--text-component"><p>two</p></div>
        </body>"#;
        let (content, _) = extractor().extract_from_html(html, URL).unwrap();
        assert_eq!(content, "<p>one</p><br/><p>two</p>");
    }

    #[test]
    fn test_density_fallback() {
        let html = format!(
            "<body><div id=\"a\">{}</div><section id=\"b\">{}</section></body>",
            paragraphs("thin", 4),
            paragraphs("dense", 7)
        );
        let (content, boundary) = extractor().extract_from_html(&html, URL).unwrap();
        assert_eq!(boundary, Boundary::Density { paragraphs: 7 });
        assert!(content.contains("dense 6"));
    }

    #[test]
    fn test_density_requires_more_than_min_paragraphs() {
        let html = format!("<body><div>{}</div></body>", paragraphs("p", 3));
        assert!(extractor().extract_from_html(&html, URL).is_none());
    }

    #[test]
    fn test_density_rejects_link_farms() {
        let links: String = (0..20).map(|i| format!("<a href=\"/x{i}\">x</a>")).collect();
        let html = format!("<body><div>{}{links}</div></body>", paragraphs("p", 4));
        assert!(extractor().extract_from_html(&html, URL).is_none());

        let config = ExtractorConfig {
            min_paragraph_link_ratio: None,
            ..Default::default()
        };
        let lenient = extractor_with(StubFetcher::new(), config);
        assert!(lenient.extract_from_html(&html, URL).is_some());
    }

    #[test]
    fn test_junk_removed_before_heuristics() {
        let html = format!(
            "<body><aside><article>{}</article></aside><div class=\"comments\">{}</div><div class=\"main\">{}</div></body>",
            paragraphs("ad", 2),
            paragraphs("comment", 9),
            paragraphs("text", 5)
        );
        let (content, boundary) = extractor().extract_from_html(&html, URL).unwrap();
        assert_eq!(boundary, Boundary::Density { paragraphs: 5 });
        assert!(!content.contains("comment"));
    }

    #[test]
    fn test_junk_wrapping_article_is_ignored() {
        let html = format!(
            "<body><footer><article><p>footer promo</p></article></footer><div>{}</div></body>",
            paragraphs("story", 4)
        );
        let (content, boundary) = extractor().extract_from_html(&html, URL).unwrap();
        assert_eq!(boundary, Boundary::Density { paragraphs: 4 });
        assert!(content.contains("story 3"));
        assert!(!content.contains("footer promo"));
    }

    #[test]
    fn test_junk_removed_before_content_selectors() {
        let html = r#"<body><nav><div class="content">menu</div></nav><div class="content">body</div></body>"#;
        let (content, boundary) = extractor().extract_from_html(html, URL).unwrap();
        assert_eq!(boundary, Boundary::Selector(".content".into()));
        assert_eq!(content, "body");
    }

    #[test]
    fn test_images_normalized_before_extraction() {
        let html = r#"<body><article><img data-src="/img/a.png" srcset="a.png 2x"></article></body>"#;
        let (content, _) = extractor().extract_from_html(html, URL).unwrap();
        assert!(content.contains(r#"src="https://news.example/img/a.png""#));
        assert!(!content.contains("srcset"));
    }

    #[tokio::test]
    async fn test_extract_full_text_unreachable() {
        assert!(extractor().extract_full_text(URL).await.is_none());
    }

    #[tokio::test]
    async fn test_extract_full_text_fetches_through_relay() {
        let stub = StubFetcher::new().ok(URL, "<html><body><article><p>Full</p></article></body></html>");
        let extractor = extractor_with(stub, ExtractorConfig::default());
        assert_eq!(extractor.extract_full_text(URL).await.as_deref(), Some("<p>Full</p>"));
    }

    #[tokio::test]
    async fn test_fetch_for_embedding_injects_base() {
        let stub = StubFetcher::new().ok(URL, "<html><head><title>t</title></head><body><script>x()</script></body></html>");
        let extractor = extractor_with(stub, ExtractorConfig::default());
        let page = extractor.fetch_for_embedding(URL).await.unwrap();
        assert!(page.starts_with(&format!(r#"<html><head><base href="{URL}" target="_blank"><title>"#)));
        assert!(page.contains("<script>x()</script>"));
    }

    #[test]
    fn test_inject_base_without_head() {
        let page = inject_base("<p>bare</p>", "https://a.example/");
        assert_eq!(page, r#"<base href="https://a.example/" target="_blank"><p>bare</p>"#);
    }
}
