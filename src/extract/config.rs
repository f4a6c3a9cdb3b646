use serde::{Deserialize, Serialize};

/// Tuning for full-article extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Boilerplate removed before any boundary heuristic runs
    pub remove_selectors: Vec<String>,

    /// Known per-site content containers, in priority order
    pub content_selectors: Vec<String>,

    /// Joins the containers of a site that splits one article across several
    pub separator: String,

    /// Density fallback only considers containers with more paragraphs than this (default: 3)
    pub min_paragraphs: usize,

    /// Paragraph-to-link ratio a density candidate must exceed (default: 0.3).
    /// Set to 0 to accept link-heavy containers.
    pub min_paragraph_link_ratio: Option<f64>,

    /// Content shorter than this counts as a feed stub (default: 200)
    pub min_content_length: usize,

    /// Concurrent extractions in background enrichment (default: 5)
    pub max_concurrency: usize,

    /// Backfill stub articles in the background after every load (default: false)
    pub background: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            remove_selectors: strings(&[
                "script",
                "style",
                "iframe",
                "nav",
                "header",
                "footer",
                ".ads",
                ".advertisement",
                ".social-share",
                ".comments",
                "#comments",
                ".sidebar",
                ".related-posts",
                ".newsletter-signup",
                ".cookie-consent",
                "button",
                "form",
                ".layout-header",
                ".layout-footer",
                ".cb-modal",
                ".is-hidden",
                ".visually-hidden",
                "#ad_container",
                "aside",
            ]),
            content_selectors: strings(&[
                ".post-content",
                ".article-content",
                ".entry-content",
                ".c-entry-content",
                ".duet--article--text-component",
                ".rich_media_content",
                ".main-content",
                "#content",
                ".article-body",
                ".story-body",
                ".topic-content",
                ".post_content",
                "#art_content",
                ".article-cont",
                ".content",
                // ITHome
                ".article-detail",
                // Solidot
                ".news_content",
            ]),
            separator: "<br/>".to_string(),
            min_paragraphs: 3,
            min_paragraph_link_ratio: Some(0.3),
            min_content_length: 200,
            max_concurrency: 5,
            background: false,
        }
    }
}
