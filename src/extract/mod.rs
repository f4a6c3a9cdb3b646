//! Full-article extraction for feeds that only ship summaries.
//!
//! ```text
//! Article (stub content) → relay fetch → normalize → strip junk → boundary heuristics
//! ```
//!
//! Boundary heuristics run in order and the first hit wins: a semantic
//! `<article>`, the known per-site content selectors, then the block with
//! the highest paragraph density.

mod background;
mod config;
mod extractor;

pub use background::{spawn_enricher, EnrichMessage, Enricher, EnricherHandle};
pub use config::ExtractorConfig;
pub use extractor::{inject_base, ArticleExtractor, Boundary};

use crate::domain::Article;

/// Whether `article` has a link but only stub content.
pub fn needs_extraction(article: &Article, min_content_length: usize) -> bool {
    !article.link.is_empty() && article.content.len() < min_content_length
}
