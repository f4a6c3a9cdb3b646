use std::sync::Arc;

use futures::{stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::domain::Article;
use crate::extract::{needs_extraction, ArticleExtractor};
use crate::store::SharedCache;

#[derive(Debug)]
pub enum EnrichMessage {
    /// Backfill full text for these articles
    EnrichArticles(Vec<Article>),
    Shutdown,
}

/// Handle to queue work for the background enricher.
#[derive(Clone)]
pub struct EnricherHandle {
    tx: mpsc::Sender<EnrichMessage>,
}

impl EnricherHandle {
    pub async fn queue_articles(&self, articles: Vec<Article>) {
        if articles.is_empty() {
            return;
        }
        if let Err(e) = self.tx.send(EnrichMessage::EnrichArticles(articles)).await {
            warn!("Failed to queue articles for enrichment: {}", e);
        }
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(EnrichMessage::Shutdown).await;
    }
}

/// Replaces stub article content in the cache with extracted full text.
pub struct Enricher {
    extractor: Arc<ArticleExtractor>,
    cache: SharedCache,
    rx: mpsc::Receiver<EnrichMessage>,
}

impl Enricher {
    pub fn new(extractor: Arc<ArticleExtractor>, cache: SharedCache) -> (Self, EnricherHandle) {
        let (tx, rx) = mpsc::channel(100);
        let handle = EnricherHandle { tx };
        let enricher = Self { extractor, cache, rx };
        (enricher, handle)
    }

    pub async fn run(mut self) {
        info!("Background enricher started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                EnrichMessage::EnrichArticles(articles) => self.enrich(articles).await,
                EnrichMessage::Shutdown => {
                    info!("Background enricher shutting down");
                    break;
                }
            }
        }
    }

    async fn enrich(&self, articles: Vec<Article>) {
        let config = self.extractor.config();
        let pending: Vec<_> = articles
            .into_iter()
            .filter(|a| needs_extraction(a, config.min_content_length))
            .collect();

        if pending.is_empty() {
            return;
        }
        info!("Enriching {} articles in background", pending.len());

        let results: Vec<_> = stream::iter(pending)
            .map(|article| {
                let extractor = self.extractor.clone();
                async move {
                    let content = extractor.extract_full_text(&article.link).await;
                    (article, content)
                }
            })
            .buffer_unordered(config.max_concurrency.max(1))
            .collect()
            .await;

        let mut cache = match self.cache.lock() {
            Ok(cache) => cache,
            Err(e) => {
                error!("Failed to update enriched articles: {}", e);
                return;
            }
        };

        for (article, content) in results {
            let Some(content) = content else {
                warn!(link = %article.link, "Could not extract full text");
                continue;
            };
            match cache.find_article_mut(&article.source_id, article.dedup_key()) {
                Some(cached) => {
                    cached.set_content(content);
                    info!(link = %article.link, chars = cached.content.len(), "Enriched article");
                }
                None => warn!(link = %article.link, "Enriched article is no longer cached"),
            }
        }
    }
}

pub fn spawn_enricher(extractor: Arc<ArticleExtractor>, cache: SharedCache) -> EnricherHandle {
    let (enricher, handle) = Enricher::new(extractor, cache);

    tokio::spawn(async move {
        enricher.run().await;
    });

    handle
}
