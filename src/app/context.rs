use std::sync::Arc;

use crate::app::error::Result;
use crate::app::Reader;
use crate::config::Config;
use crate::extract::ArticleExtractor;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::parallel::{ParallelLoader, DEFAULT_WORKERS};
use crate::fetcher::{Fetcher, RelayClient};
use crate::pipeline::FeedPipeline;
use crate::store::{FeedCache, SharedCache};

pub struct AppContext {
    pub config: Config,
    pub relay: Arc<RelayClient>,
    pub pipeline: Arc<FeedPipeline>,
    pub extractor: Arc<ArticleExtractor>,
    pub reader: Arc<Reader>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_workers(config, DEFAULT_WORKERS)
    }

    pub fn with_workers(config: Config, workers: usize) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(
            config.relay.timeout(),
            &config.relay.user_agent,
        )?);
        Ok(Self::with_fetcher(config, fetcher, workers))
    }

    /// Wire everything on top of an arbitrary transport.
    pub fn with_fetcher(
        config: Config,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        workers: usize,
    ) -> Self {
        let relay = Arc::new(RelayClient::new(fetcher, config.relay.clone()));
        let pipeline = Arc::new(FeedPipeline::new(
            relay.clone(),
            Arc::new(config.strategy_table()),
        ));
        let extractor = Arc::new(ArticleExtractor::new(
            relay.clone(),
            config.extractor.clone(),
        ));
        let cache = SharedCache::new(FeedCache::new(config.cache.stale_after()));

        let reader = Reader::new(
            config.sources.clone(),
            pipeline.clone(),
            extractor.clone(),
            cache,
            ParallelLoader::with_workers(workers),
        )
        .with_transforms(config.transform.rewriter(), config.transform.summarizer())
        .with_auto_enrich(config.extractor.background);

        Self {
            config,
            relay,
            pipeline,
            extractor,
            reader: Arc::new(reader),
        }
    }
}
