//! Per-source loading on top of the pipeline and the pagination cache.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::app::{FeedRelayError, Result};
use crate::collab::{
    clip, ActivitySink, TextTransform, TracingActivity, UnconfiguredTransform, REWRITE_MAX_CHARS,
    SUMMARY_MAX_CHARS,
};
use crate::domain::{Article, FeedState, Source};
use crate::extract::{needs_extraction, spawn_enricher, ArticleExtractor, Enricher, EnricherHandle};
use crate::fetcher::parallel::ParallelLoader;
use crate::pipeline::FeedPipeline;
use crate::store::{LoadOutcome, PageClaim, SharedCache};

/// What a load request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded(LoadOutcome),
    /// Page 1 is still fresh in the cache
    Cached,
    /// Another load of the same source is in flight
    Busy,
    /// The source has no more pages
    Exhausted,
}

pub struct Reader {
    sources: Vec<Source>,
    pipeline: Arc<FeedPipeline>,
    extractor: Arc<ArticleExtractor>,
    cache: SharedCache,
    loader: ParallelLoader,
    enricher: OnceLock<EnricherHandle>,
    auto_enrich: bool,
    rewriter: Box<dyn TextTransform>,
    summarizer: Box<dyn TextTransform>,
    activity: Box<dyn ActivitySink>,
}

impl Reader {
    pub fn new(
        sources: Vec<Source>,
        pipeline: Arc<FeedPipeline>,
        extractor: Arc<ArticleExtractor>,
        cache: SharedCache,
        loader: ParallelLoader,
    ) -> Self {
        Self {
            sources,
            pipeline,
            extractor,
            cache,
            loader,
            enricher: OnceLock::new(),
            auto_enrich: false,
            rewriter: Box::new(UnconfiguredTransform),
            summarizer: Box::new(UnconfiguredTransform),
            activity: Box::new(TracingActivity),
        }
    }

    pub fn with_transforms(
        mut self,
        rewriter: Box<dyn TextTransform>,
        summarizer: Box<dyn TextTransform>,
    ) -> Self {
        self.rewriter = rewriter;
        self.summarizer = summarizer;
        self
    }

    pub fn with_activity(mut self, activity: Box<dyn ActivitySink>) -> Self {
        self.activity = activity;
        self
    }

    /// Queue every loaded batch for background full-text enrichment.
    pub fn with_auto_enrich(mut self, enabled: bool) -> Self {
        self.auto_enrich = enabled;
        self
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn source(&self, id: &str) -> Result<&Source> {
        self.sources
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| FeedRelayError::SourceNotFound(id.to_string()))
    }

    /// A copy of the current state of `source_id`.
    pub fn snapshot(&self, source_id: &str) -> Result<Option<FeedState>> {
        Ok(self.cache.lock()?.get(source_id).cloned())
    }

    /// Load page 1, reusing the cached articles while they are fresh.
    #[instrument(level = "info", skip(self))]
    pub async fn load(&self, source_id: &str, force_refresh: bool) -> Result<LoadStatus> {
        let source = self.source(source_id)?;

        if !force_refresh && self.cache.lock()?.is_fresh(source_id, Utc::now()) {
            debug!("Serving page 1 from cache");
            return Ok(LoadStatus::Cached);
        }

        self.load_page(source, 1).await
    }

    /// Load the page after the last loaded one.
    #[instrument(level = "info", skip(self))]
    pub async fn load_more(&self, source_id: &str) -> Result<LoadStatus> {
        let source = self.source(source_id)?;

        let claim = self.cache.lock()?.begin_load_next(source_id);
        match claim {
            PageClaim::Page(page) => self.fetch_and_apply(source, page).await,
            PageClaim::Busy => Ok(LoadStatus::Busy),
            PageClaim::Exhausted => Ok(LoadStatus::Exhausted),
        }
    }

    /// Force-load page 1, then keep loading until `pages` pages are in or
    /// the source stops yielding. Returns one status per request made.
    pub async fn crawl(&self, source_id: &str, pages: u32) -> Result<Vec<LoadStatus>> {
        let mut statuses = vec![self.load(source_id, true).await?];
        while statuses.len() < pages as usize {
            let more = match statuses.last() {
                Some(LoadStatus::Loaded(outcome)) => outcome.has_more,
                Some(LoadStatus::Cached) => true,
                _ => false,
            };
            if !more {
                break;
            }
            statuses.push(self.load_more(source_id).await?);
        }
        Ok(statuses)
    }

    async fn load_page(&self, source: &Source, page: u32) -> Result<LoadStatus> {
        if !self.cache.lock()?.begin_load(&source.id) {
            return Ok(LoadStatus::Busy);
        }
        self.fetch_and_apply(source, page).await
    }

    /// Fetch `page` for a source already marked in flight and fold it into
    /// the cache.
    async fn fetch_and_apply(&self, source: &Source, page: u32) -> Result<LoadStatus> {
        let result = self.pipeline.fetch_page(source, page).await;
        let batch = match (&result, self.auto_enrich) {
            (Ok(batch), true) => batch.clone(),
            _ => Vec::new(),
        };

        let applied = match self.cache.lock() {
            Ok(mut cache) => cache.apply(&source.id, page, result),
            Err(e) => {
                self.cache.abandon_load(&source.id);
                return Err(e);
            }
        };
        let outcome = applied?;

        if !batch.is_empty() {
            self.enrich_in_background(batch).await;
        }
        Ok(LoadStatus::Loaded(outcome))
    }

    /// Reload page 1 of every source concurrently.
    pub async fn refresh_all(self: &Arc<Self>) -> Vec<(String, Result<LoadStatus>)> {
        let ids = self.sources.iter().map(|s| s.id.clone()).collect();
        self.loader.load_all(self.clone(), ids).await
    }

    fn cached_article(&self, source_id: &str, key: &str) -> Result<Article> {
        let mut cache = self.cache.lock()?;
        cache
            .find_article_mut(source_id, key)
            .map(|a| a.clone())
            .ok_or_else(|| FeedRelayError::ArticleNotFound(format!("{source_id}/{key}")))
    }

    /// Return the article, with its content replaced by the extracted full
    /// text when the feed only carried a stub. An extraction miss keeps the
    /// feed content.
    #[instrument(level = "info", skip(self))]
    pub async fn open_article(&self, source_id: &str, key: &str) -> Result<Article> {
        let mut article = self.cached_article(source_id, key)?;

        let min_len = self.extractor.config().min_content_length;
        if needs_extraction(&article, min_len) {
            match self.extractor.extract_full_text(&article.link).await {
                Some(content) => {
                    if let Some(cached) = self.cache.lock()?.find_article_mut(source_id, key) {
                        cached.set_content(content.clone());
                    }
                    article.set_content(content);
                }
                None => info!(link = %article.link, "Keeping feed content"),
            }
        }

        self.activity
            .announce("read", &article.title, &article.link, source_id);
        Ok(article)
    }

    pub async fn rewrite_article(&self, source_id: &str, key: &str) -> Result<String> {
        let article = self.open_article(source_id, key).await?;
        self.activity
            .announce("rewrite", &article.title, &article.link, source_id);
        Ok(self
            .rewriter
            .transform(clip(&article.content, REWRITE_MAX_CHARS))
            .await)
    }

    pub async fn summarize_article(&self, source_id: &str, key: &str) -> Result<String> {
        let article = self.open_article(source_id, key).await?;
        self.activity
            .announce("summarize", &article.title, &article.link, source_id);
        Ok(self
            .summarizer
            .transform(clip(&article.content, SUMMARY_MAX_CHARS))
            .await)
    }

    /// Hand articles to the background enricher, starting it on first use.
    pub async fn enrich_in_background(&self, articles: Vec<Article>) {
        let handle = self
            .enricher
            .get_or_init(|| spawn_enricher(self.extractor.clone(), self.cache.clone()));
        handle.queue_articles(articles).await;
    }

    /// Backfill full text for every stub article of `source_id` and wait
    /// for it. Returns how many stubs were attempted.
    pub async fn enrich_source(&self, source_id: &str) -> Result<usize> {
        let min_len = self.extractor.config().min_content_length;
        let stubs: Vec<Article> = {
            let cache = self.cache.lock()?;
            cache
                .get(source_id)
                .map(|state| {
                    state
                        .articles
                        .iter()
                        .filter(|a| needs_extraction(a, min_len))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        let count = stubs.len();
        let (enricher, handle) = Enricher::new(self.extractor.clone(), self.cache.clone());
        handle.queue_articles(stubs).await;
        handle.shutdown().await;
        enricher.run().await;
        Ok(count)
    }

    /// Stop the background enricher if it was started.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.enricher.get() {
            handle.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::collab::NoopActivity;
    use crate::extract::ExtractorConfig;
    use crate::fetcher::stub::StubFetcher;
    use crate::fetcher::{RelayClient, RelayConfig};
    use crate::pagination::StrategyTable;
    use crate::pipeline::tests::rss_with_items;

    const FEED: &str = "https://example.com/feed";

    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl ActivitySink for Recorder {
        fn announce(&self, action: &str, title: &str, _link: &str, _source_id: &str) {
            self.0.lock().unwrap().push(format!("{action}:{title}"));
        }
    }

    struct Echo;

    #[async_trait]
    impl TextTransform for Echo {
        async fn transform(&self, content: &str) -> String {
            format!("len={}", content.chars().count())
        }
    }

    fn reader(stub: StubFetcher) -> Reader {
        reader_over(Arc::new(stub))
    }

    fn reader_over(stub: Arc<StubFetcher>) -> Reader {
        let relay = Arc::new(RelayClient::new(stub, RelayConfig::direct()));
        let pipeline = Arc::new(FeedPipeline::new(relay.clone(), Arc::new(StrategyTable::new())));
        let extractor = Arc::new(ArticleExtractor::new(relay, ExtractorConfig::default()));
        Reader::new(
            vec![Source::new("example", "Example", FEED)],
            pipeline,
            extractor,
            SharedCache::default(),
            ParallelLoader::with_workers(2),
        )
        .with_activity(Box::new(NoopActivity))
    }

    #[tokio::test]
    async fn test_load_then_cached() {
        let reader = reader(StubFetcher::new().ok(FEED, &rss_with_items(0..10)));

        let status = reader.load("example", false).await.unwrap();
        let LoadStatus::Loaded(outcome) = status else {
            panic!("expected a load, got {status:?}");
        };
        assert_eq!(outcome.added, 10);
        assert!(outcome.has_more);

        assert_eq!(reader.load("example", false).await.unwrap(), LoadStatus::Cached);
        assert!(matches!(
            reader.load("example", true).await.unwrap(),
            LoadStatus::Loaded(_)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_second_page_exhausts() {
        let stub = StubFetcher::new()
            .ok(FEED, &rss_with_items(0..10))
            .ok("https://example.com/feed?page=2&p=2", &rss_with_items(0..10));
        let reader = reader(stub);

        reader.load("example", false).await.unwrap();
        let LoadStatus::Loaded(outcome) = reader.load_more("example").await.unwrap() else {
            panic!("expected page 2 to load");
        };
        assert_eq!(outcome.page, 2);
        assert_eq!(outcome.added, 0);
        assert!(!outcome.has_more);

        assert_eq!(reader.load_more("example").await.unwrap(), LoadStatus::Exhausted);
        let state = reader.snapshot("example").unwrap().unwrap();
        assert_eq!(state.articles.len(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_load_more_never_repeats_a_page() {
        const PAGE_TWO: &str = "https://example.com/feed?page=2&p=2";
        let stub = Arc::new(
            StubFetcher::new()
                .ok(FEED, &rss_with_items(0..10))
                .ok(PAGE_TWO, &rss_with_items(10..20)),
        );
        let reader = Arc::new(reader_over(stub.clone()));
        reader.load("example", false).await.unwrap();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let reader = reader.clone();
                tokio::spawn(async move { reader.load_more("example").await.unwrap() })
            })
            .collect();
        let mut added = 0;
        for task in tasks {
            if let LoadStatus::Loaded(outcome) = task.await.unwrap() {
                added += outcome.added;
            }
        }

        assert_eq!(added, 10);
        assert_eq!(stub.calls().iter().filter(|u| *u == PAGE_TWO).count(), 1);
        let state = reader.snapshot("example").unwrap().unwrap();
        assert_eq!(state.articles.len(), 20);
        assert_eq!(state.page, 2);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_crawl_stops_when_source_runs_out() {
        let stub = StubFetcher::new()
            .ok(FEED, &rss_with_items(0..10))
            .ok("https://example.com/feed?page=2&p=2", &rss_with_items(0..10));
        let reader = reader(stub);

        let statuses = reader.crawl("example", 5).await.unwrap();
        assert_eq!(statuses.len(), 2);
        assert!(matches!(statuses[1], LoadStatus::Loaded(o) if !o.has_more));
        assert_eq!(reader.load_more("example").await.unwrap(), LoadStatus::Exhausted);

        let statuses = reader.crawl("example", 0).await.unwrap();
        assert_eq!(statuses.len(), 1, "page 1 always loads");
    }

    #[tokio::test]
    async fn test_page_one_failure_surfaces() {
        let reader = reader(StubFetcher::new());
        let result = reader.load("example", false).await;
        assert!(matches!(result, Err(FeedRelayError::Unavailable(_))));

        let state = reader.snapshot("example").unwrap().unwrap();
        assert!(state.error.is_some());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let reader = reader(StubFetcher::new());
        assert!(matches!(
            reader.load("nope", false).await,
            Err(FeedRelayError::SourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_open_article_extracts_stub() {
        let stub = StubFetcher::new()
            .ok(FEED, &rss_with_items(0..2))
            .ok("https://example.com/1", "<body><article><p>The whole story</p></article></body>");
        let log = Arc::new(Mutex::new(Vec::new()));
        let reader = reader(stub).with_activity(Box::new(Recorder(log.clone())));
        reader.load("example", false).await.unwrap();

        let article = reader.open_article("example", "g1").await.unwrap();
        assert_eq!(article.content, "<p>The whole story</p>");

        let state = reader.snapshot("example").unwrap().unwrap();
        assert_eq!(state.articles[1].snippet, "The whole story");

        // extraction miss keeps the feed content
        let article = reader.open_article("example", "g0").await.unwrap();
        assert_eq!(article.content, "Body 0");

        assert_eq!(
            *log.lock().unwrap(),
            vec!["read:Item number 1".to_string(), "read:Item number 0".to_string()]
        );
    }

    #[tokio::test]
    async fn test_open_unknown_article() {
        let reader = reader(StubFetcher::new().ok(FEED, &rss_with_items(0..1)));
        reader.load("example", false).await.unwrap();
        assert!(matches!(
            reader.open_article("example", "missing").await,
            Err(FeedRelayError::ArticleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_summarize_clips_input() {
        let long_body = "y".repeat(20_000);
        let feed = format!(
            "<rss><channel><item><title>Long one</title><link>https://example.com/l</link><guid>l</guid><description>{long_body}</description></item></channel></rss>"
        );
        let reader = reader(StubFetcher::new().ok(FEED, &feed))
            .with_transforms(Box::new(Echo), Box::new(Echo));
        reader.load("example", false).await.unwrap();

        assert_eq!(reader.summarize_article("example", "l").await.unwrap(), "len=15000");
        assert_eq!(reader.rewrite_article("example", "l").await.unwrap(), "len=20000");
    }

    #[tokio::test]
    async fn test_enrich_source_waits_for_backfill() {
        let stub = StubFetcher::new()
            .ok(FEED, &rss_with_items(0..1))
            .ok("https://example.com/0", "<body><div class=\"post-content\">Long form</div></body>");
        let reader = reader(stub);
        reader.load("example", false).await.unwrap();

        assert_eq!(reader.enrich_source("example").await.unwrap(), 1);
        let state = reader.snapshot("example").unwrap().unwrap();
        assert_eq!(state.articles[0].content, "Long form");
    }

    #[tokio::test]
    async fn test_refresh_all_loads_every_source() {
        let reader = Arc::new(reader(StubFetcher::new().ok(FEED, &rss_with_items(0..3))));
        let results = reader.refresh_all().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "example");
        assert!(matches!(results[0].1, Ok(LoadStatus::Loaded(_))));
    }
}
