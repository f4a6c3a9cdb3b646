//! Fetch one `(source, page)` batch: resolve the strategy, fetch through
//! the relays, dispatch to the matching parser.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::app::{FeedRelayError, Result};
use crate::domain::{Article, Source};
use crate::fetcher::RelayClient;
use crate::pagination::{FetchPlan, PageRequest, StrategyTable};
use crate::parser::{api, listing, syndication, GENERIC_LISTING_SELECTORS};

pub struct FeedPipeline {
    relay: Arc<RelayClient>,
    strategies: Arc<StrategyTable>,
}

impl FeedPipeline {
    pub fn new(relay: Arc<RelayClient>, strategies: Arc<StrategyTable>) -> Self {
        Self { relay, strategies }
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    /// Fetch page `page` of `source`.
    ///
    /// Only page 1 can fail. For later pages any failure is the normal end
    /// of the stream and yields an empty batch.
    #[instrument(level = "info", skip(self, source), fields(source = %source.id))]
    pub async fn fetch_page(&self, source: &Source, page: u32) -> Result<Vec<Article>> {
        match self.try_fetch_page(source, page).await {
            Ok(articles) => {
                info!(count = articles.len(), "Fetched page");
                Ok(articles)
            }
            Err(e) if page > 1 => {
                debug!(error = %e, "Pagination stopped");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn try_fetch_page(&self, source: &Source, page: u32) -> Result<Vec<Article>> {
        let PageRequest { url, plan } = self.strategies.resolve(source, page);
        debug!(%url, ?plan, "Resolved page request");

        let body = self
            .relay
            .fetch_text(&url)
            .await
            .ok_or_else(|| FeedRelayError::Unavailable(url.clone()))?;

        match plan {
            FetchPlan::Syndication => syndication::parse_feed(&body, &source.id, &source.url),
            FetchPlan::Scrape { selector } => {
                Ok(listing::scrape_listing(&body, &url, &selector, &source.id))
            }
            FetchPlan::Api { fields } => api::parse_json(&body, &fields, &source.id),
            FetchPlan::Probe => match syndication::parse_feed(&body, &source.id, &source.url) {
                Ok(articles) => Ok(articles),
                Err(e) => {
                    debug!(error = %e, "Not a feed, scraping as a listing page");
                    Ok(listing::scrape_listing(
                        &body,
                        &url,
                        GENERIC_LISTING_SELECTORS,
                        &source.id,
                    ))
                }
            },
        }
    }
}
