//! In-memory per-source pagination cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::app::{FeedRelayError, Result};
use crate::domain::{Article, FeedState};

pub const DEFAULT_STALE_AFTER_SECS: i64 = 300;

/// Result of applying one successful page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    pub page: u32,
    pub fetched: usize,
    pub added: usize,
    pub has_more: bool,
}

/// Outcome of claiming the next page of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClaim {
    /// The caller owns the load of this page
    Page(u32),
    Busy,
    Exhausted,
}

#[derive(Debug)]
pub struct FeedCache {
    states: HashMap<String, FeedState>,
    stale_after: Duration,
}

impl Default for FeedCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_STALE_AFTER_SECS))
    }
}

impl FeedCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            states: HashMap::new(),
            stale_after,
        }
    }

    pub fn get(&self, source_id: &str) -> Option<&FeedState> {
        self.states.get(source_id)
    }

    /// Mark `source_id` as in flight. Returns false if a load is already
    /// running for it, in which case the caller must not fetch.
    pub fn begin_load(&mut self, source_id: &str) -> bool {
        let state = self.states.entry(source_id.to_string()).or_default();
        if state.is_loading {
            debug!(source_id, "Load already in flight");
            return false;
        }
        state.is_loading = true;
        state.error = None;
        true
    }

    /// Pick the page after the last loaded one and mark the source in
    /// flight, in one step. An empty source starts at page 1.
    pub fn begin_load_next(&mut self, source_id: &str) -> PageClaim {
        let state = self.states.entry(source_id.to_string()).or_default();
        if state.is_loading {
            debug!(source_id, "Load already in flight");
            return PageClaim::Busy;
        }
        if !state.has_more {
            return PageClaim::Exhausted;
        }

        let next = if state.articles.is_empty() { 1 } else { state.page + 1 };
        state.is_loading = true;
        state.error = None;
        PageClaim::Page(next)
    }

    /// Clear the in-flight mark without applying a result.
    pub fn abandon_load(&mut self, source_id: &str) {
        if let Some(state) = self.states.get_mut(source_id) {
            state.is_loading = false;
        }
    }

    /// Fold a page result into the state of `source_id`.
    ///
    /// A page 1 failure is stored and returned to the caller. Failures of
    /// later pages end the pagination silently.
    pub fn apply(
        &mut self,
        source_id: &str,
        page: u32,
        result: Result<Vec<Article>>,
    ) -> Result<LoadOutcome> {
        let state = self.states.entry(source_id.to_string()).or_default();
        state.is_loading = false;

        let batch = match result {
            Ok(batch) => batch,
            Err(e) if page <= 1 => {
                state.error = Some(e.to_string());
                return Err(e);
            }
            Err(e) => {
                debug!(source_id, page, error = %e, "Treating failed page as end of feed");
                state.error = None;
                state.has_more = false;
                return Ok(LoadOutcome {
                    page: state.page,
                    fetched: 0,
                    added: 0,
                    has_more: false,
                });
            }
        };

        if page <= 1 {
            state.reset();
        }

        let fetched = batch.len();
        let added = state.append_new(batch);
        state.page = page.max(1);
        state.has_more = fetched > 0 && added > 0;
        state.last_updated = Some(Utc::now());
        state.error = None;

        info!(source_id, page, fetched, added, has_more = state.has_more, "Applied page");
        Ok(LoadOutcome {
            page: state.page,
            fetched,
            added,
            has_more: state.has_more,
        })
    }

    /// Whether page 1 of `source_id` can be served from the cache.
    pub fn is_fresh(&self, source_id: &str, now: DateTime<Utc>) -> bool {
        self.states
            .get(source_id)
            .and_then(|state| {
                if state.articles.is_empty() {
                    return None;
                }
                state.last_updated
            })
            .is_some_and(|updated| now - updated < self.stale_after)
    }

    /// The cached article of `source_id` whose dedup key is `key`.
    pub fn find_article_mut(&mut self, source_id: &str, key: &str) -> Option<&mut Article> {
        let id = Article::fingerprint(source_id, key);
        self.states.get_mut(source_id)?.find_mut(&id)
    }
}

/// A `FeedCache` shared between the reader and background workers.
#[derive(Debug, Clone, Default)]
pub struct SharedCache(Arc<Mutex<FeedCache>>);

impl SharedCache {
    pub fn new(cache: FeedCache) -> Self {
        Self(Arc::new(Mutex::new(cache)))
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, FeedCache>> {
        self.0
            .lock()
            .map_err(|e| FeedRelayError::Other(format!("Feed cache lock poisoned: {e}")))
    }

    /// Clear the in-flight mark of `source_id` even when the lock is
    /// poisoned, so a failed load never leaves the source busy.
    pub fn abandon_load(&self, source_id: &str) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abandon_load(source_id);
    }
}
