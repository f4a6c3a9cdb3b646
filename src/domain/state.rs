use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Article;

/// Pagination state of one source.
#[derive(Debug, Clone, Serialize)]
pub struct FeedState {
    pub articles: Vec<Article>,
    pub page: u32,
    pub has_more: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            articles: Vec::new(),
            page: 1,
            has_more: true,
            is_loading: false,
            error: None,
            last_updated: None,
            seen: HashSet::new(),
        }
    }
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything accumulated so far (page-1 reload).
    pub fn reset(&mut self) {
        self.articles.clear();
        self.seen.clear();
    }

    /// Append the articles of `batch` whose id is not yet present.
    /// Returns how many were added.
    pub fn append_new(&mut self, batch: Vec<Article>) -> usize {
        let before = self.articles.len();
        for article in batch {
            if self.seen.insert(article.id()) {
                self.articles.push(article);
            }
        }
        self.articles.len() - before
    }

    /// Look up an article by its `Article::id`.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Article> {
        if !self.seen.contains(id) {
            return None;
        }
        self.articles.iter_mut().find(|a| a.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(key: &str) -> Article {
        Article::new("s", key, format!("https://example.com/{key}"))
    }

    #[test]
    fn test_new_state_defaults() {
        let state = FeedState::new();
        assert_eq!(state.page, 1);
        assert!(state.has_more);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
        assert!(state.articles.is_empty());
    }

    #[test]
    fn test_append_skips_known_and_repeated_keys() {
        let mut state = FeedState::new();
        assert_eq!(state.append_new(vec![article("a"), article("b")]), 2);
        assert_eq!(state.append_new(vec![article("b"), article("c"), article("c")]), 1);

        let keys: Vec<_> = state.articles.iter().map(|a| a.guid.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reset_forgets_seen_keys() {
        let mut state = FeedState::new();
        state.append_new(vec![article("a")]);
        state.reset();
        assert!(state.find_mut(&article("a").id()).is_none());
        assert_eq!(state.append_new(vec![article("a")]), 1);
    }

    #[test]
    fn test_find_by_id() {
        let mut state = FeedState::new();
        state.append_new(vec![article("a"), Article::new("s", "", "https://example.com/bare")]);

        let id = Article::fingerprint("s", "https://example.com/bare");
        let found = state.find_mut(&id).unwrap();
        assert_eq!(found.link, "https://example.com/bare");

        assert!(state.find_mut("a").is_none(), "raw keys are not ids");
        assert!(state.find_mut(&Article::fingerprint("other", "a")).is_none());
    }
}
