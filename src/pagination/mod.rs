//! Per-source pagination strategies.
//!
//! A strategy says how to reach page N > 1 of a source and which parser
//! understands the result. Sources without an entry get a generic
//! query-parameter probe.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Source, SourceKind};
use crate::parser::{JsonFieldMap, GENERIC_LISTING_SELECTORS};

const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PageMode {
    Syndication,
    Scrape { selector: String },
    Api { fields: JsonFieldMap },
}

/// How to fetch and parse pages of one source.
///
/// `url` is a template: `{page}` is the page number, `{offset}` is
/// `(page - 1) * page_size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationStrategy {
    pub url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(flatten)]
    pub mode: PageMode,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl PaginationStrategy {
    pub fn scrape(url: &str, selector: &str) -> Self {
        Self {
            url: url.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            mode: PageMode::Scrape {
                selector: selector.to_string(),
            },
        }
    }

    pub fn api(url: &str, page_size: u32, fields: JsonFieldMap) -> Self {
        Self {
            url: url.to_string(),
            page_size,
            mode: PageMode::Api { fields },
        }
    }

    pub fn url_for(&self, page: u32) -> String {
        let offset = page.saturating_sub(1) * self.page_size;
        self.url
            .replace("{page}", &page.to_string())
            .replace("{offset}", &offset.to_string())
    }
}

/// What the pipeline should do with the fetched body.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchPlan {
    Syndication,
    Scrape { selector: String },
    Api { fields: JsonFieldMap },
    /// Syndication first; a generic listing scrape if the body is not XML.
    Probe,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub url: String,
    pub plan: FetchPlan,
}

#[derive(Debug, Clone, Default)]
pub struct StrategyTable {
    entries: HashMap<String, PaginationStrategy>,
}

impl StrategyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let entries = [
            (
                "cnbeta",
                PaginationStrategy::scrape(
                    "https://m.cnbeta.com.tw/list/latest/{page}",
                    ".list .item a, .list-box .item a, .txt-list li a",
                ),
            ),
            (
                "hackernews",
                PaginationStrategy::scrape("https://news.ycombinator.com/news?p={page}", ".titleline > a"),
            ),
            (
                "v2ex",
                PaginationStrategy::scrape("https://www.v2ex.com/recent?p={page}", ".item_title > a"),
            ),
            (
                "ithome",
                PaginationStrategy::scrape(
                    "https://www.ithome.com/list/list_{page}.html",
                    ".list_1 li .block h2 a",
                ),
            ),
            (
                "landian",
                PaginationStrategy::scrape(
                    "https://www.landiannews.com/page/{page}",
                    ".article-title a, header h2 a, .post-title a",
                ),
            ),
            (
                "ifanr",
                PaginationStrategy::scrape(
                    "https://www.ifanr.com/page/{page}",
                    ".article-item h3 a, .article-info h3 a",
                ),
            ),
            (
                "sspai",
                PaginationStrategy::api(
                    "https://sspai.com/api/v1/article/index/page/get?limit=20&offset={offset}",
                    20,
                    JsonFieldMap::sspai(),
                ),
            ),
        ];

        Self {
            entries: entries
                .into_iter()
                .map(|(id, strategy)| (id.to_string(), strategy))
                .collect(),
        }
    }

    /// Add or replace entries.
    pub fn with_overrides(mut self, overrides: HashMap<String, PaginationStrategy>) -> Self {
        self.entries.extend(overrides);
        self
    }

    pub fn get(&self, source_id: &str) -> Option<&PaginationStrategy> {
        self.entries.get(source_id)
    }

    pub fn resolve(&self, source: &Source, page: u32) -> PageRequest {
        let entry = self.get(&source.id);

        if page <= 1 {
            return PageRequest {
                url: source.url.clone(),
                plan: first_page_plan(source.kind, entry),
            };
        }

        match entry {
            Some(strategy) => PageRequest {
                url: strategy.url_for(page),
                plan: match &strategy.mode {
                    PageMode::Syndication => FetchPlan::Syndication,
                    PageMode::Scrape { selector } => FetchPlan::Scrape {
                        selector: selector.clone(),
                    },
                    PageMode::Api { fields } => FetchPlan::Api {
                        fields: fields.clone(),
                    },
                },
            },
            None => PageRequest {
                url: generic_page_url(&source.url, page),
                plan: FetchPlan::Probe,
            },
        }
    }
}

/// Page 1 always uses the canonical URL; the entry only contributes the
/// parser parameters for non-syndication sources.
fn first_page_plan(kind: SourceKind, entry: Option<&PaginationStrategy>) -> FetchPlan {
    let mode = entry.map(|s| &s.mode);
    match kind {
        SourceKind::Syndication => FetchPlan::Syndication,
        SourceKind::Listing => match mode {
            Some(PageMode::Scrape { selector }) => FetchPlan::Scrape {
                selector: selector.clone(),
            },
            _ => FetchPlan::Scrape {
                selector: GENERIC_LISTING_SELECTORS.to_string(),
            },
        },
        SourceKind::Api => match mode {
            Some(PageMode::Api { fields }) => FetchPlan::Api {
                fields: fields.clone(),
            },
            _ => FetchPlan::Api {
                fields: JsonFieldMap::default(),
            },
        },
    }
}

pub fn generic_page_url(url: &str, page: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}page={page}&p={page}")
}
