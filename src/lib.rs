//! # feedrelay
//!
//! A multi-source article aggregator: syndication feeds, JSON APIs and
//! HTML listing pages fetched through HTTP relays, normalized into one
//! article model, paginated past what each source offers and enriched
//! with full text extracted from the live page.
//!
//! ## Architecture
//!
//! ```text
//! Relay → Parser (syndication | api | listing) → Normalizer → FeedCache
//!                                                    ↓
//!                                           ArticleExtractor (full text)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # List sources
//! feedrelay sources
//!
//! # Second page of Hacker News
//! feedrelay fetch hackernews --page 2
//!
//! # Three pages, deduplicated, with full text
//! feedrelay crawl v2ex --pages 3 --enrich
//!
//! # Page 1 of every source
//! feedrelay refresh
//! ```

/// Application context, reader facade and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together relay,
/// pipeline, extractor and reader from a [`Config`](config::Config).
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Text transform and activity collaborators.
pub mod collab;

/// Configuration loaded from `~/.config/feedrelay/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Source`](domain::Source): a named feed, API or listing page
/// - [`Article`](domain::Article): one normalized entry
/// - [`FeedState`](domain::FeedState): pagination state of one source
pub mod domain;

/// Full-article extraction and background enrichment.
pub mod extract;

/// HTTP transport and relay fallback.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait for plain GETs
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`RelayClient`](fetcher::RelayClient): ordered relay fallback
/// - [`ParallelLoader`](fetcher::parallel::ParallelLoader): concurrent source refresh
pub mod fetcher;

/// Lazy image and relative link rewriting.
pub mod normalizer;

/// Per-source pagination strategies.
pub mod pagination;

/// Syndication, JSON API and listing parsers.
pub mod parser;

/// One `(source, page)` fetch from URL resolution to parsed batch.
pub mod pipeline;

/// In-memory pagination cache.
pub mod store;
