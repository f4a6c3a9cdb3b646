//! Format parsers: syndication XML, JSON APIs and HTML listing pages.

pub mod api;
pub mod listing;
pub mod syndication;
mod xml;

use scraper::{ElementRef, Selector};
use tracing::warn;

pub use api::{JsonFieldMap, TimestampUnit};
pub use listing::{scrape_listing, GENERIC_LISTING_SELECTORS};
pub use syndication::parse_feed;

/// Evaluate `query` for each candidate in order; the first non-empty
/// result wins.
pub fn first_non_empty<'c, C, T, F>(candidates: &'c [C], mut query: F) -> Option<(&'c C, Vec<T>)>
where
    F: FnMut(&C) -> Vec<T>,
{
    candidates.iter().find_map(|candidate| {
        let found = query(candidate);
        (!found.is_empty()).then_some((candidate, found))
    })
}

/// All elements under `scope` matching `selector`. An invalid selector
/// matches nothing. Scoping to an element skips nodes detached from the tree.
pub fn select_all<'a>(scope: ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(parsed) => scope.select(&parsed).collect(),
        Err(e) => {
            warn!(selector, error = %e, "Ignoring invalid selector");
            Vec::new()
        }
    }
}
