//! HTML extraction for search results, detail pages, and album listings.
//!
//! All functions here are synchronous and return owned data: parsed DOM trees
//! are not `Send` and must never live across an `.await` in the crawler.
//!
//! - [`parse_search_results`] - classified identifier sets for one search page
//! - [`classify_anchor`] - the single-vs-album heuristic
//! - [`parse_item_metadata`] / [`parse_title_artist`] - title and artist
//! - [`find_original_image`] / [`album_image_urls`] - image URLs
//! - [`album_ordinal`] - page number embedded in an album image URL

mod error;
mod illust;
mod search;

pub use error::PageError;
pub use illust::{
    SITE_TAG, album_image_urls, album_ordinal, find_original_image, parse_item_metadata,
    parse_title_artist,
};
pub use search::{SearchResults, anchor_class_tokens, classify_anchor, parse_search_results};

use regex::Regex;
use scraper::Selector;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Compiles a CSS selector at static init; panics on invalid selector.
pub(crate) fn compile_static_selector(selector: &str) -> Selector {
    Selector::parse(selector)
        .unwrap_or_else(|e| panic!("invalid static selector '{selector}': {e:?}"))
}
