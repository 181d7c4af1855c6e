//! Search result parsing and item classification.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{compile_static_regex, compile_static_selector};
use crate::model::{ContentId, ItemKind};

static RESULT_ITEM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("li.image-item"));
static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a"));
static ILLUST_ID_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"illust_id=(\d+)"));

/// Number of anchor classes carried by a single-image result.
const SINGLE_CLASS_COUNT: usize = 3;

/// Class token marking a multi-image result.
const ALBUM_CLASS_TOKEN: &str = "multiple";

/// Classified identifiers from one search page.
///
/// The two sets are disjoint: an identifier keeps the kind of the first
/// fragment it was seen in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    /// Single-image entries.
    pub singles: BTreeSet<ContentId>,
    /// Album entries.
    pub albums: BTreeSet<ContentId>,
    /// Fragments dropped for an unknown layout or a missing identifier.
    pub skipped: usize,
}

impl SearchResults {
    /// Total number of distinct identifiers found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.singles.len() + self.albums.len()
    }

    /// Returns true when the page yielded no usable identifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.albums.is_empty()
    }
}

/// Splits a `class` attribute into its raw tokens, duplicates included.
#[must_use]
pub fn anchor_class_tokens(class_attr: &str) -> Vec<&str> {
    class_attr.split_whitespace().collect()
}

/// Decides an entry's kind from its anchor's class tokens.
///
/// Exactly three classes marks a single image; otherwise the `multiple`
/// token marks an album. Anything else is an unknown layout.
#[must_use]
pub fn classify_anchor(classes: &[&str]) -> Option<ItemKind> {
    if classes.len() == SINGLE_CLASS_COUNT {
        Some(ItemKind::Single)
    } else if classes.contains(&ALBUM_CLASS_TOKEN) {
        Some(ItemKind::Album)
    } else {
        None
    }
}

/// Extracts and classifies every result fragment of a search page.
#[must_use]
pub fn parse_search_results(html: &str) -> SearchResults {
    let document = Html::parse_document(html);
    let mut kinds: BTreeMap<ContentId, ItemKind> = BTreeMap::new();
    let mut skipped = 0usize;

    for item in document.select(&RESULT_ITEM_SELECTOR) {
        let Some((id, kind)) = classify_fragment(item) else {
            skipped += 1;
            continue;
        };
        match kinds.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(kind);
            }
            Entry::Occupied(existing) if *existing.get() != kind => {
                debug!(
                    illust_id = %existing.key(),
                    kept = %existing.get(),
                    ignored = %kind,
                    "identifier seen with conflicting layouts; keeping first"
                );
            }
            Entry::Occupied(_) => {}
        }
    }

    let mut results = SearchResults {
        skipped,
        ..SearchResults::default()
    };
    for (id, kind) in kinds {
        match kind {
            ItemKind::Single => results.singles.insert(id),
            ItemKind::Album => results.albums.insert(id),
        };
    }
    results
}

fn classify_fragment(item: ElementRef<'_>) -> Option<(ContentId, ItemKind)> {
    let fragment = item.html();
    let Some(id) = ILLUST_ID_RE
        .captures(&fragment)
        .and_then(|caps| caps.get(1))
        .map(|m| ContentId::new(m.as_str()))
    else {
        debug!("result fragment without illust_id marker; skipping");
        return None;
    };

    let Some(anchor) = item.select(&ANCHOR_SELECTOR).next() else {
        debug!(illust_id = %id, "result fragment without anchor; skipping");
        return None;
    };
    let class_attr = anchor.value().attr("class").unwrap_or_default();
    let tokens = anchor_class_tokens(class_attr);

    if let Some(kind) = classify_anchor(&tokens) {
        Some((id, kind))
    } else {
        debug!(illust_id = %id, classes = %class_attr, "unknown result layout; skipping");
        None
    }
}
