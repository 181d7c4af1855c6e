//! Error types for page extraction.

use thiserror::Error;

/// Shape errors raised while extracting data from fetched pages.
///
/// All variants are fatal to the one item being resolved and never to the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    /// An element the page layout always carries was not found.
    #[error("expected element not found: {element}")]
    MissingElement {
        /// Selector or description of the missing element.
        element: &'static str,
    },

    /// The metadata tag does not follow the `「title」/「artist」[site]` format.
    #[error("metadata title does not match the expected pattern: {raw:?}")]
    TitlePattern {
        /// Raw tag content.
        raw: String,
    },

    /// The detail page carries no original-image element.
    #[error("no original image URL on the page")]
    ImageNotFound,

    /// An album image URL carries no `p<digits>` page marker.
    #[error("no page ordinal in image URL {url}")]
    MissingOrdinal {
        /// Offending URL.
        url: String,
    },
}
