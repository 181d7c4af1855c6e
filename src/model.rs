//! Core data types shared by the page parser, resolver, and downloader.

use std::fmt;

/// Identifier of one gallery entry, as assigned by the source site.
///
/// Kept as the raw digit string extracted from the search results so it can be
/// spliced back into page URLs unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    /// Wraps a raw identifier string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Layout of a gallery entry, decided once from its search-result anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// One image per entry.
    Single,
    /// Multi-image set served from a separate listing page.
    Album,
}

impl ItemKind {
    /// Returns the stable label used in log output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Album => "album",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Title and artist parsed from an entry's metadata tag.
///
/// Both fields are already stripped of `|` and `/` when produced by
/// [`crate::page::parse_title_artist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMetadata {
    /// Work title.
    pub title: String,
    /// Artist display name.
    pub artist: String,
}

impl ItemMetadata {
    /// Creates metadata from already-cleaned fields.
    #[must_use]
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// Returns the `<title> - <artist>` stem shared by single files and album directories.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

/// One image to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Absolute image URL as found on the page.
    pub source_url: String,
    /// Album page marker digits taken from the URL, as written; `None` for
    /// single images.
    pub ordinal: Option<String>,
}

impl ImageReference {
    /// Reference to the only image of a single entry.
    #[must_use]
    pub fn single(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ordinal: None,
        }
    }

    /// Reference to one page of an album.
    #[must_use]
    pub fn album_page(source_url: impl Into<String>, ordinal: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ordinal: Some(ordinal.into()),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ordinal {
            Some(ordinal) => write!(f, "p{ordinal} {}", self.source_url),
            None => f.write_str(&self.source_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_display_is_raw_value() {
        let id = ContentId::new("66612345");
        assert_eq!(id.to_string(), "66612345");
        assert_eq!(id.as_str(), "66612345");
    }

    #[test]
    fn test_item_metadata_display_name() {
        let meta = ItemMetadata::new("Sample Title", "Artist·Name");
        assert_eq!(meta.display_name(), "Sample Title - Artist·Name");
    }

    #[test]
    fn test_image_reference_constructors() {
        assert_eq!(ImageReference::single("https://x/a.png").ordinal, None);
        assert_eq!(
            ImageReference::album_page("https://x/a_p03.png", "03").ordinal,
            Some("03".to_string())
        );
    }

    #[test]
    fn test_image_reference_display() {
        assert_eq!(
            ImageReference::album_page("https://x/a_p3.png", "3").to_string(),
            "p3 https://x/a_p3.png"
        );
        assert_eq!(
            ImageReference::single("https://x/a.png").to_string(),
            "https://x/a.png"
        );
    }
}
