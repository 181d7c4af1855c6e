//! URL patterns for the search, detail, and album pages.

use crate::model::ContentId;

/// Production site root.
pub const DEFAULT_BASE_URL: &str = "https://www.pixiv.net";

/// Search ordering parameter: newest first.
pub const SEARCH_ORDER: &str = "date_d";

/// Builds page URLs relative to a configurable site root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEndpoints {
    base_url: String,
}

impl Default for SiteEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl SiteEndpoints {
    /// Creates endpoints rooted at `base_url` (trailing slashes are ignored).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Returns the normalized site root.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search results for `keyword`, newest first, on 1-based `page`.
    #[must_use]
    pub fn search_url(&self, keyword: &str, page: u32) -> String {
        let encoded = urlencoding::encode(keyword);
        format!(
            "{}/search.php?word={encoded}&order={SEARCH_ORDER}&p={page}",
            self.base_url
        )
    }

    /// Detail page carrying the metadata tag (and, for singles, the original image).
    #[must_use]
    pub fn detail_url(&self, id: &ContentId) -> String {
        format!(
            "{}/member_illust.php?mode=medium&illust_id={id}",
            self.base_url
        )
    }

    /// Album listing page with one container per image.
    #[must_use]
    pub fn album_url(&self, id: &ContentId) -> String {
        format!(
            "{}/member_illust.php?mode=manga&illust_id={id}",
            self.base_url
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_keyword() {
        let endpoints = SiteEndpoints::default();
        assert_eq!(
            endpoints.search_url("1000users入り 風景", 2),
            "https://www.pixiv.net/search.php?word=1000users%E5%85%A5%E3%82%8A%20%E9%A2%A8%E6%99%AF&order=date_d&p=2"
        );
    }

    #[test]
    fn test_detail_and_album_urls() {
        let endpoints = SiteEndpoints::new("http://127.0.0.1:8080/");
        let id = ContentId::new("42");
        assert_eq!(
            endpoints.detail_url(&id),
            "http://127.0.0.1:8080/member_illust.php?mode=medium&illust_id=42"
        );
        assert_eq!(
            endpoints.album_url(&id),
            "http://127.0.0.1:8080/member_illust.php?mode=manga&illust_id=42"
        );
    }
}
