//! Detail and album page extraction.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::{PageError, compile_static_regex, compile_static_selector};
use crate::model::ItemMetadata;

/// Site tag closing every metadata title.
pub const SITE_TAG: &str = "pixiv";

static OG_TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(r#"head meta[property="og:title"]"#));
static ORIGINAL_IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("img.original-image"));
static ALBUM_CONTAINER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("div.item-container"));
static IMG_SELECTOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("img"));

static TITLE_ARTIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(&format!(
        r"^「(.+)」/「([^」]+)」\[{}\]$",
        regex::escape(SITE_TAG)
    ))
});
static PATH_HOSTILE_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"[|/]"));
static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"p(\d+)"));

/// Attribute holding the lazily loaded image URL.
const IMAGE_SOURCE_ATTR: &str = "data-src";

/// Reads the `og:title` tag of a detail page and parses title and artist from it.
///
/// # Errors
///
/// Returns [`PageError::MissingElement`] when the tag is absent and
/// [`PageError::TitlePattern`] when its content does not match.
pub fn parse_item_metadata(html: &str) -> Result<ItemMetadata, PageError> {
    let raw = {
        let document = Html::parse_document(html);
        document
            .select(&OG_TITLE_SELECTOR)
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .map(str::to_string)
    };
    let raw = raw.ok_or(PageError::MissingElement {
        element: "meta[property=og:title]",
    })?;
    debug!(page_title = %raw, "metadata title found");
    parse_title_artist(&raw)
}

/// Parses `「<title>」/「<artist>」[pixiv]` into cleaned metadata.
///
/// The artist's `.` becomes `·`, and `|` and `/` are removed from both fields.
///
/// # Errors
///
/// Returns [`PageError::TitlePattern`] when `raw` does not match.
pub fn parse_title_artist(raw: &str) -> Result<ItemMetadata, PageError> {
    let caps = TITLE_ARTIST_RE
        .captures(raw)
        .ok_or_else(|| PageError::TitlePattern {
            raw: raw.to_string(),
        })?;
    let title = &caps[1];
    let artist = caps[2].replace('.', "·");

    let meta = ItemMetadata::new(
        PATH_HOSTILE_RE.replace_all(title, ""),
        PATH_HOSTILE_RE.replace_all(&artist, ""),
    );
    debug!(title = %meta.title, artist = %meta.artist, "title and artist parsed");
    Ok(meta)
}

/// Returns the source URL of the page's original-image element.
///
/// # Errors
///
/// Returns [`PageError::ImageNotFound`] when no such element carries a URL.
pub fn find_original_image(html: &str) -> Result<String, PageError> {
    let document = Html::parse_document(html);
    document
        .select(&ORIGINAL_IMAGE_SELECTOR)
        .next()
        .and_then(|img| img.value().attr(IMAGE_SOURCE_ATTR))
        .map(str::to_string)
        .ok_or(PageError::ImageNotFound)
}

/// Collects the distinct image URLs of an album listing page.
///
/// Each image container contributes the URL of its first image; containers
/// without one are ignored.
#[must_use]
pub fn album_image_urls(html: &str) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    let mut urls = BTreeSet::new();
    for container in document.select(&ALBUM_CONTAINER_SELECTOR) {
        match container
            .select(&IMG_SELECTOR)
            .next()
            .and_then(|img| img.value().attr(IMAGE_SOURCE_ATTR))
        {
            Some(url) => {
                urls.insert(url.to_string());
            }
            None => debug!("album container without image source; ignoring"),
        }
    }
    urls
}

/// Extracts the album page marker `p<digits>` of an image URL.
///
/// The digits are returned exactly as written (`p007` yields `"007"`) and
/// become the stem of the page's file name. The file name (last path
/// segment) is searched first so host names and directories cannot produce a
/// false match; the whole URL is the fallback.
///
/// # Errors
///
/// Returns [`PageError::MissingOrdinal`] when no marker is present.
pub fn album_ordinal(url: &str) -> Result<String, PageError> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file_name = path.rsplit('/').next().unwrap_or(path);

    [file_name, url]
        .iter()
        .find_map(|haystack| {
            ORDINAL_RE
                .captures(haystack)
                .map(|caps| caps[1].to_string())
        })
        .ok_or_else(|| PageError::MissingOrdinal {
            url: url.to_string(),
        })
}
