//! Deterministic on-disk locations for downloaded images.
//!
//! Layout under the output root:
//! - single image: `<root>/<title> - <artist>.<ext>`
//! - album page:   `<root>/<title> - <artist>/<ordinal>.<ext>`
//!
//! The existence of the computed path is the only de-duplication signal.

use std::path::{Path, PathBuf};

use url::Url;

use crate::model::{ImageReference, ItemMetadata};

/// Substitute for `*`, which most file systems reject.
pub const ASTERISK_SUBSTITUTE: char = '※';

/// Substitute for `?`, which most file systems reject.
pub const QUESTION_MARK_SUBSTITUTE: char = '？';

/// Extension used when an image URL has none.
const FALLBACK_EXTENSION: &str = "bin";

/// Makes `value` safe as a single path component.
///
/// `|` and `/` are removed; `*` and `?` become their full-width look-alikes.
#[must_use]
pub fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .filter_map(|ch| match ch {
            '|' | '/' => None,
            '*' => Some(ASTERISK_SUBSTITUTE),
            '?' => Some(QUESTION_MARK_SUBSTITUTE),
            other => Some(other),
        })
        .collect()
}

/// Returns the file extension (without dot) of an image URL's last path segment.
#[must_use]
pub fn extension_from_url(url: &str) -> String {
    let last_segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string)),
        Err(_) => url.rsplit('/').next().map(str::to_string),
    };
    last_segment
        .as_deref()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 12)
        .map_or_else(|| FALLBACK_EXTENSION.to_string(), str::to_lowercase)
}

/// Target path of a single-image entry.
#[must_use]
pub fn single_target(root: &Path, meta: &ItemMetadata, url: &str) -> PathBuf {
    let file_name = format!("{}.{}", meta.display_name(), extension_from_url(url));
    root.join(sanitize_component(&file_name))
}

/// Directory holding an album's pages.
#[must_use]
pub fn album_dir(root: &Path, meta: &ItemMetadata) -> PathBuf {
    root.join(sanitize_component(&meta.display_name()))
}

/// Target path of album page `ordinal` inside `album_dir`.
#[must_use]
pub fn album_target(album_dir: &Path, ordinal: &str, url: &str) -> PathBuf {
    album_dir.join(sanitize_component(&format!(
        "{ordinal}.{}",
        extension_from_url(url)
    )))
}

/// Target path of any image reference: album pages carry an ordinal, singles do not.
#[must_use]
pub fn download_target(root: &Path, meta: &ItemMetadata, image: &ImageReference) -> PathBuf {
    match image.ordinal.as_deref() {
        Some(ordinal) => album_target(&album_dir(root, meta), ordinal, &image.source_url),
        None => single_target(root, meta, &image.source_url),
    }
}

/// Suffix of the per-transfer temporary files written next to a target.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Directory a transfer's temporary file is created in: the target's own
/// directory, so the final rename never crosses file systems.
#[must_use]
pub fn partial_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
