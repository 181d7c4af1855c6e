//! Fallback User-Agent for sessions whose configured headers carry none.

/// Browser-like User-Agent used when the config file omits `User-Agent`.
///
/// The image host rejects requests without a browser identity, so the
/// fallback mimics a desktop browser and appends the crate version.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 pixiv-downloader/{version}"
    )
}
