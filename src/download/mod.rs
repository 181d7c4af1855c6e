//! Image download: deterministic target paths and the download-if-absent
//! operation with its two-tier retry.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use pixiv_core::download::{Downloader, download_target};
//! use pixiv_core::model::{ImageReference, ItemMetadata};
//! use pixiv_core::session::{HttpTimeouts, Session};
//! use reqwest::header::HeaderMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new(&HeaderMap::new(), HttpTimeouts::page())?;
//! let downloader = Downloader::new(HttpTimeouts::download())?;
//! let url = "https://i.pximg.net/img-original/img/1_p0.jpg";
//! let image = ImageReference::single(url);
//! let target = download_target(Path::new("img"), &ItemMetadata::new("t", "a"), &image);
//! downloader.ensure(&session, url, &target).await?;
//! # Ok(())
//! # }
//! ```

mod downloader;
mod error;
mod target;

pub use downloader::{Downloader, EnsureOutcome};
pub use error::DownloadError;
pub use target::{
    ASTERISK_SUBSTITUTE, PARTIAL_SUFFIX, QUESTION_MARK_SUBSTITUTE, album_dir, album_target,
    download_target, extension_from_url, partial_dir, sanitize_component, single_target,
};
