//! Pixiv Downloader Core Library
//!
//! Crawls an image-sharing site's keyword search, classifies every result as
//! a single image or a multi-image album, and stores the original images under
//! `<root>/<title> - <artist>`.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - JSON config file with the shared header set
//! - [`session`] - per-item HTTP session with its own cookies and `Referer`
//! - [`site`] - search, detail and album URL patterns
//! - [`page`] - HTML extraction and result classification
//! - [`download`] - download-if-absent with plain attempt and session retry
//! - [`crawl`] - worker pools, item resolver, search orchestrator, run loop
//! - [`model`] - identifiers, kinds, metadata and image references

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod crawl;
pub mod download;
pub mod model;
pub mod page;
pub mod session;
pub mod site;

pub(crate) mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{ConfigError, RunConfig};
pub use crawl::{
    AbortSignal, CrawlContext, CrawlError, CrawlOptions, ItemResolver, PageReport, PoolStats,
    RunController, RunReport, SearchOrchestrator, WorkerPool,
};
pub use download::{DownloadError, Downloader, EnsureOutcome};
pub use model::{ContentId, ImageReference, ItemKind, ItemMetadata};
pub use page::{PageError, SearchResults, classify_anchor};
pub use session::{HttpTimeouts, Session, SessionError};
pub use site::SiteEndpoints;
