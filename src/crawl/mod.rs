//! The crawl pipeline: run controller, search orchestrator, item resolver,
//! and the worker pools tying them together.
//!
//! Control flows strictly downward:
//! [`RunController`] → (sequential pages) [`SearchOrchestrator`] →
//! (pooled items) [`ItemResolver`] → [`crate::download::Downloader`].
//! Only completion counts and errors flow back up.

mod pool;
mod resolver;
mod run;
mod search;

pub use pool::{AbortSignal, PoolStats, WorkerPool};
pub use resolver::{ItemReport, ItemResolver};
pub use run::{RunController, RunReport};
pub use search::{PageReport, SearchOrchestrator};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use thiserror::Error;

use crate::config::{ConfigError, RunConfig};
use crate::download::{DownloadError, Downloader};
use crate::model::ContentId;
use crate::page::PageError;
use crate::session::{HttpTimeouts, Session, SessionError};
use crate::site::SiteEndpoints;

/// Default number of concurrently resolved single-image entries.
pub const DEFAULT_SINGLE_WORKERS: usize = 5;

/// Default number of concurrently resolved albums.
pub const DEFAULT_ALBUM_WORKERS: usize = 3;

/// Default number of concurrent page downloads within one album.
pub const DEFAULT_ALBUM_DOWNLOAD_WORKERS: usize = 5;

/// Errors surfaced by crawl operations.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Run setup failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A page request failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A page did not have the expected shape.
    #[error("item {id}: {source}")]
    Page {
        /// Entry being resolved.
        id: ContentId,
        /// Extraction failure.
        #[source]
        source: PageError,
    },

    /// An image could not be stored.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// A directory could not be created.
    #[error("cannot create directory {path}: {source}")]
    Io {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Work stopped because the run was aborted elsewhere.
    #[error("run aborted: {cause}")]
    Aborted {
        /// The failure that tripped the abort.
        cause: String,
    },
}

impl CrawlError {
    /// Wraps a page extraction failure with the entry it concerns.
    pub fn page(id: &ContentId, source: PageError) -> Self {
        Self::Page {
            id: id.clone(),
            source,
        }
    }

    /// Creates a directory creation error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true when the whole run must stop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Download(e) => e.is_fatal(),
            Self::Aborted { .. } => true,
            _ => false,
        }
    }

    /// Returns true when the run stopped on the 403 kill switch, whichever
    /// pool observed it first.
    #[must_use]
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Self::Download(DownloadError::Forbidden { .. }) | Self::Aborted { .. })
    }
}

/// Pool widths and throttle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Width of the single-image pool.
    pub single_workers: usize,
    /// Width of the album pool.
    pub album_workers: usize,
    /// Width of each album's download pool.
    pub album_download_workers: usize,
    /// Sleep after each resolved entry.
    pub throttle: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            single_workers: DEFAULT_SINGLE_WORKERS,
            album_workers: DEFAULT_ALBUM_WORKERS,
            album_download_workers: DEFAULT_ALBUM_DOWNLOAD_WORKERS,
            throttle: Duration::from_millis(crate::config::DEFAULT_THROTTLE_MS),
        }
    }
}

impl CrawlOptions {
    /// Default widths with the config file's throttle.
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            throttle: config.throttle(),
            ..Self::default()
        }
    }
}

/// Everything a run shares read-only between its workers.
#[derive(Debug)]
pub struct CrawlContext {
    endpoints: SiteEndpoints,
    headers: HeaderMap,
    downloader: Downloader,
    output_root: PathBuf,
    options: CrawlOptions,
    page_timeouts: HttpTimeouts,
    abort: AbortSignal,
}

impl CrawlContext {
    /// Builds the shared context for a run from a loaded config.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Config`] for invalid headers and
    /// [`CrawlError::Download`] if the download client cannot be built.
    pub fn from_config(
        config: &RunConfig,
        output_root: impl Into<PathBuf>,
        options: CrawlOptions,
    ) -> Result<Self, CrawlError> {
        let headers = config.header_map()?;
        let downloader = Downloader::new(config.download_timeouts())?;
        Ok(Self {
            endpoints: SiteEndpoints::new(config.base_url.clone()),
            headers,
            downloader,
            output_root: output_root.into(),
            options,
            page_timeouts: HttpTimeouts::page(),
            abort: AbortSignal::new(),
        })
    }

    /// URL builder for the target site.
    #[must_use]
    pub fn endpoints(&self) -> &SiteEndpoints {
        &self.endpoints
    }

    /// Shared downloader.
    #[must_use]
    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    /// Root directory all images are written under.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Pool widths and throttle.
    #[must_use]
    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Run-wide abort signal.
    #[must_use]
    pub fn abort(&self) -> &AbortSignal {
        &self.abort
    }

    /// Creates a fresh session from the shared header set.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Build`] if the client cannot be constructed.
    pub fn new_session(&self) -> Result<Session, SessionError> {
        Session::new(&self.headers, self.page_timeouts)
    }
}

/// Shared handle passed to spawned workers.
pub type SharedContext = Arc<CrawlContext>;
