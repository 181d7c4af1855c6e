//! Download-if-absent with a plain attempt and an authenticated retry.
//!
//! The first attempt goes through a cookie-less client carrying only the
//! session's `Referer` and `User-Agent`. Anything but `200` falls through to
//! the item's own [`Session`], which sends the full header set and its
//! accumulated cookies. A `403` on that retry is [`DownloadError::Forbidden`].

use std::ffi::OsStr;
use std::path::Path;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, REFERER, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, instrument, warn};

use super::error::DownloadError;
use super::target::{PARTIAL_SUFFIX, partial_dir};
use crate::session::{HttpTimeouts, Session, build_client};

/// Result of [`Downloader::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The target already existed; nothing was fetched.
    Skipped,
    /// The image was fetched and written.
    Downloaded {
        /// Bytes written to the target.
        bytes: u64,
    },
}

/// Shared image downloader.
///
/// Holds only the plain client; the authenticated side is the per-item
/// [`Session`] handed to each call, so a `Downloader` can be cloned freely
/// across workers.
#[derive(Debug, Clone)]
pub struct Downloader {
    plain: Client,
}

impl Downloader {
    /// Creates a downloader whose plain client uses `timeouts`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if the client cannot be constructed.
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, DownloadError> {
        let plain =
            build_client(None, timeouts).map_err(|source| DownloadError::Client { source })?;
        Ok(Self { plain })
    }

    /// Makes sure `target` holds the image at `url`.
    ///
    /// Returns [`EnsureOutcome::Skipped`] without any network traffic when
    /// `target` already exists.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Forbidden`] when the authenticated retry is
    /// refused with 403, [`DownloadError::HttpStatus`] for any other
    /// non-success retry, and network or IO errors from the transfer.
    #[instrument(skip(self, session), fields(url = %url, target = %target.display()))]
    pub async fn ensure(
        &self,
        session: &Session,
        url: &str,
        target: &Path,
    ) -> Result<EnsureOutcome, DownloadError> {
        if tokio::fs::try_exists(target).await.unwrap_or(false) {
            debug!("target exists; skipping");
            return Ok(EnsureOutcome::Skipped);
        }

        let response = match self.plain_attempt(session, url).await {
            Some(response) => response,
            None => self.session_attempt(session, url).await?,
        };

        let bytes = write_atomically(response, url, target).await?;
        info!(bytes, "image saved");
        Ok(EnsureOutcome::Downloaded { bytes })
    }

    /// First attempt: minimal headers, no cookies. `None` means "retry".
    async fn plain_attempt(&self, session: &Session, url: &str) -> Option<Response> {
        let mut headers = HeaderMap::new();
        for name in [REFERER, USER_AGENT] {
            if let Some(value) = session.headers().get(&name) {
                headers.insert(name, value.clone());
            }
        }

        match self.plain.get(url).headers(headers).send().await {
            Ok(response) if response.status() == StatusCode::OK => Some(response),
            Ok(response) => {
                warn!(
                    status = response.status().as_u16(),
                    "plain request refused; retrying with session"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "plain request failed; retrying with session");
                None
            }
        }
    }

    /// Retry through the item's session with its full header set.
    async fn session_attempt(
        &self,
        session: &Session,
        url: &str,
    ) -> Result<Response, DownloadError> {
        let response = session
            .get(url)
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN {
            error!(
                headers = ?session.redacted_headers(),
                "authenticated retry refused with 403; aborting run"
            );
            return Err(DownloadError::forbidden(url));
        }
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

/// Streams the body into a temporary file of its own next to `target`, then
/// renames it onto `target`.
///
/// Concurrent transfers to the same target each write their own file, so the
/// last rename wins and every writer succeeds. On any failure the temporary
/// file is removed and `target` is left untouched.
async fn write_atomically(
    response: Response,
    url: &str,
    target: &Path,
) -> Result<u64, DownloadError> {
    let dir = partial_dir(target);
    let mut prefix = target
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    prefix.push(".");
    let (file, partial) = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| DownloadError::io(dir, e))?
        .into_parts();

    let bytes = match stream_to_file(File::from_std(file), response, url, &partial).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %partial.display(), "discarding partial file after error");
            return Err(e);
        }
    };

    partial
        .persist(target)
        .map_err(|e| DownloadError::io(target, e.error))?;
    Ok(bytes)
}

async fn stream_to_file(
    file: File,
    response: Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
