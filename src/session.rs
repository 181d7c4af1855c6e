//! Per-item HTTP session: configured headers, own cookie jar, own `Referer`.
//!
//! Every resolved item builds its own [`Session`]. The header set is copied
//! from the run-wide config, and the `Referer` is then pointed at the item's
//! page, so concurrently active items never observe each other's referer or
//! cookies.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, Response};
use thiserror::Error;
use tracing::{debug, instrument};

const PAGE_CONNECT_TIMEOUT_SECS: u64 = 10;
const PAGE_READ_TIMEOUT_SECS: u64 = 30;
const DOWNLOAD_CONNECT_TIMEOUT_SECS: u64 = 30;
const DOWNLOAD_READ_TIMEOUT_SECS: u64 = 300;

/// Connect/read timeout pair for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// TCP/TLS connect timeout in seconds.
    pub connect_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_secs: u64,
}

impl HttpTimeouts {
    /// Defaults for HTML page fetches.
    #[must_use]
    pub fn page() -> Self {
        Self {
            connect_secs: PAGE_CONNECT_TIMEOUT_SECS,
            read_secs: PAGE_READ_TIMEOUT_SECS,
        }
    }

    /// Defaults for image transfers.
    #[must_use]
    pub fn download() -> Self {
        Self {
            connect_secs: DOWNLOAD_CONNECT_TIMEOUT_SECS,
            read_secs: DOWNLOAD_READ_TIMEOUT_SECS,
        }
    }
}

/// Errors from page-level requests.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client construction failed: {source}")]
    Build {
        /// Builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Connection, TLS, timeout, or body-decoding failure.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// A URL could not be used as a header value.
    #[error("invalid Referer value: {url}")]
    InvalidReferer {
        /// Rejected URL.
        url: String,
    },
}

/// HTTP context for one item (or one search page).
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    headers: HeaderMap,
}

impl Session {
    /// Creates a session carrying a private copy of `headers` and a fresh cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Build`] if the client cannot be constructed.
    #[instrument(level = "debug", skip(headers))]
    pub fn new(headers: &HeaderMap, timeouts: HttpTimeouts) -> Result<Self, SessionError> {
        let jar = Arc::new(Jar::default());
        let client =
            build_client(Some(jar), timeouts).map_err(|source| SessionError::Build { source })?;
        Ok(Self {
            client,
            headers: headers.clone(),
        })
    }

    /// Points this session's `Referer` at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidReferer`] if `url` is not a valid header value.
    pub fn set_referer(&mut self, url: &str) -> Result<(), SessionError> {
        let value = HeaderValue::from_str(url).map_err(|_| SessionError::InvalidReferer {
            url: url.to_string(),
        })?;
        self.headers.insert(REFERER, value);
        Ok(())
    }

    /// Returns a header value of this session, if set and printable.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Full header set sent with authenticated requests.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header pairs safe to write to logs: cookie values are masked.
    #[must_use]
    pub fn redacted_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(name, value)| {
                let shown = if *name == COOKIE {
                    "<redacted>".to_string()
                } else {
                    value.to_str().unwrap_or("<non-ascii>").to_string()
                };
                (name.as_str().to_string(), shown)
            })
            .collect()
    }

    /// Fetches `url` and decodes the body as text.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] on network or decode failure and
    /// [`SessionError::Status`] on a non-success status.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn fetch_page(&self, url: &str) -> Result<String, SessionError> {
        let response = self
            .get(url)
            .await
            .map_err(|source| SessionError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|source| SessionError::Transport {
                url: url.to_string(),
                source,
            })?;
        debug!(bytes = body.len(), "page fetched");
        Ok(body)
    }

    /// Issues a GET with the full header set and this session's cookies.
    ///
    /// The response is returned whatever its status; callers decide.
    ///
    /// # Errors
    ///
    /// Returns the transport error from `reqwest`.
    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await
    }
}

/// Builds a client with the crate's timeout and compression policy.
///
/// Sessions pass a cookie jar; the downloader's plain client passes `None`
/// so its first attempt carries no session state.
pub(crate) fn build_client(
    cookie_jar: Option<Arc<Jar>>,
    timeouts: HttpTimeouts,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.read_secs))
        .gzip(true);
    if let Some(jar) = cookie_jar {
        builder = builder.cookie_provider(jar);
    }
    builder.build()
}
