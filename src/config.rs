//! Run configuration loaded from the JSON config file.
//!
//! The file carries the header set every session starts from (at minimum the
//! `User-Agent` and the site's session cookie) plus a few optional tuning
//! knobs. It is loaded once, before any network activity; every failure here is
//! fatal to the run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::session::HttpTimeouts;
use crate::site::DEFAULT_BASE_URL;
use crate::user_agent;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Default per-item sleep after each resolution, in milliseconds.
pub const DEFAULT_THROTTLE_MS: u64 = 1000;

const MAX_THROTTLE_MS: u64 = 60_000;

/// Errors raised while loading or validating the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or does not match the expected shape.
    #[error("invalid config JSON: {source}")]
    Parse {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A header name or value cannot be sent over HTTP.
    #[error("invalid header `{name}` in config: {reason}")]
    InvalidHeader {
        /// Header name as written in the file.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A numeric field is outside its allowed range.
    #[error("invalid config value for `{field}`: {value}. Expected range: {range}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: u64,
        /// Human-readable allowed range.
        range: &'static str,
    },
}

/// Parsed contents of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// HTTP headers shared (read-only) by every session of the run.
    pub headers: BTreeMap<String, String>,
    /// Site root used to build search and detail URLs.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sleep after each item resolution, in milliseconds.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Connect timeout for image downloads, in seconds.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Read timeout for image downloads, in seconds.
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_throttle_ms() -> u64 {
    DEFAULT_THROTTLE_MS
}

impl RunConfig {
    /// Reads, parses, and validates the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is missing or unreadable, is not
    /// valid JSON, or contains invalid headers or out-of-range values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw)?;
        debug!(
            path = %path.display(),
            headers = config.headers.len(),
            base_url = %config.base_url,
            "config loaded"
        );
        Ok(config)
    }

    /// Parses and validates config JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed JSON or invalid values.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from an explicit header set with default tuning.
    #[must_use]
    pub fn with_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            base_url: default_base_url(),
            throttle_ms: DEFAULT_THROTTLE_MS,
            connect_timeout_secs: None,
            read_timeout_secs: None,
        }
    }

    /// Checks numeric ranges and header validity.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.throttle_ms > MAX_THROTTLE_MS {
            return Err(ConfigError::OutOfRange {
                field: "throttle_ms",
                value: self.throttle_ms,
                range: "0..=60000",
            });
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        self.header_map().map(|_| ())
    }

    /// Converts the configured headers into a [`HeaderMap`].
    ///
    /// A browser-like `User-Agent` is inserted when the file supplies none.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHeader`] for names or values that are not
    /// valid HTTP tokens.
    pub fn header_map(&self) -> Result<HeaderMap, ConfigError> {
        let mut map = HeaderMap::with_capacity(self.headers.len() + 1);
        for (name, value) in &self.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            map.insert(header_name, header_value);
        }
        if !map.contains_key(USER_AGENT) {
            let fallback = HeaderValue::from_str(&user_agent::default_user_agent()).map_err(|e| {
                ConfigError::InvalidHeader {
                    name: USER_AGENT.to_string(),
                    reason: e.to_string(),
                }
            })?;
            map.insert(USER_AGENT, fallback);
        }
        Ok(map)
    }

    /// Per-item throttle delay.
    #[must_use]
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    /// Download timeouts, falling back to the crate defaults.
    #[must_use]
    pub fn download_timeouts(&self) -> HttpTimeouts {
        let defaults = HttpTimeouts::download();
        HttpTimeouts {
            connect_secs: self.connect_timeout_secs.unwrap_or(defaults.connect_secs),
            read_secs: self.read_timeout_secs.unwrap_or(defaults.read_secs),
        }
    }
}

fn validate_timeout_secs(field: &'static str, value: Option<u64>) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            range: "1..=3600",
        });
    }
    Ok(())
}
