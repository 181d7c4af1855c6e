//! CLI argument definitions using clap derive macros.
//!
//! Besides the long options, the command line keeps the free-form token
//! surface: any mix of keyword words, a `page=<n>` token, and a `-d`/`-debug`
//! flag, in any order.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use pixiv_core::config::DEFAULT_CONFIG_FILE;

/// Keyword searched when the command line names none.
pub const DEFAULT_KEYWORD: &str = "1000users入り";

/// Number of search pages crawled by default.
pub const DEFAULT_PAGES: u32 = 5;

/// Default output root.
pub const DEFAULT_OUTPUT_DIR: &str = "img";

/// Crawl a keyword search and download the original images.
///
/// Tokens are free-form: `page=<n>` sets the page count, `-d` or `-debug`
/// enables debug logging, everything else is joined into the keyword.
#[derive(Parser, Debug)]
#[command(name = "pixiv-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Config file holding the request headers
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory images are written under
    #[arg(long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Keyword words, `page=<n>`, and `-d`/`-debug`
    #[arg(
        value_name = "TOKENS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub tokens: Vec<String>,
}

/// Rejected command-line token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// A `page=` token whose value is not a positive integer.
    #[error("invalid page count `{token}`: expected page=<positive integer>")]
    InvalidPage {
        /// Offending token.
        token: String,
    },
}

/// What the free-form tokens ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Search keyword.
    pub keyword: String,
    /// Number of pages to crawl.
    pub pages: u32,
    /// Debug logging requested.
    pub debug: bool,
}

impl Invocation {
    /// Interprets the raw tokens.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidPage`] for a malformed `page=` token.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, TokenError> {
        let mut words = Vec::new();
        let mut pages = DEFAULT_PAGES;
        let mut debug = false;

        for token in tokens {
            let token = token.as_ref();
            if token.eq_ignore_ascii_case("-d") || token.eq_ignore_ascii_case("-debug") {
                debug = true;
            } else if let Some(value) = strip_page_prefix(token) {
                pages = value
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0 && value.bytes().all(|b| b.is_ascii_digit()))
                    .ok_or_else(|| TokenError::InvalidPage {
                        token: token.to_string(),
                    })?;
            } else if !token.trim().is_empty() {
                words.push(token);
            }
        }

        let keyword = if words.is_empty() {
            DEFAULT_KEYWORD.to_string()
        } else {
            words.join(" ")
        };
        Ok(Self {
            keyword,
            pages,
            debug,
        })
    }
}

/// Value of a `page=` token, matching the prefix case-insensitively.
fn strip_page_prefix(token: &str) -> Option<&str> {
    const PREFIX: &str = "page=";
    token
        .get(..PREFIX.len())
        .filter(|head| head.eq_ignore_ascii_case(PREFIX))
        .map(|_| &token[PREFIX.len()..])
}
