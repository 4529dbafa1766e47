//! Documentation page retrieval and HTML-to-text stripping.
//!
//! Pages are cached in-process per URL for the fetcher's lifetime; the
//! persistent tier never sees them (it holds only tree and file records).
//! The root page's raw HTML doubles as the input for link extraction, so
//! [`DocFetcher::fetch_page`] returns HTML untouched and callers strip it.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::StatusCode;
use tracing::debug;

use crate::config::Config;
use crate::error::RetrievalError;

static SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap());
static STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Reduce an HTML page to whitespace-collapsed text. Script and style
/// blocks are removed wholesale; every other tag becomes a space.
pub fn strip_html(html: &str) -> String {
    let text = SCRIPT.replace_all(html, "");
    let text = STYLE.replace_all(&text, "");
    let text = TAG.replace_all(&text, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

pub struct DocFetcher {
    client: reqwest::Client,
    pages: RwLock<HashMap<String, String>>,
}

impl DocFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch.timeout_secs))
            .user_agent(config.fetch.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            pages: RwLock::new(HashMap::new()),
        })
    }

    /// Raw HTML of `url`, or `None` when the page does not exist.
    ///
    /// Concurrent fetches of the same URL may race; both store equivalent
    /// bodies, which is harmless.
    pub async fn fetch_page(&self, url: &str) -> Result<Option<String>, RetrievalError> {
        if let Some(html) = self.pages.read().unwrap().get(url) {
            debug!(url, "doc page served from cache");
            return Ok(Some(html.clone()));
        }

        debug!(url, "fetching doc page");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| RetrievalError::transport(url, err))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RetrievalError::status(status, url));
        }

        let html = response
            .text()
            .await
            .map_err(|err| RetrievalError::transport(url, err))?;

        self.pages
            .write()
            .unwrap()
            .insert(url.to_string(), html.clone());

        Ok(Some(html))
    }
}
