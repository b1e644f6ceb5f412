//! Web URL adapter.
//!
//! Fetches raw HTML over HTTP and runs readability-style boilerplate
//! stripping to recover article text and a title. The fetch is always done
//! here with the shared [`reqwest`] client rather than by the extraction
//! library, so the construction-time TLS and proxy policy applies to every
//! request uniformly; the readability layer only ever sees bytes.

use async_trait::async_trait;
use regex::Regex;
use std::io::Cursor;
use tracing::{debug, error, warn};
use url::Url;

use crate::adapter::{http_client, SourceAdapter};
use crate::config::HttpConfig;
use crate::content::{SourceContent, SourceType};
use crate::error::{ExtractError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; Inlet/0.3)";

/// URL families owned by more specific adapters: never claimed here.
const EXCLUDE_PATTERN: &str = r"(youtube\.com|youtu\.be|drive\.google|sharepoint|onedrive)";

pub struct WebAdapter {
    client: reqwest::Client,
    exclude: Regex,
}

impl WebAdapter {
    pub fn new(http: &HttpConfig) -> Self {
        Self {
            client: http_client(http, http.timeout_secs),
            exclude: Regex::new(EXCLUDE_PATTERN).expect("exclude pattern is valid"),
        }
    }

    async fn fetch(&self, source: &str) -> Result<String> {
        let resp = self
            .client
            .get(source)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| {
                error!(url = %source, error = %e, "failed to fetch URL");
                ExtractError::unavailable(source, format!("failed to fetch: {}", e))
            })?;

        let status = resp.status();
        if !status.is_success() {
            error!(url = %source, %status, "fetch returned error status");
            return Err(ExtractError::unavailable(
                source,
                format!("failed to fetch: HTTP {}", status),
            ));
        }

        resp.text()
            .await
            .map_err(|e| ExtractError::unavailable(source, format!("failed to read body: {}", e)))
    }
}

#[async_trait]
impl SourceAdapter for WebAdapter {
    fn name(&self) -> &'static str {
        "web"
    }

    fn can_handle(&self, source: &str) -> bool {
        if !source.starts_with("http://") && !source.starts_with("https://") {
            return false;
        }
        !self.exclude.is_match(source)
    }

    async fn extract(&self, source: &str) -> Result<SourceContent> {
        debug!(url = %source, "fetching URL");
        let html = self.fetch(source).await?;

        let page = strip_boilerplate(&html, source)?;
        debug!(url = %source, chars = page.text.len(), "extracted page text");

        let title = match page.title {
            Some(t) => t,
            None => {
                warn!(url = %source, "no title in page metadata, using URL");
                source.to_string()
            }
        };

        Ok(SourceContent::new(page.text, title, source, SourceType::Web))
    }
}

/// Boilerplate-stripped page content.
#[derive(Debug)]
pub(crate) struct Page {
    pub title: Option<String>,
    pub text: String,
}

/// Strip navigation/ads/chrome from fetched HTML, leaving article-like text.
///
/// Fetch failures and extraction failures are distinct conditions: by the
/// time this runs the bytes are already in hand, so any error here is a
/// [`ExtractError::NoContent`] (the page structure defeated extraction), not
/// a network problem.
pub(crate) fn strip_boilerplate(html: &str, source: &str) -> Result<Page> {
    let url = Url::parse(source)
        .map_err(|e| ExtractError::no_content(source, format!("invalid URL: {}", e)))?;

    let mut cursor = Cursor::new(html.as_bytes());
    let product = readability::extractor::extract(&mut cursor, &url)
        .map_err(|e| ExtractError::no_content(source, format!("readability failed: {}", e)))?;

    let text = product.text.trim().to_string();
    if text.is_empty() {
        return Err(ExtractError::no_content(
            source,
            "no text recoverable from fetched HTML",
        ));
    }

    let title = Some(product.title.trim().to_string()).filter(|t| !t.is_empty());
    Ok(Page { title, text })
}
