//! Web-search adapter.
//!
//! Handles `search:<query>` sources: runs the query against a search
//! provider, scrapes the top result URLs through the web adapter, truncates
//! each result to a character budget, and concatenates them into one
//! envelope. This is the one place in the core where per-item failure is
//! tolerated: search results are unreliable, so a result that fails to
//! scrape is logged and skipped, and only zero usable results is an error.
//!
//! Provider selection is a priority chain: a configured provider with a
//! present API key (Google Custom Search, Brave) is used, otherwise the
//! keyless DuckDuckGo HTML endpoint, so the feature works in a minimal
//! deployment with no credentials at all.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::adapter::{http_client, SourceAdapter};
use crate::config::{HttpConfig, SearchConfig};
use crate::content::{SourceContent, SourceType};
use crate::error::{ExtractError, Result};

const PREFIX: &str = "search:";

/// Separator between scraped results in the combined envelope text.
const RESULT_SEPARATOR: &str = "\n\n---\n\n";

/// An ordered-URL search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run the query and return result URLs, best first, at most
    /// `max_results` of them.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>>;
}

pub struct WebSearchAdapter {
    provider: Arc<dyn SearchProvider>,
    /// Delegate used to scrape each result URL (the web adapter in
    /// production, a stub in tests).
    scraper: Arc<dyn SourceAdapter>,
    max_results: usize,
    snippet_chars: usize,
}

impl WebSearchAdapter {
    pub fn new(search: &SearchConfig, http: &HttpConfig, scraper: Arc<dyn SourceAdapter>) -> Self {
        let client = http_client(http, search.timeout_secs);

        let provider: Arc<dyn SearchProvider> = match search.provider.as_str() {
            "google" if !search.api_key.is_empty() => Arc::new(GoogleProvider {
                client,
                api_key: search.api_key.clone(),
                cx_id: search.cx_id.clone(),
            }),
            "brave" if !search.api_key.is_empty() => Arc::new(BraveProvider {
                client,
                api_key: search.api_key.clone(),
            }),
            other => {
                if other != "duckduckgo" {
                    warn!(
                        provider = other,
                        "search provider configured but api_key is empty, falling back to DuckDuckGo"
                    );
                }
                Arc::new(DuckDuckGoProvider { client })
            }
        };

        Self {
            provider,
            scraper,
            max_results: search.max_results,
            snippet_chars: search.snippet_chars,
        }
    }

    /// Assemble an adapter from explicit parts. This is the seam hosts and
    /// tests use to substitute a provider or scraper.
    pub fn with_parts(
        provider: Arc<dyn SearchProvider>,
        scraper: Arc<dyn SourceAdapter>,
        max_results: usize,
        snippet_chars: usize,
    ) -> Self {
        Self {
            provider,
            scraper,
            max_results,
            snippet_chars,
        }
    }
}

#[async_trait]
impl SourceAdapter for WebSearchAdapter {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn can_handle(&self, source: &str) -> bool {
        source
            .get(..PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(PREFIX))
    }

    async fn extract(&self, source: &str) -> Result<SourceContent> {
        let query = source.get(PREFIX.len()..).unwrap_or("").trim();
        info!(query, "running web search");

        let urls = self.provider.search(query, self.max_results).await?;
        debug!(count = urls.len(), ?urls, "search returned URLs");

        // Only the first max_results URLs are ever attempted, even if the
        // provider over-delivers.
        let mut texts = Vec::new();
        for url in urls.iter().take(self.max_results) {
            debug!(url, "scraping search result");
            match self.scraper.extract(url).await {
                Ok(content) => {
                    texts.push(format!(
                        "[{}]\n{}\n{}",
                        content.title,
                        content.source_url,
                        truncate_chars(&content.text, self.snippet_chars)
                    ));
                }
                Err(e) => {
                    warn!(url, error = %e, "failed to scrape search result, skipping");
                    continue;
                }
            }
        }

        if texts.is_empty() {
            return Err(ExtractError::no_content(
                source,
                format!("no results found for: {}", query),
            ));
        }

        let mut metadata = serde_json::Map::new();
        metadata.insert("query".to_string(), query.into());
        metadata.insert("results_count".to_string(), texts.len().into());

        Ok(SourceContent::new(
            texts.join(RESULT_SEPARATOR),
            format!("Search: {}", query),
            format!("search:{}", query),
            SourceType::WebSearch,
        )
        .with_metadata(metadata))
    }
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ============ Providers ============

/// Google Custom Search JSON API. Needs an API key and a CX engine ID.
struct GoogleProvider {
    client: reqwest::Client,
    api_key: String,
    cx_id: String,
}

#[async_trait]
impl SearchProvider for GoogleProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        debug!("using Google search (api_key set)");
        let resp = self
            .client
            .get("https://www.googleapis.com/customsearch/v1")
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx_id.as_str()),
                ("q", query),
                ("num", &max_results.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ExtractError::unavailable(query, format!("google search: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractError::upstream(
                "google search",
                format!("HTTP {}: {}", status, truncate_chars(&body, 500)),
            ));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ExtractError::upstream("google search", format!("bad response: {}", e)))?;

        let items = json["items"].as_array().cloned().unwrap_or_default();
        Ok(items
            .iter()
            .filter_map(|item| item["link"].as_str().map(String::from))
            .collect())
    }
}

/// Brave Search API. Needs a subscription token.
struct BraveProvider {
    client: reqwest::Client,
    api_key: String,
}

#[async_trait]
impl SearchProvider for BraveProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        debug!("using Brave search (api_key set)");
        let resp = self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .query(&[("q", query), ("count", &max_results.to_string())])
            .header("X-Subscription-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| ExtractError::unavailable(query, format!("brave search: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractError::upstream(
                "brave search",
                format!("HTTP {}: {}", status, truncate_chars(&body, 500)),
            ));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ExtractError::upstream("brave search", format!("bad response: {}", e)))?;

        let results = json["web"]["results"].as_array().cloned().unwrap_or_default();
        Ok(results
            .iter()
            .filter_map(|r| r["url"].as_str().map(String::from))
            .collect())
    }
}

/// Keyless fallback: the DuckDuckGo HTML endpoint, parsed with CSS selectors.
struct DuckDuckGoProvider {
    client: reqwest::Client,
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        debug!(query, "using DuckDuckGo search");
        let resp = self
            .client
            .get("https://html.duckduckgo.com/html/")
            .query(&[("q", query)])
            .header(
                reqwest::header::USER_AGENT,
                "Mozilla/5.0 (compatible; Inlet/0.3)",
            )
            .send()
            .await
            .map_err(|e| ddg_failure(query, &e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ddg_failure(query, &format!("HTTP {}", status)));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ddg_failure(query, &e.to_string()))?;

        let urls = parse_ddg_results(&body, max_results);
        debug!(count = urls.len(), "DuckDuckGo returned results");
        Ok(urls)
    }
}

/// DuckDuckGo failures get remediation hints: this is the last provider in
/// the chain, so when it fails the whole search feature is down.
fn ddg_failure(query: &str, reason: &str) -> ExtractError {
    error!(query, reason, "DuckDuckGo search failed");
    ExtractError::unavailable(
        query,
        format!(
            "DuckDuckGo search failed: {}\n\
             Possible fixes:\n\
             \x20 1. set http.ssl_verify = false (corporate TLS interception)\n\
             \x20 2. set http.proxy in the config (proxied network)\n\
             \x20 3. configure a Google or Brave API key\n\
             \x20 4. check the network connection",
            reason
        ),
    )
}

/// Pull result links out of the DuckDuckGo HTML page.
///
/// Result anchors carry a redirect href of the form
/// `//duckduckgo.com/l/?uddg=<encoded target>`; the target URL is recovered
/// from the `uddg` query parameter.
fn parse_ddg_results(html: &str, max_results: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a.result__a").expect("selector is valid");

    let mut urls = Vec::new();
    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if let Some(target) = decode_ddg_href(href) {
            urls.push(target);
        }
        if urls.len() >= max_results {
            break;
        }
    }
    urls
}

fn decode_ddg_href(href: &str) -> Option<String> {
    let absolute = if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
        return Some(target.into_owned());
    }
    // Direct links appear when DuckDuckGo skips the redirect wrapper.
    if parsed.scheme().starts_with("http") {
        return Some(absolute);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedProvider {
        urls: Vec<String>,
    }

    #[async_trait]
    impl SearchProvider for FixedProvider {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<String>> {
            Ok(self.urls.clone())
        }
    }

    /// Records every URL it is asked to scrape; fails for URLs containing
    /// "broken".
    struct RecordingScraper {
        attempted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SourceAdapter for RecordingScraper {
        fn name(&self) -> &'static str {
            "web"
        }

        fn can_handle(&self, source: &str) -> bool {
            source.starts_with("http")
        }

        async fn extract(&self, source: &str) -> Result<SourceContent> {
            self.attempted.lock().unwrap().push(source.to_string());
            if source.contains("broken") {
                return Err(ExtractError::unavailable(source, "connection refused"));
            }
            Ok(SourceContent::new(
                format!("body of {}", source),
                format!("title of {}", source),
                source,
                SourceType::Web,
            ))
        }
    }

    fn search_adapter(urls: &[&str], max_results: usize) -> (WebSearchAdapter, Arc<RecordingScraper>) {
        let scraper = Arc::new(RecordingScraper {
            attempted: Mutex::new(Vec::new()),
        });
        let adapter = WebSearchAdapter::with_parts(
            Arc::new(FixedProvider {
                urls: urls.iter().map(|u| u.to_string()).collect(),
            }),
            scraper.clone(),
            max_results,
            3000,
        );
        (adapter, scraper)
    }

    #[test]
    fn prefix_match_is_case_insensitive() {
        let (adapter, _) = search_adapter(&[], 3);
        assert!(adapter.can_handle("search:agentic workflows"));
        assert!(adapter.can_handle("SEARCH:agentic workflows"));
        assert!(!adapter.can_handle("find:agentic workflows"));
        assert!(!adapter.can_handle(""));
    }

    #[tokio::test]
    async fn only_first_max_results_urls_are_attempted() {
        let (adapter, scraper) = search_adapter(
            &[
                "https://a.example/1",
                "https://b.example/2",
                "https://c.example/3",
                "https://d.example/4",
                "https://e.example/5",
            ],
            3,
        );

        let content = adapter.extract("search:rust routers").await.unwrap();
        let attempted = scraper.attempted.lock().unwrap();
        assert_eq!(attempted.len(), 3);
        assert_eq!(attempted[2], "https://c.example/3");
        assert_eq!(content.metadata["results_count"], serde_json::json!(3));
    }

    #[tokio::test]
    async fn failed_scrape_is_skipped_not_fatal() {
        let (adapter, scraper) = search_adapter(
            &[
                "https://a.example/ok",
                "https://broken.example/down",
                "https://c.example/ok",
            ],
            3,
        );

        let content = adapter.extract("search:resilience").await.unwrap();
        assert_eq!(scraper.attempted.lock().unwrap().len(), 3);
        assert_eq!(content.metadata["results_count"], serde_json::json!(2));
        assert!(!content.text.contains("broken.example"));
        assert!(content.text.contains("body of https://a.example/ok"));
    }

    #[tokio::test]
    async fn zero_scrapeable_results_is_no_content() {
        let (adapter, _) = search_adapter(&["https://broken.example/1"], 3);
        let err = adapter.extract("search:nothing works").await.unwrap_err();
        assert!(matches!(err, ExtractError::NoContent { .. }));
    }

    #[tokio::test]
    async fn envelope_shape_matches_search_contract() {
        let (adapter, _) = search_adapter(&["https://a.example/1", "https://b.example/2"], 3);
        let content = adapter.extract("search: rust dispatch ").await.unwrap();

        assert_eq!(content.source_type, SourceType::WebSearch);
        assert_eq!(content.title, "Search: rust dispatch");
        assert_eq!(content.source_url, "search:rust dispatch");
        assert_eq!(content.metadata["query"], serde_json::json!("rust dispatch"));

        let parts: Vec<&str> = content.text.split(RESULT_SEPARATOR).collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("[title of https://a.example/1]\nhttps://a.example/1\n"));
    }

    #[tokio::test]
    async fn result_text_is_truncated_to_snippet_budget() {
        let scraper = Arc::new(RecordingScraper {
            attempted: Mutex::new(Vec::new()),
        });
        let adapter = WebSearchAdapter::with_parts(
            Arc::new(FixedProvider {
                urls: vec!["https://a.example/long".to_string()],
            }),
            scraper,
            1,
            10,
        );

        let content = adapter.extract("search:budget").await.unwrap();
        // "body of https://a.example/long" cut to 10 chars.
        assert!(content.text.ends_with("body of ht"));
    }

    #[test]
    fn truncate_chars_respects_multibyte_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn ddg_redirect_hrefs_are_decoded() {
        let html = r#"
            <div class="result">
              <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpost&rut=abc">Example</a>
            </div>
            <div class="result">
              <a class="result__a" href="https://direct.example/page">Direct</a>
            </div>
        "#;
        let urls = parse_ddg_results(html, 5);
        assert_eq!(
            urls,
            vec![
                "https://example.com/post".to_string(),
                "https://direct.example/page".to_string(),
            ]
        );
    }

    #[test]
    fn ddg_results_are_capped() {
        let html = r#"
            <a class="result__a" href="https://one.example/">1</a>
            <a class="result__a" href="https://two.example/">2</a>
            <a class="result__a" href="https://three.example/">3</a>
        "#;
        assert_eq!(parse_ddg_results(html, 2).len(), 2);
    }
}
