//! The adapter capability and the built-in adapter set.
//!
//! One adapter exists per source family. An adapter answers two questions:
//! does this source string belong to my family ([`SourceAdapter::can_handle`],
//! a cheap pure predicate), and what text does it contain
//! ([`SourceAdapter::extract`], which may hit the network, spawn tools, or
//! read disk). The router probes adapters in registration order and the first
//! claimant wins, so recognition rules are written to be mutually exclusive;
//! the web adapter explicitly declines URLs owned by more specific adapters.
//!
//! # Example
//!
//! ```rust
//! use inlet::adapter::builtin_adapters;
//! use inlet::config::Config;
//!
//! let adapters = builtin_adapters(&Config::default());
//! assert_eq!(adapters[0].name(), "web_search");
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, HttpConfig};
use crate::content::SourceContent;
use crate::error::Result;

/// A source adapter: recognizes and extracts one family of sources.
///
/// Adapters are stateless across calls; all tunable behavior (TLS policy,
/// proxy, credentials, limits) is fixed at construction time and shared
/// read-only, so a single instance is safe to probe and run concurrently.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Whether this adapter claims the given source string.
    ///
    /// Must be cheap and side-effect free: prefix/substring/regex matching
    /// only, never network or file I/O beyond an existence check for paths.
    fn can_handle(&self, source: &str) -> bool;

    /// Extract a content envelope from the source.
    ///
    /// Fails with [`ExtractError::SourceUnavailable`] when the source cannot
    /// be reached, [`ExtractError::NoContent`] when it was reached but no
    /// usable text came out, or [`ExtractError::DependencyMissing`] when an
    /// optional external tool this adapter needs is absent.
    ///
    /// [`ExtractError::SourceUnavailable`]: crate::error::ExtractError::SourceUnavailable
    /// [`ExtractError::NoContent`]: crate::error::ExtractError::NoContent
    /// [`ExtractError::DependencyMissing`]: crate::error::ExtractError::DependencyMissing
    async fn extract(&self, source: &str) -> Result<SourceContent>;
}

/// Build the built-in adapters in their fixed probe order:
/// web search, web, YouTube, local file.
///
/// Construction is total. An adapter whose optional dependency is missing
/// (yt-dlp, an API key) still gets constructed; the failure surfaces on the
/// first `extract` call that actually needs it, so one broken dependency
/// never blocks the other adapters.
pub fn builtin_adapters(config: &Config) -> Vec<Arc<dyn SourceAdapter>> {
    use crate::adapter_file::LocalFileAdapter;
    use crate::adapter_search::WebSearchAdapter;
    use crate::adapter_web::WebAdapter;
    use crate::adapter_youtube::YouTubeAdapter;

    let web = Arc::new(WebAdapter::new(&config.http));
    vec![
        Arc::new(WebSearchAdapter::new(&config.search, &config.http, web.clone())),
        web,
        Arc::new(YouTubeAdapter::new(&config.youtube)),
        Arc::new(LocalFileAdapter::new()),
    ]
}

/// Build a reqwest client honoring the shared HTTP policy.
///
/// Never fails: a malformed proxy URL or TLS setup problem is logged and the
/// client falls back to defaults, keeping adapter-set construction total.
pub(crate) fn http_client(http: &HttpConfig, timeout_secs: u64) -> reqwest::Client {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .danger_accept_invalid_certs(!http.ssl_verify);

    if let Some(proxy_url) = http.resolve_proxy() {
        match reqwest::Proxy::all(&proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => {
                tracing::warn!(proxy = %proxy_url, error = %e, "ignoring unparseable proxy URL")
            }
        }
    }

    builder.build().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to default HTTP client");
        reqwest::Client::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_order_is_search_web_youtube_file() {
        let adapters = builtin_adapters(&Config::default());
        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["web_search", "web", "youtube", "local_file"]);
    }

    #[test]
    fn construction_is_total_with_empty_config() {
        // No API keys, no yt-dlp check, no proxy: still builds all four.
        let adapters = builtin_adapters(&Config::default());
        assert_eq!(adapters.len(), 4);
    }

    #[test]
    fn exactly_one_builtin_claims_each_family_representative() {
        let adapters = builtin_adapters(&Config::default());
        let representatives = [
            "search:agentic workflows",
            "https://example.com/article",
            "https://www.youtube.com/watch?v=abc123",
            "notes.pdf",
        ];
        for source in representatives {
            let claims: Vec<&str> = adapters
                .iter()
                .filter(|a| a.can_handle(source))
                .map(|a| a.name())
                .collect();
            assert_eq!(claims.len(), 1, "{source} claimed by {claims:?}");
        }
    }
}
