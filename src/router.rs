//! Source routing: match an input string to an adapter and extract.
//!
//! The router is the only surface callers see. For each source it probes the
//! adapter set in registration order (recognition rules can overlap, so
//! precedence must be deterministic) and hands the source to the first
//! claimant. A bare phrase that no adapter claims and that does not
//! look like a URL, path, or explicit query is rewritten to
//! `search:<phrase>` and probed again, so that text typed by a user becomes
//! a web search instead of an immediate error.

use std::sync::Arc;
use tracing::debug;

use crate::adapter::{builtin_adapters, SourceAdapter};
use crate::adapter_mcp::{GDriveAdapter, SharePointAdapter};
use crate::config::Config;
use crate::content::SourceContent;
use crate::error::{ExtractError, Result};
use crate::mcp::McpSession;

pub struct SourceRouter {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl SourceRouter {
    /// Build a router with the built-in adapters plus any MCP-backed
    /// adapters enabled in the config. Construction never fails; adapters
    /// with missing optional dependencies fail on first use instead.
    pub fn from_config(config: &Config) -> Self {
        let mut router = Self::new(builtin_adapters(config));

        let any_mcp = config.mcp.values().any(|s| s.enabled);
        if any_mcp {
            let session = Arc::new(McpSession::new(config.mcp.clone()));
            if config.mcp.get("gdrive").is_some_and(|s| s.enabled) {
                router.register(Arc::new(GDriveAdapter::new(session.clone())));
            }
            if config.mcp.get("sharepoint").is_some_and(|s| s.enabled) {
                router.register(Arc::new(SharePointAdapter::new(session)));
            }
        }

        router
    }

    /// Build a router over an explicit adapter list, probed in order.
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self { adapters }
    }

    /// Append an adapter to the probe order (host-side extension point).
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.push(adapter);
    }

    /// Names of all registered adapters, in probe order.
    pub fn adapter_names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Auto-detect the source type and extract one envelope.
    pub async fn extract(&self, source: &str) -> Result<SourceContent> {
        if let Some(adapter) = self.probe(source) {
            debug!(source, adapter = adapter.name(), "dispatching source");
            return adapter.extract(source).await;
        }

        if is_bare_phrase(source) {
            let rewritten = format!("search:{}", source);
            debug!(source, "no adapter matched, retrying as web search");
            if let Some(adapter) = self.probe(&rewritten) {
                return adapter.extract(&rewritten).await;
            }
        }

        Err(ExtractError::NoAdapterMatched {
            input: source.to_string(),
            available: self.adapter_names().join(", "),
        })
    }

    /// Extract from multiple sources, sequentially and in order.
    ///
    /// All-or-nothing: the first failure propagates and the remaining
    /// sources are not attempted. Callers that want per-item tolerance
    /// loop over [`extract`](Self::extract) themselves.
    pub async fn extract_many(&self, sources: &[String]) -> Result<Vec<SourceContent>> {
        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            results.push(self.extract(source).await?);
        }
        Ok(results)
    }

    fn probe(&self, source: &str) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.iter().find(|a| a.can_handle(source))
    }
}

/// Whether an unclaimed source should be retried as a web search.
///
/// Deliberately ad hoc, preserved for compatibility: anything that already
/// looks like a URL, an explicit query, or a filesystem path (including
/// Windows drive letters) is left alone; only a bare non-empty phrase is
/// rewritten.
fn is_bare_phrase(source: &str) -> bool {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return false;
    }
    if trimmed
        .get(..7)
        .is_some_and(|p| p.eq_ignore_ascii_case("search:"))
    {
        return false;
    }
    if trimmed.starts_with('/') || trimmed.starts_with("./") || trimmed.starts_with('~') {
        return false;
    }
    // Windows drive-letter paths: C:\... or C:/...
    let mut chars = trimmed.chars();
    if let (Some(letter), Some(':'), Some(sep)) = (chars.next(), chars.next(), chars.next()) {
        if letter.is_ascii_alphabetic() && (sep == '\\' || sep == '/') {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SourceType;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Stub adapter that claims sources by prefix and records extract calls.
    struct StubAdapter {
        name: &'static str,
        prefix: &'static str,
        fail: bool,
        calls: Mutex<Vec<String>>,
    }

    impl StubAdapter {
        fn new(name: &'static str, prefix: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                prefix,
                fail: false,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(name: &'static str, prefix: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                prefix,
                fail: true,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        fn can_handle(&self, source: &str) -> bool {
            source.starts_with(self.prefix)
        }

        async fn extract(&self, source: &str) -> Result<SourceContent> {
            self.calls.lock().unwrap().push(source.to_string());
            if self.fail {
                return Err(ExtractError::unavailable(source, "stub failure"));
            }
            Ok(SourceContent::new(
                format!("text from {}", self.name),
                source,
                source,
                SourceType::Web,
            ))
        }
    }

    #[tokio::test]
    async fn first_claiming_adapter_wins() {
        let first = StubAdapter::new("first", "scheme:");
        let second = StubAdapter::new("second", "scheme:");
        let router = SourceRouter::new(vec![first.clone(), second.clone()]);

        router.extract("scheme:thing").await.unwrap();
        assert_eq!(first.calls.lock().unwrap().len(), 1);
        assert!(second.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bare_phrase_is_rewritten_to_search() {
        let search = StubAdapter::new("web_search", "search:");
        let router = SourceRouter::new(vec![search.clone()]);

        let content = router.extract("agentic workflows").await.unwrap();
        assert_eq!(
            search.calls.lock().unwrap().as_slice(),
            ["search:agentic workflows"]
        );
        assert_eq!(content.source_url, "search:agentic workflows");
    }

    #[tokio::test]
    async fn urls_and_paths_are_not_rewritten() {
        let search = StubAdapter::new("web_search", "search:");
        let router = SourceRouter::new(vec![search.clone()]);

        for source in [
            "https://unclaimed.example/page",
            "http://unclaimed.example/page",
            "/var/data/notes.unknown",
            "./notes.unknown",
            "~/notes.unknown",
            r"C:\docs\notes.unknown",
            "C:/docs/notes.unknown",
        ] {
            let err = router.extract(source).await.unwrap_err();
            assert!(
                matches!(err, ExtractError::NoAdapterMatched { .. }),
                "{source} should not be rewritten"
            );
        }
        assert!(search.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_string_is_no_adapter_matched() {
        let router = SourceRouter::from_config(&Config::default());
        let err = router.extract("").await.unwrap_err();
        match err {
            ExtractError::NoAdapterMatched { available, .. } => {
                assert_eq!(available, "web_search, web, youtube, local_file");
            }
            other => panic!("expected NoAdapterMatched, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn extract_many_preserves_input_order() {
        let a = StubAdapter::new("a", "a:");
        let b = StubAdapter::new("b", "b:");
        let router = SourceRouter::new(vec![a, b]);

        let sources = vec!["b:1".to_string(), "a:2".to_string(), "b:3".to_string()];
        let results = router.extract_many(&sources).await.unwrap();
        let urls: Vec<&str> = results.iter().map(|c| c.source_url.as_str()).collect();
        assert_eq!(urls, vec!["b:1", "a:2", "b:3"]);
    }

    #[tokio::test]
    async fn extract_many_aborts_on_first_failure() {
        let ok = StubAdapter::new("ok", "ok:");
        let bad = StubAdapter::failing("bad", "bad:");
        let router = SourceRouter::new(vec![ok.clone(), bad]);

        let sources = vec!["ok:1".to_string(), "bad:2".to_string(), "ok:3".to_string()];
        let err = router.extract_many(&sources).await.unwrap_err();
        assert!(matches!(err, ExtractError::SourceUnavailable { .. }));
        // The source after the failing one was never attempted.
        assert_eq!(ok.calls.lock().unwrap().as_slice(), ["ok:1"]);
    }

    #[tokio::test]
    async fn registered_adapters_probe_after_builtins() {
        let mut router = SourceRouter::from_config(&Config::default());
        let custom = StubAdapter::new("notion", "notion://");
        router.register(custom.clone());

        assert_eq!(
            router.adapter_names(),
            vec!["web_search", "web", "youtube", "local_file", "notion"]
        );
        router.extract("notion://page/123").await.unwrap();
        assert_eq!(custom.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mcp_adapters_register_when_enabled() {
        let config: Config = toml::from_str(
            r#"
            [mcp.gdrive]
            enabled = true
            command = "gdrive-mcp"

            [mcp.sharepoint]
            enabled = true
            command = "sharepoint-mcp"
            "#,
        )
        .unwrap();

        let router = SourceRouter::from_config(&config);
        assert_eq!(
            router.adapter_names(),
            vec![
                "web_search",
                "web",
                "youtube",
                "local_file",
                "gdrive",
                "sharepoint"
            ]
        );
    }

    #[test]
    fn bare_phrase_heuristic_matches_documented_prefixes() {
        assert!(is_bare_phrase("agentic workflows"));
        assert!(is_bare_phrase("rust: the good parts"));
        assert!(!is_bare_phrase(""));
        assert!(!is_bare_phrase("   "));
        assert!(!is_bare_phrase("search:already a query"));
        assert!(!is_bare_phrase("SEARCH:already a query"));
        assert!(!is_bare_phrase("https://example.com"));
        assert!(!is_bare_phrase("/etc/hosts"));
        assert!(!is_bare_phrase(r"D:\files\doc.txt"));
    }
}
