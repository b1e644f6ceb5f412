use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
    /// MCP servers keyed by name (e.g. `gdrive`, `sharepoint`). Disabled
    /// entries are parsed but never spawned.
    #[serde(default)]
    pub mcp: HashMap<String, McpServerConfig>,
}

/// Outbound HTTP policy shared by every adapter that talks to the network.
/// Fixed at construction time: every request an adapter makes over its
/// lifetime obeys the same TLS and proxy settings.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_true")]
    pub ssl_verify: bool,
    /// Explicit proxy URL. When unset, `HTTPS_PROXY` / `HTTP_PROXY` from the
    /// environment are honored instead.
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            ssl_verify: true,
            proxy: None,
            timeout_secs: default_http_timeout(),
        }
    }
}

impl HttpConfig {
    /// The proxy to use, if any: explicit config wins, then the conventional
    /// environment variables.
    pub fn resolve_proxy(&self) -> Option<String> {
        self.proxy
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| std::env::var("HTTPS_PROXY").ok().filter(|p| !p.is_empty()))
            .or_else(|| std::env::var("HTTP_PROXY").ok().filter(|p| !p.is_empty()))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// `google`, `brave`, or `duckduckgo`. Providers that need an API key
    /// fall back to DuckDuckGo when the key is empty.
    #[serde(default = "default_search_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    /// Google Custom Search Engine ID (google provider only).
    #[serde(default)]
    pub cx_id: String,
    /// How many result URLs to scrape per query.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Per-result character budget applied before concatenation.
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            api_key: String::new(),
            cx_id: String::new(),
            max_results: default_max_results(),
            snippet_chars: default_snippet_chars(),
            timeout_secs: default_search_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct YoutubeConfig {
    /// Subtitle languages requested in one yt-dlp invocation, in preference
    /// order. Whichever subtitle file materializes is used.
    #[serde(default = "default_subtitle_langs")]
    pub subtitle_langs: Vec<String>,
    #[serde(default = "default_info_timeout")]
    pub info_timeout_secs: u64,
    #[serde(default = "default_subtitle_timeout")]
    pub subtitle_timeout_secs: u64,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            subtitle_langs: default_subtitle_langs(),
            info_timeout_secs: default_info_timeout(),
            subtitle_timeout_secs: default_subtitle_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct McpServerConfig {
    #[serde(default)]
    pub enabled: bool,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_mcp_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_http_timeout() -> u64 {
    15
}
fn default_search_provider() -> String {
    "duckduckgo".to_string()
}
fn default_max_results() -> usize {
    3
}
fn default_snippet_chars() -> usize {
    3000
}
fn default_search_timeout() -> u64 {
    10
}
fn default_subtitle_langs() -> Vec<String> {
    vec!["en".to_string(), "ko".to_string(), "ja".to_string()]
}
fn default_info_timeout() -> u64 {
    30
}
fn default_subtitle_timeout() -> u64 {
    60
}
fn default_mcp_timeout() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    match config.search.provider.as_str() {
        "google" | "brave" | "duckduckgo" => {}
        other => anyhow::bail!(
            "Unknown search provider: '{}'. Must be google, brave, or duckduckgo.",
            other
        ),
    }

    if config.search.max_results == 0 {
        anyhow::bail!("search.max_results must be >= 1");
    }
    if config.search.snippet_chars == 0 {
        anyhow::bail!("search.snippet_chars must be >= 1");
    }
    if config.http.timeout_secs == 0 {
        anyhow::bail!("http.timeout_secs must be >= 1");
    }
    if config.youtube.subtitle_langs.is_empty() {
        anyhow::bail!("youtube.subtitle_langs must not be empty");
    }

    for (name, server) in &config.mcp {
        if server.enabled && server.command.is_empty() {
            anyhow::bail!("mcp.{}.command must be set when enabled", name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_parses_with_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.http.ssl_verify);
        assert_eq!(config.search.provider, "duckduckgo");
        assert_eq!(config.search.max_results, 3);
        assert_eq!(config.youtube.subtitle_langs[0], "en");
        assert!(config.mcp.is_empty());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config: Config = toml::from_str("[search]\nprovider = \"altavista\"").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn mcp_servers_parse_by_name() {
        let config: Config = toml::from_str(
            r#"
            [mcp.gdrive]
            enabled = true
            command = "gdrive-mcp"
            args = ["--readonly"]
            "#,
        )
        .unwrap();
        let gdrive = &config.mcp["gdrive"];
        assert!(gdrive.enabled);
        assert_eq!(gdrive.args, vec!["--readonly"]);
        assert_eq!(gdrive.timeout_secs, 30);
        validate(&config).unwrap();
    }

    #[test]
    fn enabled_mcp_without_command_is_rejected() {
        let config: Config = toml::from_str(
            r#"
            [mcp.gdrive]
            enabled = true
            command = ""
            "#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn explicit_proxy_wins_over_environment() {
        let http = HttpConfig {
            proxy: Some("http://proxy.corp:8080".to_string()),
            ..Default::default()
        };
        assert_eq!(
            http.resolve_proxy().as_deref(),
            Some("http://proxy.corp:8080")
        );
    }
}
