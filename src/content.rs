//! The normalized unit of extracted content.
//!
//! Every adapter, whatever its transport, produces a [`SourceContent`]. The
//! envelope is a transparent value object: downstream stages read it, never
//! mutate it, and treat its presence as the success signal. A successful
//! extraction never carries empty text.

use serde::Serialize;
use serde_json::{Map, Value};

/// Which adapter family produced an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Web,
    WebSearch,
    Youtube,
    LocalFile,
    Gdrive,
    Sharepoint,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Web => "web",
            SourceType::WebSearch => "web_search",
            SourceType::Youtube => "youtube",
            SourceType::LocalFile => "local_file",
            SourceType::Gdrive => "gdrive",
            SourceType::Sharepoint => "sharepoint",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted content from any source.
///
/// `text`, `source_type`, and `source_url` are always populated; `title`
/// defaults to the raw source string when nothing better is discoverable,
/// and `metadata` is an open, adapter-specific mapping (duration, channel,
/// query, result count) that the router never inspects.
#[derive(Debug, Clone, Serialize)]
pub struct SourceContent {
    /// Extracted body text. Never empty on a successful extraction.
    pub text: String,
    /// Best-effort human label for the content.
    pub title: String,
    /// Canonical locator: the original URL, a `file://` URI, or a synthetic
    /// `search:<query>` locator. Stable across repeated extractions of the
    /// same source, so callers can deduplicate on it.
    pub source_url: String,
    /// The adapter family that produced this envelope.
    pub source_type: SourceType,
    /// Adapter-specific extras with no fixed schema.
    pub metadata: Map<String, Value>,
}

impl SourceContent {
    pub fn new(
        text: impl Into<String>,
        title: impl Into<String>,
        source_url: impl Into<String>,
        source_type: SourceType,
    ) -> Self {
        Self {
            text: text.into(),
            title: title.into(),
            source_url: source_url.into(),
            source_type,
            metadata: Map::new(),
        }
    }

    /// Attach adapter-specific metadata.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
