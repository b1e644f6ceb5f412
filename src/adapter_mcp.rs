//! MCP-backed Google Drive and SharePoint/OneDrive adapters.
//!
//! These adapters own the URL recognition and envelope mapping; the actual
//! fetch is delegated to an external MCP server through the
//! [`ToolInvoker`] contract. They are only registered when the matching
//! server is enabled in the config.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::adapter::SourceAdapter;
use crate::content::{SourceContent, SourceType};
use crate::error::{ExtractError, Result};
use crate::mcp::ToolInvoker;

const GDRIVE_PATTERN: &str = r"(drive\.google\.com|docs\.google\.com|gdrive://)";
const SHAREPOINT_PATTERN: &str = r"(sharepoint\.com|onedrive\.live|onedrive://|sharepoint://)";

pub struct GDriveAdapter {
    invoker: Arc<dyn ToolInvoker>,
    pattern: Regex,
    file_id_patterns: Vec<Regex>,
}

impl GDriveAdapter {
    pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
        Self {
            invoker,
            pattern: Regex::new(GDRIVE_PATTERN).expect("gdrive pattern is valid"),
            file_id_patterns: vec![
                Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("pattern is valid"),
                Regex::new(r"id=([a-zA-Z0-9_-]+)").expect("pattern is valid"),
            ],
        }
    }

    /// Pull the Drive file id out of a sharing URL or a `gdrive://` URI.
    /// Unrecognized shapes pass through verbatim and let the server decide.
    fn parse_file_id<'a>(&self, source: &'a str) -> &'a str {
        if let Some(id) = source.strip_prefix("gdrive://") {
            return id;
        }
        for pattern in &self.file_id_patterns {
            if let Some(captures) = pattern.captures(source) {
                if let Some(m) = captures.get(1) {
                    return m.as_str();
                }
            }
        }
        source
    }
}

#[async_trait]
impl SourceAdapter for GDriveAdapter {
    fn name(&self) -> &'static str {
        "gdrive"
    }

    fn can_handle(&self, source: &str) -> bool {
        self.pattern.is_match(source)
    }

    async fn extract(&self, source: &str) -> Result<SourceContent> {
        let file_id = self.parse_file_id(source);
        debug!(source, file_id, "fetching file via gdrive MCP server");

        let result = self
            .invoker
            .call_tool("gdrive", "read_file", json!({ "file_id": file_id }))
            .await?;

        envelope_from_tool_result(result, source, SourceType::Gdrive)
    }
}

pub struct SharePointAdapter {
    invoker: Arc<dyn ToolInvoker>,
    pattern: Regex,
}

impl SharePointAdapter {
    pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
        Self {
            invoker,
            pattern: Regex::new(SHAREPOINT_PATTERN).expect("sharepoint pattern is valid"),
        }
    }
}

#[async_trait]
impl SourceAdapter for SharePointAdapter {
    fn name(&self) -> &'static str {
        "sharepoint"
    }

    fn can_handle(&self, source: &str) -> bool {
        self.pattern.is_match(source)
    }

    async fn extract(&self, source: &str) -> Result<SourceContent> {
        debug!(source, "fetching file via sharepoint MCP server");

        let result = self
            .invoker
            .call_tool(
                "sharepoint",
                "get_file_content",
                json!({ "path_or_url": source }),
            )
            .await?;

        envelope_from_tool_result(result, source, SourceType::Sharepoint)
    }
}

/// Map an MCP tool result onto the envelope shape: `content` becomes the
/// text, `name` the title, `metadata` passes through.
fn envelope_from_tool_result(
    result: Value,
    source: &str,
    source_type: SourceType,
) -> Result<SourceContent> {
    let text = result
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ExtractError::no_content(
            source,
            "MCP server returned no content",
        ));
    }

    let title = result
        .get("name")
        .and_then(|n| n.as_str())
        .unwrap_or(source)
        .to_string();

    let metadata = match result.get("metadata") {
        Some(Value::Object(map)) => map.clone(),
        _ => serde_json::Map::new(),
    };

    Ok(SourceContent::new(text, title, source, source_type).with_metadata(metadata))
}
