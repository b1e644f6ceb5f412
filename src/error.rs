//! Error taxonomy for source extraction.
//!
//! Every failure an adapter or the router can produce maps onto one of the
//! variants below, so callers can tell a network problem apart from a missing
//! optional dependency or an unsupported source string without string-matching
//! on messages.

use thiserror::Error;

/// Result alias used throughout the adapter and router layers.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// A failure while routing or extracting a source.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The source could not be reached at all: network fetch failed, the file
    /// does not exist, or an external tool invocation failed outright.
    #[error("source unavailable: {input}: {reason}")]
    SourceUnavailable { input: String, reason: String },

    /// The source was reached but yielded no usable text (empty readability
    /// output, no subtitle file, zero scrapeable search results).
    #[error("no content extracted from {input}: {reason}")]
    NoContent { input: String, reason: String },

    /// An optional external capability required by one adapter is absent.
    /// The message names the install remedy.
    #[error("missing dependency for {adapter}: {remedy}")]
    DependencyMissing { adapter: String, remedy: String },

    /// No registered adapter claimed the source, even after the
    /// fallback-to-search rewrite. Lists the registered adapter names.
    #[error("no adapter found for source: {input} (available adapters: {available})")]
    NoAdapterMatched { input: String, available: String },

    /// A collaborator (MCP server, search provider API) returned a protocol
    /// or auth error. The upstream message is embedded, not swallowed.
    #[error("upstream error from {upstream}: {message}")]
    Upstream { upstream: String, message: String },
}

impl ExtractError {
    pub fn unavailable(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn no_content(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NoContent {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn dependency(adapter: impl Into<String>, remedy: impl Into<String>) -> Self {
        Self::DependencyMissing {
            adapter: adapter.into(),
            remedy: remedy.into(),
        }
    }

    pub fn upstream(upstream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            upstream: upstream.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_adapter_message_lists_available_adapters() {
        let err = ExtractError::NoAdapterMatched {
            input: "gopher://old".to_string(),
            available: "web_search, web, youtube, local_file".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("gopher://old"));
        assert!(msg.contains("youtube"));
    }

    #[test]
    fn dependency_message_names_remedy() {
        let err = ExtractError::dependency("youtube", "install yt-dlp and ensure it is on PATH");
        assert!(err.to_string().contains("install yt-dlp"));
    }
}
