//! YouTube subtitle adapter.
//!
//! Two independent yt-dlp invocations: a metadata lookup (title, duration,
//! channel, upload date) and a subtitle download into a scratch directory.
//! Metadata failure degrades to using the raw URL as the title; subtitle
//! failure is fatal because without captions there is no text to return.
//! Manual and auto-generated captions are requested together in one
//! invocation and whichever `.vtt` file materializes on disk is used.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::adapter::SourceAdapter;
use crate::config::YoutubeConfig;
use crate::content::{SourceContent, SourceType};
use crate::error::{ExtractError, Result};
use crate::exec::{CommandRunner, ToolRunner};

const YT_PATTERN: &str = r"(youtube\.com/watch\?v=|youtu\.be/|youtube\.com/shorts/)";

pub struct YouTubeAdapter {
    runner: Arc<dyn ToolRunner>,
    pattern: Regex,
    subtitle_langs: String,
    info_timeout: Duration,
    subtitle_timeout: Duration,
}

impl YouTubeAdapter {
    pub fn new(config: &YoutubeConfig) -> Self {
        Self::with_runner(config, Arc::new(CommandRunner))
    }

    /// Substitute the tool invoker (used by tests to fake yt-dlp).
    pub fn with_runner(config: &YoutubeConfig, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            pattern: Regex::new(YT_PATTERN).expect("youtube pattern is valid"),
            subtitle_langs: config.subtitle_langs.join(","),
            info_timeout: Duration::from_secs(config.info_timeout_secs),
            subtitle_timeout: Duration::from_secs(config.subtitle_timeout_secs),
        }
    }

    /// Fetch structured video metadata. Degrades to an empty object (title
    /// falls back to the URL) on any failure except a missing yt-dlp, which
    /// would make the subtitle step fail anyway.
    async fn video_info(&self, url: &str) -> Result<Value> {
        let args = vec![
            "--dump-json".to_string(),
            "--no-download".to_string(),
            url.to_string(),
        ];
        match self.runner.run("yt-dlp", &args, self.info_timeout).await {
            Ok(output) if output.success => {
                Ok(serde_json::from_str(&output.stdout).unwrap_or(Value::Null))
            }
            Ok(output) => {
                warn!(url, stderr = %output.stderr.trim(), "yt-dlp metadata lookup failed");
                Ok(Value::Null)
            }
            Err(e @ ExtractError::DependencyMissing { .. }) => Err(e),
            Err(e) => {
                warn!(url, error = %e, "yt-dlp metadata lookup failed");
                Ok(Value::Null)
            }
        }
    }

    /// Download subtitles into a scratch directory and parse whichever
    /// `.vtt` file shows up. Requests manual and auto-generated captions
    /// together; no distinction is made beyond accepting whichever exists.
    async fn subtitles(&self, url: &str) -> Result<String> {
        let scratch = tempfile::tempdir().map_err(|e| {
            ExtractError::unavailable(url, format!("failed to create scratch dir: {}", e))
        })?;
        let out_path = scratch.path().join("subs");

        let args = vec![
            "--write-auto-sub".to_string(),
            "--write-sub".to_string(),
            "--sub-lang".to_string(),
            self.subtitle_langs.clone(),
            "--sub-format".to_string(),
            "vtt".to_string(),
            "--skip-download".to_string(),
            "-o".to_string(),
            out_path.to_string_lossy().into_owned(),
            url.to_string(),
        ];
        // Exit status is ignored: yt-dlp reports nonzero for some videos
        // that still produced a subtitle file. The file is the signal.
        let _ = self
            .runner
            .run("yt-dlp", &args, self.subtitle_timeout)
            .await?;

        let vtt = first_vtt_file(scratch.path())?;
        match vtt {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    ExtractError::unavailable(url, format!("failed to read subtitle file: {}", e))
                })?;
                let text = parse_vtt(&raw);
                if text.is_empty() {
                    return Err(ExtractError::no_content(url, "subtitle file was empty"));
                }
                Ok(text)
            }
            None => Err(ExtractError::no_content(
                url,
                format!("no subtitles found for: {}", url),
            )),
        }
    }
}

#[async_trait]
impl SourceAdapter for YouTubeAdapter {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn can_handle(&self, source: &str) -> bool {
        self.pattern.is_match(source)
    }

    async fn extract(&self, source: &str) -> Result<SourceContent> {
        let info = self.video_info(source).await?;
        let title = info["title"].as_str().unwrap_or(source).to_string();
        debug!(url = %source, %title, "fetching YouTube subtitles");

        let text = self.subtitles(source).await?;

        let mut metadata = serde_json::Map::new();
        for key in ["duration", "channel", "upload_date"] {
            metadata.insert(key.to_string(), info[key].clone());
        }

        Ok(
            SourceContent::new(text, title, source, SourceType::Youtube)
                .with_metadata(metadata),
        )
    }
}

fn first_vtt_file(dir: &Path) -> Result<Option<std::path::PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        ExtractError::unavailable(
            dir.to_string_lossy(),
            format!("failed to list scratch dir: {}", e),
        )
    })?;
    let mut vtt_files: Vec<std::path::PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "vtt"))
        .collect();
    vtt_files.sort();
    Ok(vtt_files.into_iter().next())
}

/// Parse VTT caption markup into deduplicated plain-text lines.
///
/// Strips cue timings, WEBVTT headers, and inline markup tags. Auto-generated
/// captions re-emit overlapping text across cues, so repeated lines are
/// dropped while preserving first-occurrence order.
fn parse_vtt(raw: &str) -> String {
    let tag = Regex::new(r"<[^>]+>").expect("tag pattern is valid");
    let mut seen = HashSet::new();
    let mut lines = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty()
            || line.contains("-->")
            || line.starts_with("WEBVTT")
            || line.starts_with("Kind:")
            || line.starts_with("Language:")
        {
            continue;
        }
        let clean = tag.replace_all(line, "").trim().to_string();
        if !clean.is_empty() && seen.insert(clean.clone()) {
            lines.push(clean);
        }
    }

    lines.join("\n")
}
