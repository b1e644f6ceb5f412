//! # Inlet
//!
//! A source routing and content extraction layer for knowledge tools.
//!
//! Inlet turns heterogeneous source strings (URLs, file paths, search
//! queries, bare phrases) into uniform text envelopes. A router matches each
//! source against a set of adapters and the first adapter that recognizes it
//! performs the extraction: web pages are fetched and stripped of
//! boilerplate, search queries fan out to a provider and scrape the top
//! hits, YouTube URLs yield subtitle transcripts, local files are parsed by
//! format, and Drive/SharePoint URLs are delegated to external MCP servers.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────────────────────────────────┐
//! │  sources   │──▶│              SourceRouter               │
//! │ URL/path/  │   │  probe adapters in order, first match   │
//! │ query/text │   │  wins; bare text retried as a search    │
//! └────────────┘   └──────┬──────┬──────┬──────┬──────┬──────┘
//!                         ▼      ▼      ▼      ▼      ▼
//!                     ┌──────┐┌─────┐┌──────┐┌─────┐┌───────┐
//!                     │search││ web ││  yt  ││file ││  mcp  │
//!                     └──┬───┘└──┬──┘└──┬───┘└──┬──┘└───┬───┘
//!                        └───────┴──────┴───────┴───────┘
//!                                       ▼
//!                              ┌────────────────┐
//!                              │ SourceContent  │
//!                              │ text + title + │
//!                              │ url + metadata │
//!                              └────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! inlet extract "https://example.com/article"
//! inlet extract ./notes/design.pdf "search: retrieval augmented generation"
//! inlet extract "agentic workflows" --json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`content`] | The extraction result envelope |
//! | [`error`] | Error taxonomy for extraction failures |
//! | [`adapter`] | The adapter contract and built-in adapter set |
//! | [`router`] | Source-to-adapter dispatch |
//! | [`adapter_web`] | Web page fetch and boilerplate removal |
//! | [`adapter_search`] | Web search with pluggable providers |
//! | [`adapter_youtube`] | YouTube subtitle transcripts via yt-dlp |
//! | [`adapter_file`] | Local file parsing (PDF, DOCX, XLSX, CSV, text) |
//! | [`adapter_mcp`] | Drive and SharePoint adapters backed by MCP |
//! | [`mcp`] | Stdio JSON-RPC client for MCP servers |
//! | [`exec`] | External tool invocation |

pub mod adapter;
pub mod adapter_file;
pub mod adapter_mcp;
pub mod adapter_search;
pub mod adapter_web;
pub mod adapter_youtube;
pub mod config;
pub mod content;
pub mod error;
pub mod exec;
pub mod mcp;
pub mod router;
