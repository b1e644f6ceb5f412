//! # Inlet CLI (`inlet`)
//!
//! The `inlet` binary extracts text content from heterogeneous sources and
//! prints uniform envelopes. Sources are auto-detected: URLs are fetched,
//! `search:` queries hit a web search provider, YouTube links yield subtitle
//! transcripts, file paths are parsed by format, and bare phrases become
//! searches.
//!
//! ## Usage
//!
//! ```bash
//! inlet --config ./config/inlet.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `inlet extract <source>...` | Extract content from one or more sources |
//! | `inlet adapters` | List registered adapters in probe order |
//!
//! ## Examples
//!
//! ```bash
//! # A web page
//! inlet extract "https://example.com/article"
//!
//! # A local PDF and a spreadsheet
//! inlet extract ./reports/q3.pdf ./data/metrics.xlsx
//!
//! # An explicit search query
//! inlet extract "search: retrieval augmented generation"
//!
//! # A bare phrase (retried as a search)
//! inlet extract "agentic workflows" --json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use inlet::config;
use inlet::router::SourceRouter;

/// Inlet CLI — a source routing and content extraction layer for
/// knowledge tools.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/inlet.example.toml` for a full example. A missing
/// config file is not an error; built-in defaults apply.
#[derive(Parser)]
#[command(
    name = "inlet",
    about = "Inlet — extract uniform text content from URLs, files, searches, and more",
    version,
    long_about = "Inlet turns heterogeneous source strings (URLs, file paths, search queries, \
    bare phrases) into uniform text envelopes. Each source is matched against a set of adapters \
    and the first adapter that recognizes it performs the extraction."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/inlet.toml`. Search provider, HTTP, YouTube,
    /// and MCP server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/inlet.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Extract content from one or more sources.
    ///
    /// Sources are processed sequentially and in order. Extraction is
    /// all-or-nothing: the first failing source aborts the run with a
    /// nonzero exit code.
    Extract {
        /// Sources to extract: URLs, file paths, `search:` queries, or
        /// bare phrases.
        #[arg(required = true)]
        sources: Vec<String>,

        /// Emit results as a JSON array instead of readable text.
        #[arg(long)]
        json: bool,
    },

    /// List registered adapters in probe order.
    ///
    /// The first adapter in this list that recognizes a source claims it,
    /// so order doubles as precedence.
    Adapters,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        config::Config::default()
    };
    let router = SourceRouter::from_config(&cfg);

    match cli.command {
        Commands::Extract { sources, json } => {
            let results = router.extract_many(&sources).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for content in &results {
                    println!("=== {} ({})", content.title, content.source_type);
                    println!("    {}", content.source_url);
                    println!();
                    println!("{}", content.text);
                    println!();
                }
            }
        }
        Commands::Adapters => {
            for name in router.adapter_names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
