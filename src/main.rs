//! # Grounder CLI (`grd`)
//!
//! The `grd` binary assembles grounding context for questions about a
//! configured remote software project, and exposes the individual retrieval
//! stages for inspection.
//!
//! ## Usage
//!
//! ```bash
//! grd --config ./grounder.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `grd context "<question>"` | Assemble and print grounding context |
//! | `grd tree` | List the repository file tree (cached or fetched) |
//! | `grd file <path>` | Print one repository file (cached or fetched) |
//! | `grd rank <keyword>...` | Rank repository files against keywords |
//! | `grd cache clear` | Delete every cached record |
//!
//! ## Examples
//!
//! ```bash
//! # Assemble context for a question
//! grd context "How do I create a new component?" --config ./grounder.toml
//!
//! # Inspect what the ranker would pick for a keyword set
//! grd rank component ui --limit 5 --config ./grounder.toml
//!
//! # Force the next run to refetch everything
//! grd cache clear --config ./grounder.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use grounder::{assemble, cache, config, content, rank, tree};

/// Grounder CLI — question-grounding context retrieval for a remote
/// software project.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file describing the project's documentation site, repository coordinates,
/// and cache backend.
#[derive(Parser)]
#[command(
    name = "grd",
    about = "Grounder — question-grounding context retrieval for a remote software project",
    version,
    long_about = "Grounder turns a natural-language question into a bounded, relevance-ranked \
    bundle of documentation pages and repository source files, with two-tier caching that \
    degrades gracefully on hosts without writable disk."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./grounder.toml`. Project, repository, cache, fetch,
    /// and assembly settings are read from this file.
    #[arg(long, global = true, default_value = "./grounder.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Assemble grounding context for a question.
    ///
    /// Fetches the documentation root page, keyword-matched sub-pages, the
    /// repository README, manifest, entry point, and ranked candidate files,
    /// then prints the concatenated context to stdout. Prints an explicit
    /// notice when nothing could be retrieved.
    Context {
        /// The question to ground.
        question: String,
    },

    /// List the repository file tree.
    ///
    /// Served from the cache when the snapshot is inside the freshness
    /// window; otherwise fetched from the listing service.
    Tree,

    /// Print one repository file.
    ///
    /// Served from the cache when present; cached contents are kept
    /// indefinitely once fetched. Exits non-zero when the file does not
    /// exist on the configured branch.
    File {
        /// Repository-relative file path, e.g. `src/index.ts`.
        path: String,
    },

    /// Rank repository files against explicit keywords.
    ///
    /// Prints score and path for each match. Useful for inspecting what
    /// `context` would fetch for a given keyword set.
    Rank {
        /// Keywords to score against file paths.
        #[arg(required = true)]
        keywords: Vec<String>,

        /// Maximum number of results to print.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Manage the cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache management subcommands.
#[derive(Subcommand)]
enum CacheAction {
    /// Delete every cached record.
    ///
    /// Wipes the persistent tier for the configured backend. The next
    /// `context`, `tree`, or `file` invocation refetches from upstream.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr so context output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Context { question } => {
            assemble::run_context(&cfg, &question).await?;
        }
        Commands::Tree => {
            tree::run_tree(&cfg).await?;
        }
        Commands::File { path } => {
            content::run_file(&cfg, &path).await?;
        }
        Commands::Rank { keywords, limit } => {
            rank::run_rank(&cfg, &keywords, limit).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Clear => {
                cache::run_cache_clear(&cfg)?;
            }
        },
    }

    Ok(())
}
