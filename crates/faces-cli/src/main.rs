//! github-faces - build a static gallery of popular GitHub users.
//!
//! Fetches users from the GitHub API, keeps their avatars up to date,
//! renders the site, and lets you browse the result from the terminal with
//! the same filters the page offers.

mod commands;
mod config;
mod view;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use faces_core::filter::SortKey;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::FilterArgs;
use config::Config;

#[derive(Debug, Parser)]
#[command(name = "github-faces", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/github-faces/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// GitHub token; raises the rate limit and enables sponsorship counts
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search and enrich users, refresh avatars, save the cache
    Fetch {
        /// Ignore a fresh cache
        #[arg(long)]
        force: bool,
    },
    /// Render the site from the cache
    Render,
    /// Fetch, then render
    Build {
        #[arg(long)]
        force: bool,
    },
    /// Print the users that pass the filters
    List {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "followers-desc")]
        sort: SortKey,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Pick a random user among those that pass the filters
    Random {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Install the offline cache against the deployed site
    OfflineCheck,
}

/// Initialize the tracing subscriber for logging.
/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing() -> WorkerGuard {
    // RUST_LOG overrides, e.g. RUST_LOG=faces_core=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();

    let config = Config::load(cli.config.as_deref())?;
    info!(site_dir = %config.site_dir.display(), "github-faces starting");

    match cli.command {
        Command::Fetch { force } => {
            commands::fetch(&config, cli.token, force).await?;
        }
        Command::Render => commands::render_from_cache(&config)?,
        Command::Build { force } => {
            let users = commands::fetch(&config, cli.token, force).await?;
            commands::render(&config, &users)?;
        }
        Command::List { filters, sort, limit } => commands::list(&config, &filters, sort, limit)?,
        Command::Random { filters } => commands::random(&config, &filters)?,
        Command::OfflineCheck => commands::offline_check(&config).await?,
    }

    Ok(())
}
