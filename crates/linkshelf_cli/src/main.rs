//! Command-line front end for the linkshelf resource repository.
//!
//! # Responsibility
//! - Map subcommands one-to-one onto repository handlers.
//! - Print every handler envelope as JSON on stdout.
//!
//! Exit status is `0` for success envelopes, `1` for failure envelopes and
//! `2` when the repository could not be wired at all.

use clap::{Args, Parser, Subcommand};
use linkshelf_core::{init_logging, LinkshelfConfig, Outcome, ResourceRepository};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "linkshelf")]
#[command(about = "Store, vote on and search bookmarked links", version)]
struct Cli {
    /// JSON config file; `LINKSHELF_*` environment variables apply when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file, overriding the configured one.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch page metadata and store a new link
    Add { link: String, author: String },

    /// List stored links, newest first
    List(ListArgs),

    /// Literal search over link, title and description
    Search {
        key: String,
        #[command(flatten)]
        window: ListArgs,
    },

    /// Move a resource to a new link
    UpdateLink { old_link: String, new_link: String },

    /// Change the author of a resource
    UpdateAuthor { link: String, author: String },

    /// Remove a resource
    Delete { link: String },

    /// Record an upvote
    Upvote { link: String, user_id: String },

    /// Record a downvote
    Downvote { link: String, user_id: String },

    /// Number of stored resources
    Count,

    /// Totals of up and down votes
    Votes,
}

#[derive(Args)]
struct ListArgs {
    /// Return every match instead of one page
    #[arg(long, conflicts_with_all = ["page", "limit"])]
    all: bool,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = 10)]
    limit: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let repo = match bootstrap(cli.config.as_deref(), cli.db) {
        Ok(repo) => repo,
        Err(err) => {
            eprintln!("linkshelf: {err}");
            return ExitCode::from(2);
        }
    };

    let printed = match cli.command {
        Commands::Add { link, author } => emit(repo.create(&link, &author).await),
        Commands::List(window) if window.all => emit(repo.read_all().await),
        Commands::List(window) => emit(repo.read(window.page, window.limit).await),
        Commands::Search { key, window } if window.all => emit(repo.search_all(&key).await),
        Commands::Search { key, window } => {
            emit(repo.search(&key, window.page, window.limit).await)
        }
        Commands::UpdateLink { old_link, new_link } => {
            emit(repo.update_link(&old_link, &new_link).await)
        }
        Commands::UpdateAuthor { link, author } => {
            emit(repo.update_author(&link, &author).await)
        }
        Commands::Delete { link } => emit(repo.delete(&link).await),
        Commands::Upvote { link, user_id } => emit(repo.upvote(&link, &user_id).await),
        Commands::Downvote { link, user_id } => emit(repo.downvote(&link, &user_id).await),
        Commands::Count => emit(repo.resource_count().await),
        Commands::Votes => emit(repo.votes_count().await),
    };

    match printed {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("linkshelf: failed to render response: {err}");
            ExitCode::from(2)
        }
    }
}

fn bootstrap(
    config_path: Option<&Path>,
    db_override: Option<PathBuf>,
) -> Result<ResourceRepository, Box<dyn Error>> {
    let mut config = match config_path {
        Some(path) => load_config_file(path)?,
        None => LinkshelfConfig::from_env()?,
    };
    if db_override.is_some() {
        config.database_path = db_override;
    }
    config.validate()?;

    if let Some(log_dir) = config.log_dir.as_ref() {
        init_logging(&config.log_level, log_dir)?;
    }
    info!(
        "event=cli_start module=cli status=ok version={}",
        linkshelf_core::core_version()
    );

    Ok(ResourceRepository::from_config(&config)?)
}

fn load_config_file(path: &Path) -> Result<LinkshelfConfig, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read config `{}`: {err}", path.display()))?;
    let config = LinkshelfConfig::from_json_str(&raw)
        .map_err(|err| format!("invalid config `{}`: {err}", path.display()))?;
    Ok(config)
}

/// Prints the envelope and reports whether it was a success.
fn emit<P: Serialize>(outcome: Outcome<P>) -> Result<bool, serde_json::Error> {
    let (rendered, ok) = match outcome {
        Ok(envelope) => (serde_json::to_string_pretty(&envelope)?, true),
        Err(envelope) => (serde_json::to_string_pretty(&envelope)?, false),
    };
    println!("{rendered}");
    Ok(ok)
}
