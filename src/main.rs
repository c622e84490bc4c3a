//! media-cli - command-line client for a personal media server
//!
//! Browses the catalog, searches, and tracks watch progress over the
//! server's token-authenticated REST API.

mod api;
mod auth;
mod config;
mod models;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{ItemPart, Shelf};
use crate::models::{Category, WatchReport};

#[derive(Parser)]
#[command(name = "media-cli")]
#[command(about = "Command-line client for a personal media server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Server URL (overrides the stored one)
    #[arg(long, global = true)]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a login key and store it with the server URL
    Login {
        /// Login key (prompted for if omitted)
        #[arg(short, long)]
        key: Option<String>,

        /// Replace a stored key
        #[arg(short, long)]
        force: bool,
    },

    /// Forget the stored login key
    Logout,

    /// Show stored login state
    Status,

    /// Log in and show the API token session
    Token,

    /// Recently updated items
    Catalog,

    /// TV shows
    Tv,

    /// Movies
    Movies,

    /// Alphabetical index of the whole library
    Index,

    /// Show an item
    Item {
        id: u64,

        /// Show a sub-resource instead of the item itself
        #[arg(value_enum)]
        part: Option<ItemPart>,
    },

    /// Show a video
    Video { id: u64 },

    /// List subtitles of a video
    Subtitles { video_id: u64 },

    /// Download a subtitle file by hash key
    SubtitleGet {
        hash_key: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Search titles
    Search { query: String },

    /// Show current profile (verify auth works)
    Whoami,

    /// Continue-watching list and watchlist
    Feed,

    /// Show resume position for a video
    Progress { video_id: u64 },

    /// Report watch time for a video
    Report {
        media_id: u64,
        video_id: u64,

        /// Playback position in seconds
        #[arg(long)]
        paused_at: u64,

        /// Video length in seconds
        #[arg(long)]
        duration: u64,

        /// Seconds actually played since the last report
        #[arg(long, default_value = "0")]
        played: u64,
    },

    /// Show or change watchlist state of an item
    Watchlist {
        media_id: u64,

        /// Add to watchlist
        #[arg(long, conflicts_with = "remove")]
        add: bool,

        /// Remove from watchlist
        #[arg(long)]
        remove: bool,
    },

    /// Delete an item from the library (admin)
    Delete { media_id: u64 },

    /// Ask the server to re-fetch metadata for an item (admin)
    Request {
        media_id: u64,

        /// tv or movie
        #[arg(short, long)]
        category: Category,

        /// Title to search metadata for
        #[arg(short, long)]
        title: String,

        /// Release year
        #[arg(short, long)]
        year: Option<String>,
    },

    /// Show status of a background job
    Job { job_id: String },

    /// Rescan the server's media folders (admin)
    Rescan,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let server = cli.server.as_deref();

    match cli.command {
        Commands::Login { key, force } => {
            tracing::info!("Verifying login key...");
            auth::save_login(server, key, force).await?;
        }
        Commands::Logout => {
            auth::logout().await?;
        }
        Commands::Status => {
            auth::status().await?;
        }
        Commands::Token => {
            api::token_status(server).await?;
        }
        Commands::Catalog => {
            api::list_shelf(server, Shelf::New).await?;
        }
        Commands::Tv => {
            api::list_shelf(server, Shelf::Tv).await?;
        }
        Commands::Movies => {
            api::list_shelf(server, Shelf::Movies).await?;
        }
        Commands::Index => {
            api::show_index(server).await?;
        }
        Commands::Item { id, part } => {
            api::show_item(server, id, part).await?;
        }
        Commands::Video { id } => {
            api::show_video(server, id).await?;
        }
        Commands::Subtitles { video_id } => {
            api::subtitles(server, video_id).await?;
        }
        Commands::SubtitleGet { hash_key, output } => {
            api::download_subtitle(server, &hash_key, &output).await?;
        }
        Commands::Search { query } => {
            api::search(server, &query).await?;
        }
        Commands::Whoami => {
            api::whoami(server).await?;
        }
        Commands::Feed => {
            api::feed(server).await?;
        }
        Commands::Progress { video_id } => {
            api::progress(server, video_id).await?;
        }
        Commands::Report {
            media_id,
            video_id,
            paused_at,
            duration,
            played,
        } => {
            let report = WatchReport {
                media_id,
                video_id,
                paused_at,
                video_duration: duration,
                seconds_played: played,
            };
            api::report(server, report).await?;
        }
        Commands::Watchlist {
            media_id,
            add,
            remove,
        } => {
            let set = match (add, remove) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            api::watchlist(server, media_id, set).await?;
        }
        Commands::Delete { media_id } => {
            tracing::info!("Deleting item {}...", media_id);
            api::delete(server, media_id).await?;
        }
        Commands::Request {
            media_id,
            category,
            title,
            year,
        } => {
            api::request_metadata(server, media_id, category, title, year).await?;
        }
        Commands::Job { job_id } => {
            api::job(server, &job_id).await?;
        }
        Commands::Rescan => {
            api::rescan(server).await?;
        }
    }

    Ok(())
}
