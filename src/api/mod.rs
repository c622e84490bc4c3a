//! API client module for the media server

mod accounts;
mod admin;
pub mod client;
mod content;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::auth::{self, HttpTokenSource, KeepAlive, TokenSession, TokenSource};
use crate::config::Config;
use crate::models::{Category, MetadataRequest, WatchReport};
use client::{check_response, ApiClient};

pub use content::{ItemPart, Shelf};

/// A logged-in client plus the keep-alive task that keeps its token fresh.
/// Dropping it stops the keep-alive.
pub struct Connection {
    pub client: ApiClient<HttpTokenSource>,
    _keepalive: KeepAlive,
}

/// Log in with the stored key and start a token session.
pub async fn connect(server: Option<&str>) -> Result<Connection> {
    let config = Config::load()?;
    let base = config.server(server)?;
    let key = config
        .login_key
        .as_deref()
        .context("No login key stored. Run 'media-cli login' first.")?;

    let http = auth::build_http_client()?;
    auth::login(&http, &base, key)
        .await
        .with_context(|| format!("Login to {} failed", base))?;

    let settings = &config.session;
    let source = HttpTokenSource::new(http.clone(), &base)?;
    let session = TokenSession::start(source, settings.expiry_margin());
    let keepalive = KeepAlive::spawn(session.clone(), settings.keepalive_period());

    Ok(Connection {
        client: ApiClient::new(http, base, session, settings.refresh_on_dispatch),
        _keepalive: keepalive,
    })
}

/// GET `path`, require a 2xx status and decode the JSON body.
pub(crate) async fn get_json<S: TokenSource, T: DeserializeOwned>(
    client: &ApiClient<S>,
    path: &str,
) -> Result<T> {
    let resp = client.get(path).await?;
    let resp = check_response(resp).await?;
    resp.json()
        .await
        .with_context(|| format!("Failed to parse response from {}", path))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Show the token session state (verifies login and token issuance work)
pub async fn token_status(server: Option<&str>) -> Result<()> {
    let conn = connect(server).await?;
    let session = conn.client.session();
    session.ready().await?;

    let token = session.current().context("No token held")?;
    let remaining = token.remaining(tokio::time::Instant::now());
    println!("Server:     {}", conn.client.base_url());
    println!("Readiness:  {:?}", session.readiness());
    println!("Token:      {}…", token.value.chars().take(16).collect::<String>());
    println!("Refresh in: {}s", remaining.as_secs());
    Ok(())
}

/// List a catalog shelf
pub async fn list_shelf(server: Option<&str>, shelf: Shelf) -> Result<()> {
    let conn = connect(server).await?;
    let entries = content::fetch_shelf(&conn.client, shelf).await?;
    content::print_catalog(&entries);
    Ok(())
}

/// Show the alphabetical library index
pub async fn show_index(server: Option<&str>) -> Result<()> {
    let conn = connect(server).await?;
    let index = content::fetch_index(&conn.client).await?;
    content::print_index(&index);
    Ok(())
}

/// Show an item, or one of its sub-resources
pub async fn show_item(server: Option<&str>, id: u64, part: Option<ItemPart>) -> Result<()> {
    let conn = connect(server).await?;
    let value = match part {
        Some(part) => content::fetch_item_part(&conn.client, id, part).await?,
        None => content::fetch_item(&conn.client, id).await?,
    };
    print_json(&value)
}

/// Show a video's details
pub async fn show_video(server: Option<&str>, id: u64) -> Result<()> {
    let conn = connect(server).await?;
    let value = content::fetch_video(&conn.client, id).await?;
    print_json(&value)
}

/// List a video's subtitles
pub async fn subtitles(server: Option<&str>, video_id: u64) -> Result<()> {
    let conn = connect(server).await?;
    let subs = content::fetch_subtitles(&conn.client, video_id).await?;
    content::print_subtitles(&subs);
    Ok(())
}

/// Download a subtitle file by hash key
pub async fn download_subtitle(server: Option<&str>, hash_key: &str, out: &Path) -> Result<()> {
    let conn = connect(server).await?;
    let body = content::download_subtitle(&conn.client, hash_key).await?;
    tokio::fs::write(out, &body)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;
    println!("Saved {} bytes to {}", body.len(), out.display());
    Ok(())
}

/// Search titles
pub async fn search(server: Option<&str>, query: &str) -> Result<()> {
    let conn = connect(server).await?;
    let results = content::search(&conn.client, query).await?;
    content::print_search(&results);
    Ok(())
}

/// Show the current profile
pub async fn whoami(server: Option<&str>) -> Result<()> {
    let conn = connect(server).await?;
    let profile = accounts::fetch_profile(&conn.client).await?;
    accounts::print_profile(&profile);
    Ok(())
}

/// Show the user feed (continue watching + watchlist)
pub async fn feed(server: Option<&str>) -> Result<()> {
    let conn = connect(server).await?;
    let feed = accounts::fetch_feed(&conn.client).await?;
    accounts::print_feed(&feed);
    Ok(())
}

/// Show resume position for a video
pub async fn progress(server: Option<&str>, video_id: u64) -> Result<()> {
    let conn = connect(server).await?;
    let playback = accounts::fetch_playback(&conn.client, video_id).await?;
    println!(
        "Video {}: {} (resume at {}s)",
        video_id,
        if playback.watched { "watched" } else { "in progress" },
        playback.video_start_time
    );
    Ok(())
}

/// Report watch time for a video
pub async fn report(server: Option<&str>, report: WatchReport) -> Result<()> {
    let conn = connect(server).await?;
    accounts::report_watch(&conn.client, &report).await?;
    println!(
        "Reported {}s played, paused at {}s",
        report.seconds_played, report.paused_at
    );
    Ok(())
}

/// Show or change an item's watchlist state
pub async fn watchlist(server: Option<&str>, media_id: u64, set: Option<bool>) -> Result<()> {
    let conn = connect(server).await?;
    if let Some(on) = set {
        accounts::set_watchlisted(&conn.client, media_id, on).await?;
    }
    let state = accounts::fetch_library_state(&conn.client, media_id).await?;
    println!(
        "Item {}: {}",
        media_id,
        if state.watchlisted {
            "on watchlist"
        } else {
            "not on watchlist"
        }
    );
    if state.rated != 0 {
        println!("  rated {}", state.rated);
    }
    for video in &state.videos {
        println!(
            "  video {:>6}  {}  paused at {}s",
            video.video_id,
            if video.watched { "watched" } else { "       " },
            video.paused_at.unwrap_or(0)
        );
    }
    Ok(())
}

/// Delete an item (admin)
pub async fn delete(server: Option<&str>, media_id: u64) -> Result<()> {
    let conn = connect(server).await?;
    admin::delete_item(&conn.client, media_id).await?;
    println!("Item {} deleted", media_id);
    Ok(())
}

/// Request a metadata refresh for an item (admin)
pub async fn request_metadata(
    server: Option<&str>,
    media_id: u64,
    category: Category,
    title: String,
    year: Option<String>,
) -> Result<()> {
    let conn = connect(server).await?;
    let job = admin::request_metadata(
        &conn.client,
        &MetadataRequest {
            media_id,
            category,
            title,
            year,
        },
    )
    .await?;
    println!("Job {} {}", job.job_id, job.status);
    Ok(())
}

/// Show a background job's status
pub async fn job(server: Option<&str>, job_id: &str) -> Result<()> {
    let conn = connect(server).await?;
    let status = admin::job_status(&conn.client, job_id).await?;
    match status.error {
        Some(err) => println!("Job {}: {} ({})", job_id, status.status, err),
        None => println!("Job {}: {}", job_id, status.status),
    }
    Ok(())
}

/// Trigger a library rescan (admin)
pub async fn rescan(server: Option<&str>) -> Result<()> {
    let conn = connect(server).await?;
    admin::rescan(&conn.client).await?;
    println!("Rescan started");
    Ok(())
}
