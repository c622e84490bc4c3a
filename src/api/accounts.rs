//! Account endpoints (`/accounts/v1/...`): profile, watch progress, library

use std::cmp::Reverse;

use anyhow::Result;
use futures::future::try_join_all;
use serde_json::Value;

use super::client::{check_response, ApiClient};
use super::content::{fetch_item, fetch_video};
use super::get_json;
use crate::auth::TokenSource;
use crate::models::{FeedResponse, LibraryState, LibraryUpdate, Playback, Profile, WatchReport};

/// Assembled user feed: watchlisted items and continue-watching videos.
#[derive(Debug, Default)]
pub struct Feed {
    /// Watchlisted items, most recently updated first
    pub library: Vec<Value>,
    /// Playback entries merged with their video details, most recent first
    pub continue_watching: Vec<Value>,
}

pub async fn fetch_profile<S: TokenSource>(client: &ApiClient<S>) -> Result<Profile> {
    get_json(client, "accounts/v1/me").await
}

pub async fn fetch_playback<S: TokenSource>(
    client: &ApiClient<S>,
    video_id: u64,
) -> Result<Playback> {
    get_json(client, &format!("accounts/v1/p?v={}", video_id)).await
}

pub async fn report_watch<S: TokenSource>(
    client: &ApiClient<S>,
    report: &WatchReport,
) -> Result<()> {
    let resp = client.post_json("accounts/v1/w", report).await?;
    check_response(resp).await?;
    Ok(())
}

pub async fn fetch_library_state<S: TokenSource>(
    client: &ApiClient<S>,
    media_id: u64,
) -> Result<LibraryState> {
    get_json(client, &format!("accounts/v1/l?id={}", media_id)).await
}

pub async fn set_watchlisted<S: TokenSource>(
    client: &ApiClient<S>,
    media_id: u64,
    on: bool,
) -> Result<()> {
    let resp = client
        .post_json("accounts/v1/l", &LibraryUpdate::watchlist(media_id, on))
        .await?;
    check_response(resp).await?;
    Ok(())
}

/// Load the user feed and resolve every entry against its item or video.
///
/// Items and videos are fetched concurrently; one failed lookup fails the
/// whole feed.
pub async fn fetch_feed<S: TokenSource>(client: &ApiClient<S>) -> Result<Feed> {
    let raw: FeedResponse = get_json(client, "accounts/v1/l/a").await?;

    let items = try_join_all(raw.library.iter().filter_map(|entry| {
        let id = entry_id(entry, "media_id")?;
        Some(async move {
            let item = fetch_item(client, id).await?;
            Ok::<_, anyhow::Error>(merge(entry.clone(), item))
        })
    }))
    .await?;

    let videos = try_join_all(raw.videos.iter().filter_map(|entry| {
        let id = entry_id(entry, "video_id")?;
        Some(async move {
            let video = fetch_video(client, id).await?;
            Ok::<_, anyhow::Error>(merge(entry.clone(), video))
        })
    }))
    .await?;

    Ok(Feed {
        library: sorted_by_recency(items, &["new_video_inserted", "entry_updated"]),
        continue_watching: sorted_by_recency(videos, &["entry_updated"]),
    })
}

/// Numeric id under `key`. Entries without one are skipped with a warning.
fn entry_id(entry: &Value, key: &str) -> Option<u64> {
    let id = entry.get(key).and_then(Value::as_u64);
    if id.is_none() {
        tracing::warn!("Skipping feed entry without a numeric {}: {}", key, entry);
    }
    id
}

/// Shallow-merge two JSON objects; keys in `overlay` win.
fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            base.extend(overlay);
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Sort newest first by the first timestamp key present. Entries with no
/// readable timestamp go last.
fn sorted_by_recency(mut entries: Vec<Value>, keys: &[&str]) -> Vec<Value> {
    entries.sort_by_key(|entry| {
        Reverse(
            keys.iter()
                .find_map(|k| entry.get(*k).and_then(timestamp))
                .unwrap_or(i64::MIN),
        )
    });
    entries
}

/// Unix seconds from an integer or an RFC 3339 / RFC 2822 string.
fn timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .or_else(|_| chrono::DateTime::parse_from_rfc2822(s))
            .ok()
            .map(|dt| dt.timestamp()),
        _ => None,
    }
}

/// Render unix seconds as a UTC date-time.
pub fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| secs.to_string())
}

pub fn print_profile(profile: &Profile) {
    println!();
    println!(
        "Profile: {}",
        profile.profile.as_deref().unwrap_or("(none)")
    );
    println!(
        "Picture: {}",
        profile.profile_picture.as_deref().unwrap_or("(none)")
    );
}

pub fn print_feed(feed: &Feed) {
    println!("Continue watching:");
    if feed.continue_watching.is_empty() {
        println!("  (nothing)");
    }
    for entry in &feed.continue_watching {
        let name = entry.get("name").and_then(Value::as_str).unwrap_or("?");
        let episode = match (
            entry.get("season_number").and_then(Value::as_u64),
            entry.get("episode_number").and_then(Value::as_u64),
        ) {
            (Some(s), Some(e)) => format!(" S{:02}E{:02}", s, e),
            _ => String::new(),
        };
        let paused = entry.get("paused_at").and_then(Value::as_u64).unwrap_or(0);
        let duration = entry.get("duration").and_then(Value::as_u64).unwrap_or(0);
        let updated = entry
            .get("entry_updated")
            .and_then(Value::as_i64)
            .map(format_timestamp)
            .unwrap_or_default();
        println!(
            "  {:>6}  {}{}  {}/{}s  {}",
            entry.get("video_id").and_then(Value::as_u64).unwrap_or(0),
            name,
            episode,
            paused,
            duration,
            updated
        );
    }

    println!();
    println!("Watchlist:");
    if feed.library.is_empty() {
        println!("  (nothing)");
    }
    for item in &feed.library {
        let title = item
            .get("original_title")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| item.get("title").and_then(Value::as_str))
            .unwrap_or("Untitled");
        println!(
            "  {:>6}  {}",
            item.get("id").and_then(Value::as_u64).unwrap_or(0),
            title
        );
    }
}
