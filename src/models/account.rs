//! Account, library and playback models

use serde::{Deserialize, Serialize};

use super::bool_or_int;

/// `/accounts/v1/me`
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub profile: Option<String>,
    pub profile_picture: Option<String>,
}

/// `/accounts/v1/p?v={video_id}`: where to resume a video.
#[derive(Debug, Clone, Deserialize)]
pub struct Playback {
    #[serde(default, deserialize_with = "bool_or_int")]
    pub watched: bool,
    #[serde(default)]
    pub video_start_time: u64,
}

/// Body of `POST /accounts/v1/w`.
#[derive(Debug, Clone, Serialize)]
pub struct WatchReport {
    pub media_id: u64,
    pub video_id: u64,
    #[serde(rename = "pausedAt")]
    pub paused_at: u64,
    #[serde(rename = "videoDuration")]
    pub video_duration: u64,
    #[serde(rename = "secondsPlayed")]
    pub seconds_played: u64,
}

/// `GET /accounts/v1/l?id={media_id}`: the user's state for one item.
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryState {
    #[serde(default)]
    pub rated: i64,
    #[serde(default, deserialize_with = "bool_or_int")]
    pub watchlisted: bool,
    #[serde(default)]
    pub videos: Vec<VideoProgress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoProgress {
    pub video_id: u64,
    #[serde(default, deserialize_with = "bool_or_int")]
    pub watched: bool,
    #[serde(default)]
    pub paused_at: Option<u64>,
}

/// Body of `POST /accounts/v1/l`. The server expects `watchlisted` as 0/1.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryUpdate {
    pub media_id: u64,
    pub watchlisted: u8,
}

impl LibraryUpdate {
    pub fn watchlist(media_id: u64, on: bool) -> Self {
        Self {
            media_id,
            watchlisted: u8::from(on),
        }
    }
}

/// `/accounts/v1/l/a`: the raw user feed. Entries stay as JSON so they can
/// be merged with the item and video payloads they point at.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub library: Vec<serde_json::Value>,
    #[serde(default)]
    pub videos: Vec<serde_json::Value>,
}
