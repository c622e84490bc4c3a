//! Catalog and content models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Catalog row as returned by `/content/v1/{catalog,tv,movies}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: u64,
    pub media_type: Option<String>,
    pub tmdb: Option<u64>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    /// Unix seconds
    pub entry_updated: Option<i64>,
    /// Unix seconds of the most recently added video
    pub newest_video: Option<i64>,
}

impl CatalogEntry {
    pub fn display_title(&self) -> &str {
        display_title(self.original_title.as_deref(), self.title.as_deref())
    }
}

/// Alphabetical index entry from `/content/v1/index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: u64,
    pub title: String,
    pub category: Option<String>,
}

/// `/content/v1/index`: first letter -> titles.
pub type LibraryIndex = BTreeMap<String, Vec<IndexEntry>>;

/// Body of `/content/v1/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl SearchResult {
    pub fn display_title(&self) -> &str {
        display_title(self.original_title.as_deref(), self.title.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtitle {
    pub id: u64,
    pub media_id: Option<u64>,
    pub video_id: Option<u64>,
    pub lang: Option<String>,
    pub label: Option<String>,
    pub hash_key: Option<String>,
}

/// Category accepted by the metadata request endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tv,
    Movie,
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tv" => Ok(Self::Tv),
            "movie" => Ok(Self::Movie),
            other => Err(format!("Unknown category: {}. Use: tv, movie", other)),
        }
    }
}

/// Body of `POST /content/v1/r`.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataRequest {
    pub media_id: u64,
    pub category: Category,
    pub title: String,
    pub year: Option<String>,
}

/// Background job handle returned by `POST /content/v1/r`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStarted {
    pub job_id: String,
    pub status: String,
}

/// `/status/v1/{job_id}`
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatus {
    pub status: String,
    pub error: Option<String>,
}

/// Title shown for an item: original title first, then title.
fn display_title<'a>(original: Option<&'a str>, title: Option<&'a str>) -> &'a str {
    original
        .filter(|s| !s.is_empty())
        .or(title.filter(|s| !s.is_empty()))
        .unwrap_or("Untitled")
}
