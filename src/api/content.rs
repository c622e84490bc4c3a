//! Catalog, item, video and search endpoints (`/content/v1/...`)

use anyhow::{bail, Context, Result};
use serde_json::Value;

use super::client::{check_response, ApiClient};
use super::get_json;
use crate::auth::TokenSource;
use crate::models::{CatalogEntry, LibraryIndex, SearchResponse, SearchResult, Subtitle};

/// Catalog listing to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shelf {
    /// Recently updated items of every type
    New,
    Tv,
    Movies,
}

impl Shelf {
    fn path(self) -> &'static str {
        match self {
            Shelf::New => "content/v1/catalog",
            Shelf::Tv => "content/v1/tv",
            Shelf::Movies => "content/v1/movies",
        }
    }
}

/// Per-item sub-resources under `/content/v1/item/{id}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ItemPart {
    Genres,
    Ratings,
    Cast,
    Trailers,
    Networks,
    Seasons,
    Episodes,
    Videos,
}

impl ItemPart {
    fn segment(self) -> &'static str {
        match self {
            ItemPart::Genres => "genres",
            ItemPart::Ratings => "ratings",
            ItemPart::Cast => "cast",
            ItemPart::Trailers => "trailers",
            ItemPart::Networks => "networks",
            ItemPart::Seasons => "seasons",
            ItemPart::Episodes => "episodes",
            ItemPart::Videos => "videos",
        }
    }
}

pub async fn fetch_shelf<S: TokenSource>(
    client: &ApiClient<S>,
    shelf: Shelf,
) -> Result<Vec<CatalogEntry>> {
    get_json(client, shelf.path()).await
}

pub async fn fetch_index<S: TokenSource>(client: &ApiClient<S>) -> Result<LibraryIndex> {
    get_json(client, "content/v1/index").await
}

pub async fn fetch_item<S: TokenSource>(client: &ApiClient<S>, id: u64) -> Result<Value> {
    get_json(client, &format!("content/v1/item/{}", id)).await
}

pub async fn fetch_item_part<S: TokenSource>(
    client: &ApiClient<S>,
    id: u64,
    part: ItemPart,
) -> Result<Value> {
    get_json(client, &format!("content/v1/item/{}/{}", id, part.segment())).await
}

pub async fn fetch_video<S: TokenSource>(client: &ApiClient<S>, id: u64) -> Result<Value> {
    get_json(client, &format!("content/v1/video/{}", id)).await
}

pub async fn fetch_subtitles<S: TokenSource>(
    client: &ApiClient<S>,
    video_id: u64,
) -> Result<Vec<Subtitle>> {
    get_json(client, &format!("content/v1/video/{}/subtitles", video_id)).await
}

/// Search titles. Empty queries are rejected before any request is made.
pub async fn search<S: TokenSource>(
    client: &ApiClient<S>,
    query: &str,
) -> Result<Vec<SearchResult>> {
    let query = query.trim();
    if query.is_empty() {
        bail!("Search query is empty");
    }
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    let resp: SearchResponse =
        get_json(client, &format!("content/v1/search?query={}", encoded)).await?;
    Ok(resp.results)
}

/// Download a subtitle file by its hash key.
pub async fn download_subtitle<S: TokenSource>(
    client: &ApiClient<S>,
    hash_key: &str,
) -> Result<Vec<u8>> {
    let encoded: String = url::form_urlencoded::byte_serialize(hash_key.as_bytes()).collect();
    let resp = client.get(&format!("subs?s={}", encoded)).await?;
    let resp = check_response(resp).await?;
    let body = resp.bytes().await.context("Failed to read subtitle body")?;
    Ok(body.to_vec())
}

pub fn print_catalog(entries: &[CatalogEntry]) {
    if entries.is_empty() {
        println!("(empty)");
        return;
    }
    for entry in entries {
        let year = entry
            .release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .unwrap_or("----");
        println!(
            "{:>6}  {:<6} {}  {}",
            entry.id,
            entry.media_type.as_deref().unwrap_or("?"),
            year,
            entry.display_title()
        );
    }
}

pub fn print_index(index: &LibraryIndex) {
    for (letter, entries) in index {
        println!("{}", letter);
        for entry in entries {
            println!(
                "  {:>6}  {:<6} {}",
                entry.id,
                entry.category.as_deref().unwrap_or("?"),
                entry.title
            );
        }
    }
}

pub fn print_search(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for result in results {
        let genres = if result.genres.is_empty() {
            String::new()
        } else {
            format!("  [{}]", result.genres.join(", "))
        };
        println!("{:>6}  {}{}", result.id, result.display_title(), genres);
    }
}

pub fn print_subtitles(subtitles: &[Subtitle]) {
    for sub in subtitles {
        println!(
            "{:>6}  {:<6} {:<20} {}",
            sub.id,
            sub.lang.as_deref().unwrap_or("?"),
            sub.label.as_deref().unwrap_or(""),
            sub.hash_key.as_deref().unwrap_or("")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::testing::ready_client;

    #[tokio::test]
    async fn test_fetch_shelf() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/content/v1/tv")
            .match_header("authorization", "Bearer abc")
            .with_status(200)
            .with_body(
                r#"[{"id": 3, "media_type": "tv", "tmdb": 99, "title": "Show",
                     "original_title": "Show", "release_date": "2020-01-01",
                     "poster_path": "/p.jpg", "entry_updated": 1, "newest_video": 2}]"#,
            )
            .create_async()
            .await;

        let client = ready_client(&server, "abc").await;
        let entries = fetch_shelf(&client, Shelf::Tv).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tmdb, Some(99));
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/content/v1/search")
            .match_query(mockito::Matcher::UrlEncoded(
                "query".into(),
                "the office & co".into(),
            ))
            .with_status(200)
            .with_body(r#"{"results": [{"id": 8, "title": "The Office", "genres": ["Comedy"]}]}"#)
            .create_async()
            .await;

        let client = ready_client(&server, "abc").await;
        let results = search(&client, "  the office & co ").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].display_title(), "The Office");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_search_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = ready_client(&server, "abc").await;
        assert!(search(&client, "   ").await.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_item_not_found_surfaces_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/content/v1/item/5/ratings")
            .with_status(404)
            .with_body(r#"{"error": "item not found"}"#)
            .create_async()
            .await;

        let client = ready_client(&server, "abc").await;
        let err = fetch_item_part(&client, 5, ItemPart::Ratings)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("item not found"));
    }

    #[tokio::test]
    async fn test_download_subtitle() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/subs")
            .match_query(mockito::Matcher::UrlEncoded("s".into(), "h1".into()))
            .with_status(200)
            .with_body("WEBVTT\n")
            .create_async()
            .await;

        let client = ready_client(&server, "abc").await;
        let body = download_subtitle(&client, "h1").await.unwrap();
        assert_eq!(body, b"WEBVTT\n");
    }
}
