//! Admin-only endpoints: delete, metadata requests, jobs, rescan

use anyhow::{Context, Result};
use serde_json::json;

use super::client::{check_response, ApiClient, RequestOptions};
use super::get_json;
use crate::auth::TokenSource;
use crate::models::{JobStarted, JobStatus, MetadataRequest};

pub async fn delete_item<S: TokenSource>(client: &ApiClient<S>, media_id: u64) -> Result<()> {
    let resp = client
        .post_json("content/v1/d", &json!({ "media_id": media_id }))
        .await?;
    check_response(resp).await?;
    Ok(())
}

/// Ask the server to re-fetch metadata for an item. Runs as a server job.
pub async fn request_metadata<S: TokenSource>(
    client: &ApiClient<S>,
    request: &MetadataRequest,
) -> Result<JobStarted> {
    let resp = client.post_json("content/v1/r", request).await?;
    let resp = check_response(resp).await?;
    resp.json()
        .await
        .context("Failed to parse metadata request response")
}

pub async fn job_status<S: TokenSource>(client: &ApiClient<S>, job_id: &str) -> Result<JobStatus> {
    let encoded: String = url::form_urlencoded::byte_serialize(job_id.as_bytes()).collect();
    get_json(client, &format!("status/v1/{}", encoded)).await
}

/// Start a library rescan. The server rate-limits this to once per 10 minutes.
pub async fn rescan<S: TokenSource>(client: &ApiClient<S>) -> Result<()> {
    let resp = client.fetch("rescan", RequestOptions::post()).await?;
    check_response(resp).await?;
    Ok(())
}
