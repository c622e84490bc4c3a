//! Authenticated HTTP client for the media server API
//!
//! Wraps reqwest::Client: every request waits for the token session to be
//! ready and carries `Authorization: Bearer <token>`. Responses come back
//! unread and unchecked; callers interpret status codes themselves.

use std::sync::Arc;

use anyhow::{bail, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::auth::{AuthError, TokenSession, TokenSource};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("failed to encode request body: {0}")]
    Body(#[from] serde_json::Error),
}

/// Per-request options. Everything here is passed through untouched apart
/// from the injected Authorization header.
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self {
            method: Method::POST,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serialize `body` as JSON, setting `Content-Type` unless the caller did.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_vec(body)?);
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(self)
    }
}

/// Dispatcher for all server API calls.
pub struct ApiClient<S> {
    http: reqwest::Client,
    base: Url,
    session: Arc<TokenSession<S>>,
    refresh_on_dispatch: bool,
}

impl<S: TokenSource> ApiClient<S> {
    pub fn new(
        http: reqwest::Client,
        base: Url,
        session: Arc<TokenSession<S>>,
        refresh_on_dispatch: bool,
    ) -> Self {
        Self {
            http,
            base,
            session,
            refresh_on_dispatch,
        }
    }

    pub fn session(&self) -> &Arc<TokenSession<S>> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve an API path against the server URL. Leading slashes are
    /// ignored so the server may live under a path prefix; absolute URLs are
    /// used as given.
    pub fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    /// Issue an authenticated request and return the raw response.
    ///
    /// Suspends until the token session is ready. Non-2xx statuses are
    /// returned as ordinary responses; only transport and auth failures are
    /// errors. No retry and no timeout.
    pub async fn fetch(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<reqwest::Response, ApiError> {
        self.session.ready().await?;

        let token = if self.refresh_on_dispatch {
            self.session.ensure_fresh_token().await?
        } else {
            self.session.current_token().ok_or(AuthError::Missing)?
        };

        let url = self.resolve(path)?;
        let RequestOptions {
            method,
            mut headers,
            body,
        } = options;
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))?,
        );

        tracing::debug!("API {} {}", method, url);

        let mut req = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            req = req.body(body);
        }
        Ok(req.send().await?)
    }

    /// GET `path`.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response, ApiError> {
        self.fetch(path, RequestOptions::get()).await
    }

    /// POST `body` as JSON to `path`.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ApiError> {
        self.fetch(path, RequestOptions::post().json(body)?).await
    }
}

/// Check HTTP response status code and return a clear error on failure.
///
/// The server reports failures as `{"error": "..."}`; that message is used
/// when present.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    let url = resp.url().clone();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = server_error_message(&body);
    if status == reqwest::StatusCode::UNAUTHORIZED {
        // Admin-only endpoints also answer 401 to valid non-admin sessions.
        bail!(
            "401 Unauthorized for {}: {}. The action may need an admin login, \
             or the token was rejected -- run 'media-cli login' again.",
            url,
            message
        );
    }
    bail!("HTTP {} for {}: {}", status.as_u16(), url, message);
}

/// Extract the `error` field of a server error body, falling back to the
/// raw text.
fn server_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}
