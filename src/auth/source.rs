//! Where fresh tokens come from

use std::future::Future;

use url::Url;

use super::tokens::TokenGrant;
use super::AuthError;

const TOKEN_PATH: &str = "auth/v1/token";

/// Fetches a fresh token grant.
pub trait TokenSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<TokenGrant, AuthError>> + Send;
}

/// Token source backed by the server's `GET /auth/v1/token` endpoint.
///
/// The endpoint only issues tokens to a logged-in cookie session, so `http`
/// must be the same client [`super::login`] was called with.
#[derive(Clone)]
pub struct HttpTokenSource {
    http: reqwest::Client,
    url: Url,
}

impl HttpTokenSource {
    pub fn new(http: reqwest::Client, base: &Url) -> Result<Self, AuthError> {
        Ok(Self {
            http,
            url: base.join(TOKEN_PATH)?,
        })
    }
}

impl TokenSource for HttpTokenSource {
    async fn fetch(&self) -> Result<TokenGrant, AuthError> {
        tracing::debug!("Token GET {}", self.url);

        let resp = self.http.get(self.url.clone()).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| AuthError::Malformed(e.to_string()))
    }
}
