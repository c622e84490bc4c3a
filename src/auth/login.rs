//! Cookie session login
//!
//! The token endpoint only answers a logged-in browser session, so the client
//! posts the login key first and keeps the session cookie in its jar.

use url::Url;

use super::AuthError;

const LOGIN_PATH: &str = "login";

/// Build the HTTP client used for the whole run (cookie store enabled).
pub fn build_http_client() -> Result<reqwest::Client, AuthError> {
    Ok(reqwest::Client::builder()
        .cookie_store(true)
        .user_agent(concat!("media-cli/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Log in with `key`. On success the session cookie is stored in `http`.
pub async fn login(http: &reqwest::Client, base: &Url, key: &str) -> Result<(), AuthError> {
    let url = base.join(LOGIN_PATH)?;
    tracing::debug!("Login POST {}", url);

    let resp = http
        .post(url.clone())
        .form(&[("login_key", key)])
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::Status {
            status: status.as_u16(),
            body,
        });
    }

    // A good key redirects away from the login page; a bad one re-renders it.
    if resp.url().path() == url.path() {
        return Err(AuthError::LoginRejected);
    }

    tracing::info!("Logged in to {}", base);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(server: &mockito::ServerGuard) -> Url {
        Url::parse(&format!("{}/", server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_login_follows_redirect_home() {
        let mut server = mockito::Server::new_async().await;
        let login_mock = server
            .mock("POST", "/login")
            .match_body(mockito::Matcher::UrlEncoded(
                "login_key".into(),
                "secret".into(),
            ))
            .with_status(302)
            .with_header("location", "/")
            .with_header("set-cookie", "session=s1; Path=/")
            .create_async()
            .await;
        let home_mock = server
            .mock("GET", "/")
            .match_header("cookie", "session=s1")
            .with_status(200)
            .with_body("<html></html>")
            .create_async()
            .await;

        let http = build_http_client().unwrap();
        login(&http, &base(&server), "secret").await.unwrap();

        login_mock.assert_async().await;
        home_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bad_key_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", "/login")
            .with_status(200)
            .with_body("Invalid key")
            .create_async()
            .await;

        let http = build_http_client().unwrap();
        let err = login(&http, &base(&server), "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::LoginRejected), "got {err:?}");
    }

    #[tokio::test]
    async fn test_rate_limited_login_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", "/login")
            .with_status(429)
            .create_async()
            .await;

        let http = build_http_client().unwrap();
        let err = login(&http, &base(&server), "secret").await.unwrap_err();
        assert!(matches!(err, AuthError::Status { status: 429, .. }), "got {err:?}");
    }
}
