//! Authentication for the media server
//!
//! Logs in with the configured key to obtain a cookie session, then keeps a
//! short-lived bearer token fresh for the API calls.

mod account;
pub mod keepalive;
pub mod login;
pub mod session;
pub mod source;
pub mod tokens;

use thiserror::Error;

pub use account::{login as save_login, logout, status};
pub use keepalive::KeepAlive;
pub use login::{build_http_client, login};
pub use session::{Readiness, TokenSession};
pub use source::{HttpTokenSource, TokenSource};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("token endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed token response: {0}")]
    Malformed(String),

    #[error("token session not ready: {0}")]
    NotReady(String),

    #[error("no token available")]
    Missing,

    #[error("login key rejected by server")]
    LoginRejected,
}
