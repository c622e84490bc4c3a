//! Bearer token and its expiry bookkeeping

use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;

use super::AuthError;

/// Default safety margin subtracted from the server-reported lifetime.
pub const DEFAULT_EXPIRY_MARGIN: Duration = Duration::from_secs(5);

/// Body of `GET /auth/v1/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// In-memory bearer token. Replaced on refresh, never mutated.
#[derive(Debug, Clone)]
pub struct Token {
    pub value: String,
    pub expires_at: Instant,
}

impl Token {
    /// Build a token from a grant received at `now`.
    ///
    /// The expiry is `now + expires_in - margin`, clamped so it never lands
    /// before `now`. A lifetime too large to represent is rejected.
    pub fn from_grant(
        grant: TokenGrant,
        now: Instant,
        margin: Duration,
    ) -> Result<Self, AuthError> {
        let lifetime = Duration::from_secs(grant.expires_in).saturating_sub(margin);
        let expires_at = now.checked_add(lifetime).ok_or_else(|| {
            AuthError::Malformed(format!("expires_in out of range: {}", grant.expires_in))
        })?;
        Ok(Self {
            value: grant.access_token,
            expires_at,
        })
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Time left before the token goes stale.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}
