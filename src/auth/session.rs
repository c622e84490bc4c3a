//! Token session: the single owner of the bearer token for one client run.
//!
//! Holds the current token and its expiry, refreshes it when stale, and
//! exposes a one-shot readiness signal that settles after the first fetch.
//! Callers share it through an `Arc` instead of process-wide globals.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::source::TokenSource;
use super::tokens::Token;
use super::AuthError;

/// State of the readiness signal. Leaves `Pending` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    Failed(String),
}

pub struct TokenSession<S> {
    source: S,
    margin: Duration,
    slot: RwLock<Option<Token>>,
    ready_tx: watch::Sender<Readiness>,
    refreshes_in_flight: AtomicUsize,
}

impl<S: TokenSource> TokenSession<S> {
    #[cfg(test)]
    pub fn new(source: S) -> Self {
        Self::with_margin(source, super::tokens::DEFAULT_EXPIRY_MARGIN)
    }

    pub fn with_margin(source: S, margin: Duration) -> Self {
        let (ready_tx, _) = watch::channel(Readiness::Pending);
        Self {
            source,
            margin,
            slot: RwLock::new(None),
            ready_tx,
            refreshes_in_flight: AtomicUsize::new(0),
        }
    }

    /// Create a session and kick off the initial token fetch in the background.
    pub fn start(source: S, margin: Duration) -> Arc<Self> {
        let session = Arc::new(Self::with_margin(source, margin));
        let init = Arc::clone(&session);
        tokio::spawn(async move {
            if let Err(e) = init.initialize().await {
                tracing::error!("Initial token fetch failed: {}", e);
            }
        });
        session
    }

    /// Perform the first fetch and settle the readiness signal with its outcome.
    pub async fn initialize(&self) -> Result<String, AuthError> {
        let result = self.refresh().await;
        let outcome = match &result {
            Ok(_) => Readiness::Ready,
            Err(e) => Readiness::Failed(e.to_string()),
        };
        self.ready_tx.send_if_modified(|state| {
            if *state == Readiness::Pending {
                *state = outcome;
                true
            } else {
                false
            }
        });
        result
    }

    /// Wait until the initial fetch has settled.
    ///
    /// Returns immediately once settled. A failed initial fetch is reported to
    /// every waiter as [`AuthError::NotReady`].
    pub async fn ready(&self) -> Result<(), AuthError> {
        let mut rx = self.ready_tx.subscribe();
        let state = rx
            .wait_for(|state| *state != Readiness::Pending)
            .await
            .map_err(|_| AuthError::NotReady("token session closed".to_string()))?;
        match &*state {
            Readiness::Failed(reason) => Err(AuthError::NotReady(reason.clone())),
            _ => Ok(()),
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.ready_tx.borrow().clone()
    }

    /// Return a valid token, fetching a new one if none is held or it is stale.
    pub async fn ensure_fresh_token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.current() {
            if !token.is_stale(Instant::now()) {
                return Ok(token.value);
            }
            tracing::debug!("Token stale, refreshing");
        }
        self.refresh().await
    }

    /// Token value as last stored, without checking its expiry.
    pub fn current_token(&self) -> Option<String> {
        self.current().map(|t| t.value)
    }

    /// Snapshot of the stored token.
    pub fn current(&self) -> Option<Token> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Unconditionally fetch a new token and replace the stored one.
    ///
    /// Concurrent refreshes are not coalesced: a keep-alive tick racing an
    /// on-demand check issues two fetches and the later one wins the slot.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let _guard = InFlight::enter(&self.refreshes_in_flight);

        let grant = self.source.fetch().await?;
        let token = Token::from_grant(grant, Instant::now(), self.margin)?;
        tracing::debug!("Token refreshed, valid for {:?}", token.remaining(Instant::now()));

        let value = token.value.clone();
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
        Ok(value)
    }
}

/// Counts in-flight refreshes and warns when two overlap.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let already = counter.fetch_add(1, Ordering::SeqCst);
        if already > 0 {
            tracing::warn!(
                "Overlapping token refresh ({} already in flight)",
                already
            );
        }
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{grant, FakeSource};
    use super::*;
    use crate::auth::tokens::DEFAULT_EXPIRY_MARGIN;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_token_reused_until_margin() {
        let source = FakeSource::granting("abc", 60);
        let session = TokenSession::new(source.clone());

        assert_eq!(session.ensure_fresh_token().await.unwrap(), "abc");
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_secs(54)).await;
        assert_eq!(session.ensure_fresh_token().await.unwrap(), "abc");
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        session.ensure_fresh_token().await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_replaces_stored_token() {
        let source = FakeSource::granting("second", 60).then(Ok(grant("first", 60)));
        let session = TokenSession::new(source.clone());

        assert_eq!(session.ensure_fresh_token().await.unwrap(), "first");
        assert_eq!(session.current_token().as_deref(), Some("first"));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(session.ensure_fresh_token().await.unwrap(), "second");
        assert_eq!(session.current_token().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_readiness_settles_ready() {
        let session = TokenSession::new(FakeSource::granting("abc", 60));
        assert_eq!(session.readiness(), Readiness::Pending);

        session.initialize().await.unwrap();
        assert_eq!(session.readiness(), Readiness::Ready);
        session.ready().await.unwrap();
        // Already settled: a second wait returns immediately.
        session.ready().await.unwrap();
    }

    #[tokio::test]
    async fn test_waiters_suspend_until_initial_fetch() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let source = FakeSource::granting("abc", 60).gated(Arc::clone(&gate));
        let session = Arc::new(TokenSession::new(source));

        let mut waiter = tokio_test::task::spawn({
            let session = Arc::clone(&session);
            async move { session.ready().await }
        });
        tokio_test::assert_pending!(waiter.poll());

        let init = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.initialize().await }
        });
        tokio::task::yield_now().await;
        tokio_test::assert_pending!(waiter.poll());

        gate.notify_one();
        init.await.unwrap().unwrap();
        assert!(waiter.is_woken());
        tokio_test::assert_ready_ok!(waiter.poll());
    }

    #[tokio::test]
    async fn test_failed_initial_fetch_fails_waiters() {
        let source = FakeSource::default().then(Err(AuthError::Status {
            status: 401,
            body: "not_logged_in".to_string(),
        }));
        let session = TokenSession::new(source);

        assert!(session.initialize().await.is_err());
        assert!(matches!(session.readiness(), Readiness::Failed(_)));

        let err = session.ready().await.unwrap_err();
        match err {
            AuthError::NotReady(reason) => assert!(reason.contains("401")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_readiness_settles_only_once() {
        let source = FakeSource::granting("abc", 60).then(Err(AuthError::Missing));
        let session = TokenSession::new(source);

        assert!(session.initialize().await.is_err());
        session.initialize().await.unwrap();
        assert!(matches!(session.readiness(), Readiness::Failed(_)));
    }

    #[tokio::test]
    async fn test_hung_initial_fetch_keeps_waiters_pending() {
        let session = Arc::new(TokenSession::new(FakeSource::hanging()));
        let _init = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.initialize().await }
        });
        tokio::task::yield_now().await;

        let mut waiter = tokio_test::task::spawn({
            let session = Arc::clone(&session);
            async move { session.ready().await }
        });
        tokio_test::assert_pending!(waiter.poll());
        tokio::task::yield_now().await;
        tokio_test::assert_pending!(waiter.poll());
        assert_eq!(session.readiness(), Readiness::Pending);
    }

    #[tokio::test]
    async fn test_start_spawns_initial_fetch() {
        let source = FakeSource::granting("abc", 60);
        let session = TokenSession::start(source.clone(), DEFAULT_EXPIRY_MARGIN);

        session.ready().await.unwrap();
        assert_eq!(source.calls(), 1);
        assert_eq!(session.current_token().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_settles_failed() {
        let source = FakeSource::granting("abc", u64::MAX);
        let session = TokenSession::start(source.clone(), DEFAULT_EXPIRY_MARGIN);

        let waited = tokio::time::timeout(Duration::from_secs(2), session.ready())
            .await
            .expect("readiness never settled");
        assert!(matches!(waited, Err(AuthError::NotReady(_))), "got {waited:?}");
        assert!(matches!(session.readiness(), Readiness::Failed(_)));
        assert!(session.current_token().is_none());
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_both_fetch() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let source = FakeSource::granting("abc", 60).gated(Arc::clone(&gate));
        let session = Arc::new(TokenSession::new(source.clone()));

        let a = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.ensure_fresh_token().await }
        });
        let b = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.ensure_fresh_token().await }
        });
        while source.calls() < 2 {
            tokio::task::yield_now().await;
        }
        gate.notify_waiters();

        assert_eq!(a.await.unwrap().unwrap(), "abc");
        assert_eq!(b.await.unwrap().unwrap(), "abc");
        assert_eq!(source.calls(), 2);
    }
}
