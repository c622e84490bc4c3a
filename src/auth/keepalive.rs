//! Periodic token keep-alive
//!
//! Re-runs the staleness check on a fixed period so the token stays fresh
//! while no requests are being made.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::session::TokenSession;
use super::source::TokenSource;

pub const DEFAULT_KEEPALIVE_PERIOD: Duration = Duration::from_secs(30);

/// Handle to a running keep-alive task. Dropping it aborts the task.
pub struct KeepAlive {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl KeepAlive {
    pub fn spawn<S: TokenSource>(session: Arc<TokenSession<S>>, period: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // skip first immediate tick

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = session.ensure_fresh_token().await {
                            tracing::warn!("Keep-alive token refresh failed: {}", e);
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Keep-alive stopped");
                        break;
                    }
                }
            }
        });

        tracing::debug!("Keep-alive started (period: {:?})", period);

        Self {
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    /// Stop the task and wait for it to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
