//! Single-flight access-token refresh.
//!
//! At most one refresh call runs at a time. Callers arriving while it is in
//! flight queue a waiter and suspend; when the refresh settles (success or
//! failure) the queue is drained exactly once and every waiter re-reads the
//! credential store. After a failed refresh the store is empty, so waiters
//! fail with [`NetdeskError::Unauthorized`] instead of replaying a stale token.

use crate::inspector::{REFRESH_THRESHOLD, is_expiring_soon};
use netdesk_types::{
    CredentialProvider, NetdeskError, RequestAttempt, TokenRefresher, traits::Result,
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, SystemTime},
};
use tokio::sync::oneshot;

/// How a refresh attempt ended, as seen by queued waiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Refreshed,
    Failed,
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<Settled>>,
}

/// Owns the refresh state machine (Idle ⇄ Refreshing) for one credential store.
pub struct RefreshCoordinator {
    credentials: Arc<dyn CredentialProvider>,
    refresher: Arc<dyn TokenRefresher>,
    threshold: Duration,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            credentials,
            refresher,
            threshold: REFRESH_THRESHOLD,
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// Override the proactive refresh window.
    #[must_use]
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a refresh call is currently running.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight
    }

    /// Return `current` unchanged unless it is about to expire, in which case
    /// refresh (or join the refresh already running) and return the new token.
    ///
    /// # Errors
    ///
    /// Returns [`NetdeskError::SessionExpired`] if this caller's refresh failed,
    /// or [`NetdeskError::Unauthorized`] if it waited on a refresh that failed.
    pub async fn ensure_fresh(&self, current: &str) -> Result<String> {
        if !is_expiring_soon(current, SystemTime::now(), self.threshold) {
            return Ok(current.to_string());
        }
        tracing::debug!("access token expiring soon; refreshing proactively");
        self.refresh().await
    }

    /// Obtain a token to replay `attempt` with after the server answered 401.
    ///
    /// Flips the attempt's one-shot auth marker; a second call for the same
    /// attempt is refused with [`NetdeskError::SessionExpired`]. If another
    /// request already rotated the token since this one was sent, the stored
    /// token is returned without a new refresh call.
    ///
    /// # Errors
    ///
    /// Returns [`NetdeskError::SessionExpired`] when recovery was already used
    /// or the refresh failed, [`NetdeskError::Unauthorized`] when no
    /// credentials remain.
    pub async fn recover_from_unauthorized(&self, attempt: &mut RequestAttempt) -> Result<String> {
        if !attempt.mark_auth_retried() {
            return Err(NetdeskError::SessionExpired);
        }
        if !self.is_refreshing()
            && let Some(stored) = self.credentials.get().await?
            && attempt.request.bearer_token() != Some(stored.access_token.as_str())
        {
            tracing::debug!("token already rotated by a concurrent request; replaying");
            return Ok(stored.access_token);
        }
        self.refresh().await
    }

    /// Refresh now, or wait for the refresh already in flight.
    ///
    /// # Errors
    ///
    /// See [`RefreshCoordinator::ensure_fresh`].
    pub async fn refresh(&self) -> Result<String> {
        let waiter = {
            let mut state = self.lock();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Some(rx)
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = waiter {
            tracing::debug!("refresh already in flight; waiting");
            // A dropped sender only happens if the guard was torn down; treat as failed.
            let settled = rx.await.unwrap_or(Settled::Failed);
            return self.resume_waiter(settled).await;
        }

        let mut guard = InFlight {
            coordinator: self,
            settled: false,
        };
        let result = self.run_refresh().await;
        guard.settle(if result.is_ok() {
            Settled::Refreshed
        } else {
            Settled::Failed
        });
        result
    }

    /// A waiter re-checks the store rather than trusting the settle signal.
    async fn resume_waiter(&self, settled: Settled) -> Result<String> {
        match self.credentials.get().await? {
            Some(tokens) => Ok(tokens.access_token),
            None => {
                tracing::debug!(?settled, "no credentials after refresh settled");
                Err(NetdeskError::Unauthorized(
                    "session ended while waiting for token refresh".into(),
                ))
            }
        }
    }

    async fn run_refresh(&self) -> Result<String> {
        let current = self
            .credentials
            .get()
            .await?
            .ok_or_else(|| NetdeskError::Unauthorized("no stored credentials".into()))?;

        let Some(refresh_token) = current.refresh_token else {
            tracing::warn!("no refresh token stored; ending session");
            self.credentials.clear().await?;
            return Err(NetdeskError::SessionExpired);
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(tokens) => {
                let tokens = tokens.or_refresh_from(&refresh_token);
                self.credentials.set(&tokens).await?;
                tracing::info!("access token refreshed");
                Ok(tokens.access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed; clearing credentials");
                self.credentials.clear().await?;
                Err(NetdeskError::SessionExpired)
            }
        }
    }

    fn release(&self, settled: Settled) {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        tracing::debug!(waiters = waiters.len(), ?settled, "refresh settled");
        for waiter in waiters {
            let _ = waiter.send(settled);
        }
    }
}

/// Marks the coordinator idle and drains the queue exactly once, even if the
/// initiating future is dropped mid-refresh.
struct InFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(&mut self, settled: Settled) {
        if !self.settled {
            self.settled = true;
            self.coordinator.release(settled);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.settle(Settled::Failed);
    }
}
