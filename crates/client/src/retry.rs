//! Retry classification and linear backoff.
//!
//! Stateless apart from its settings: the attempt counter lives on the
//! [`RequestAttempt`], so every pass through the response handler sees the
//! cumulative count.

use netdesk_config::RetryConfig;
use netdesk_types::{ApiRequest, NetdeskError, RequestAttempt};
use std::time::Duration;

/// Default replay budget after the first attempt.
pub const MAX_RETRIES: u32 = 3;

/// Decides whether a failed request is replayed and how long to wait first.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    polling_paths: Vec<String>,
    retry_non_idempotent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay(),
            polling_paths: config.polling_paths.clone(),
            retry_non_idempotent: config.retry_non_idempotent,
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub fn with_polling_paths(mut self, paths: Vec<String>) -> Self {
        self.polling_paths = paths;
        self
    }

    /// Only replay idempotent methods when `false`.
    #[must_use]
    pub fn with_retry_non_idempotent(mut self, enabled: bool) -> Self {
        self.retry_non_idempotent = enabled;
        self
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// `true` if `request` targets a polling-style endpoint.
    #[must_use]
    pub fn is_polling(&self, request: &ApiRequest) -> bool {
        request.polling
            || self
                .polling_paths
                .iter()
                .any(|p| !p.is_empty() && request.route().contains(p.as_str()))
    }

    /// Transient statuses (408, 429, 5xx gateway family) and network failures
    /// are retryable, except a 429 from a polling endpoint: the server's
    /// cooldown must be honored by the caller, not by blind replay.
    #[must_use]
    pub fn is_retryable(&self, error: &NetdeskError, request: &ApiRequest) -> bool {
        if !error.is_transient() {
            return false;
        }
        if error.status() == Some(429) && self.is_polling(request) {
            return false;
        }
        self.retry_non_idempotent || request.is_idempotent()
    }

    /// Backoff before retry number `attempt` (1-based): `base * attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Whether `attempt` may be replayed after `error`.
    #[must_use]
    pub fn should_retry(&self, error: &NetdeskError, attempt: &RequestAttempt) -> bool {
        attempt.retries() < self.max_retries && self.is_retryable(error, &attempt.request)
    }
}
