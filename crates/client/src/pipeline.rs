//! Request pipeline: credentials out, CSRF in, recovery and retry around every call.
//!
//! Outgoing: attach a request id, refresh the access token if it is about to
//! expire (joining any refresh already in flight), attach `Authorization`, the
//! tenant header and, for mutating requests, the CSRF header.
//!
//! Incoming: capture the CSRF header from every response; on 401 refresh once
//! and replay; on a transient failure back off and replay within the budget;
//! otherwise surface one normalized error.

use crate::{
    hooks::{StaticTenant, TracingNotifier},
    retry::RetryPolicy,
};
use http::{HeaderValue, StatusCode};
use netdesk_auth::{CsrfTokenStore, RefreshCoordinator};
use netdesk_types::{
    ApiRequest, ApiResponse, CredentialProvider, NetdeskError, Notifier, REQUEST_ID_HEADER,
    RequestAttempt, TENANT_HEADER, TenantContext, Transport, traits::Result,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Orchestrates token freshness, CSRF propagation, 401 recovery and retries
/// around a [`Transport`].
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    coordinator: Arc<RefreshCoordinator>,
    csrf: Arc<CsrfTokenStore>,
    tenant: Arc<dyn TenantContext>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
}

impl RequestPipeline {
    /// Creates a pipeline for a platform-level caller with the default retry
    /// policy and a tracing notifier.
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
        coordinator: Arc<RefreshCoordinator>,
        csrf: Arc<CsrfTokenStore>,
    ) -> Self {
        Self {
            transport,
            credentials,
            coordinator,
            csrf,
            tenant: Arc::new(StaticTenant::platform()),
            notifier: Arc::new(TracingNotifier),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: Arc<dyn TenantContext>) -> Self {
        self.tenant = tenant;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    #[must_use]
    pub fn csrf(&self) -> &CsrfTokenStore {
        &self.csrf
    }

    #[must_use]
    pub fn tenant(&self) -> Option<String> {
        self.tenant.tenant_slug()
    }

    /// Sends `request` and returns its successful response.
    ///
    /// Refreshes and retries happen inside; only the final outcome is
    /// returned, and a failure is reported to the notifier exactly once.
    ///
    /// # Errors
    ///
    /// [`NetdeskError::Api`] for a failing status, [`NetdeskError::Network`]
    /// when no response arrived within the retry budget,
    /// [`NetdeskError::SessionExpired`] when unauthorized recovery failed.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut attempt = RequestAttempt::new(request);
        let result = self.run(&mut attempt).await;
        if let Err(e) = &result {
            self.notifier.notify(e);
        }
        result
    }

    /// [`RequestPipeline::execute`], then decode the body as JSON.
    ///
    /// # Errors
    ///
    /// As [`RequestPipeline::execute`], plus [`NetdeskError::Serialization`].
    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.execute(request).await?.json()
    }

    async fn run(&self, attempt: &mut RequestAttempt) -> Result<ApiResponse> {
        self.prepare(&mut attempt.request).await?;

        loop {
            let sent = self.transport.send(&attempt.request).await;
            let error = match sent {
                Ok(resp) => {
                    self.csrf.capture(&resp.headers);
                    if resp.status.is_success() {
                        return Ok(resp);
                    }
                    if resp.status == StatusCode::UNAUTHORIZED
                        && !self.csrf.is_exempt(attempt.request.route())
                    {
                        let token = self.recover(attempt).await?;
                        attempt.request.set_bearer(&token)?;
                        self.csrf.apply(&mut attempt.request);
                        tracing::debug!(
                            method = %attempt.request.method,
                            path = %attempt.request.route(),
                            request_id = request_id(&attempt.request),
                            "replaying with refreshed token"
                        );
                        continue;
                    }
                    NetdeskError::from_response(resp.status.as_u16(), &resp.body)
                }
                Err(e) => e,
            };

            if !self.retry.should_retry(&error, attempt) {
                return Err(error);
            }
            let retry = attempt.record_retry();
            let delay = self.retry.delay_for(retry);
            tracing::warn!(
                method = %attempt.request.method,
                path = %attempt.request.route(),
                request_id = request_id(&attempt.request),
                attempt = retry,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "retryable error, backing off"
            );
            tokio::time::sleep(delay).await;
            self.csrf.apply(&mut attempt.request);
        }
    }

    /// Request id, fresh bearer token, tenant scope and CSRF header.
    async fn prepare(&self, request: &mut ApiRequest) -> Result<()> {
        if !request.headers.contains_key(REQUEST_ID_HEADER) {
            let id = uuid::Uuid::new_v4().to_string();
            request.headers.insert(
                REQUEST_ID_HEADER,
                HeaderValue::from_str(&id).map_err(|e| NetdeskError::InvalidRequest(e.to_string()))?,
            );
        }

        if let Some(tokens) = self.credentials.get().await? {
            let token = if self.csrf.is_exempt(request.route()) {
                tokens.access_token
            } else {
                self.coordinator.ensure_fresh(&tokens.access_token).await?
            };
            request.set_bearer(&token)?;
        }

        match self.tenant.tenant_slug() {
            Some(slug) => {
                let value = HeaderValue::from_str(&slug).map_err(|_| {
                    NetdeskError::InvalidRequest(format!("tenant slug {slug:?} is not header-safe"))
                })?;
                request.headers.insert(TENANT_HEADER, value);
            }
            None => {
                request.headers.remove(TENANT_HEADER);
            }
        }

        self.csrf.apply(request);
        Ok(())
    }

    /// One-shot refresh after a 401. Any failure ends the session.
    async fn recover(&self, attempt: &mut RequestAttempt) -> Result<String> {
        match self.coordinator.recover_from_unauthorized(attempt).await {
            Ok(token) => Ok(token),
            Err(e) => {
                tracing::warn!(
                    path = %attempt.request.route(),
                    error = %e,
                    "unauthorized recovery failed; ending session"
                );
                if let Err(e) = self.credentials.clear().await {
                    tracing::warn!(error = %e, "failed to clear credentials");
                }
                Err(NetdeskError::SessionExpired)
            }
        }
    }
}

fn request_id(request: &ApiRequest) -> &str {
    request
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
