//! Wires a [`RequestPipeline`] from configuration.

use crate::{
    hooks::StaticTenant, pipeline::RequestPipeline, retry::RetryPolicy,
    transport::RquestTransport,
};
use netdesk_auth::{CsrfTokenStore, HttpTokenRefresher, RefreshCoordinator};
use netdesk_config::Config;
use netdesk_types::{CredentialProvider, Transport, traits::Result};
use std::sync::Arc;

/// Builds a pipeline that talks to `config.base_url` over HTTP.
///
/// # Errors
///
/// Returns [`netdesk_types::NetdeskError::Config`] if the HTTP client cannot
/// be constructed.
pub fn build(
    config: &Config,
    credentials: Arc<dyn CredentialProvider>,
) -> Result<Arc<RequestPipeline>> {
    let transport = RquestTransport::new(config.base_url.clone(), config.timeout())?;
    tracing::debug!(base_url = %config.base_url, tenant = ?config.tenant, "request pipeline ready");
    Ok(build_with_transport(config, Arc::new(transport), credentials))
}

/// Builds a pipeline over an arbitrary transport. The refresh call shares the
/// transport but never passes through the pipeline.
pub fn build_with_transport(
    config: &Config,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
) -> Arc<RequestPipeline> {
    let refresher =
        Arc::new(HttpTokenRefresher::new(transport.clone()).with_path(config.auth.refresh_path.clone()));
    let coordinator = Arc::new(
        RefreshCoordinator::new(credentials.clone(), refresher)
            .with_threshold(config.auth.refresh_threshold()),
    );
    let csrf = Arc::new(CsrfTokenStore::new(config.auth.csrf_exempt_paths()));
    let tenant = StaticTenant(config.tenant.clone());

    Arc::new(
        RequestPipeline::new(transport, credentials, coordinator, csrf)
            .with_tenant(Arc::new(tenant))
            .with_retry_policy(RetryPolicy::from_config(&config.retry)),
    )
}
