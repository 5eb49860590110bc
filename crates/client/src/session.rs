//! Sign-in, sign-out and session inspection on top of the request pipeline.

use crate::pipeline::RequestPipeline;
use netdesk_auth::inspector::{decode_expiry, is_expiring_soon};
use netdesk_config::AuthConfig;
use netdesk_types::{ApiRequest, TokenPair, traits::Result};
use serde_json::json;
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

/// Snapshot of the stored credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub signed_in: bool,
    pub has_refresh_token: bool,
    /// Access-token expiry, when the token carries one.
    pub expires_at: Option<SystemTime>,
    /// Inside the proactive refresh window.
    pub expiring_soon: bool,
    pub tenant: Option<String>,
}

pub struct Session {
    pipeline: Arc<RequestPipeline>,
    login_path: String,
    logout_path: String,
    threshold: Duration,
}

impl Session {
    pub fn new(pipeline: Arc<RequestPipeline>, auth: &AuthConfig) -> Self {
        Self {
            pipeline,
            login_path: auth.login_path.clone(),
            logout_path: auth.logout_path.clone(),
            threshold: auth.refresh_threshold(),
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.pipeline
    }

    /// Exchanges username and password for a token pair and stores it.
    ///
    /// # Errors
    ///
    /// The login endpoint's [`netdesk_types::NetdeskError::Api`] on bad
    /// credentials, a network error, or a storage error.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let request = ApiRequest::post(self.login_path.clone())
            .with_json(json!({ "username": username, "password": password }));
        let tokens: TokenPair = self.pipeline.execute_json(request).await?;
        self.pipeline.credentials().set(&tokens).await?;
        tracing::info!(username, "signed in");
        Ok(tokens)
    }

    /// Revokes the refresh token server-side when possible, then forgets the
    /// local credentials and CSRF token regardless of the server's answer.
    ///
    /// # Errors
    ///
    /// Only a failure to clear local storage is returned.
    pub async fn logout(&self) -> Result<()> {
        if let Some(tokens) = self.pipeline.credentials().get().await? {
            let mut request = ApiRequest::post(self.logout_path.clone());
            if let Some(refresh) = &tokens.refresh_token {
                request = request.with_json(json!({ "refresh_token": refresh }));
            }
            if let Err(e) = self.pipeline.execute(request).await {
                tracing::warn!(error = %e, "server-side logout failed; clearing local session anyway");
            }
        }
        self.pipeline.credentials().clear().await?;
        self.pipeline.csrf().clear();
        tracing::info!("signed out");
        Ok(())
    }

    /// Reads the stored credentials without touching the network.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the credential store cannot be read.
    pub async fn status(&self) -> Result<SessionStatus> {
        let tokens = self.pipeline.credentials().get().await?;
        let tenant = self.pipeline.tenant();
        Ok(match tokens {
            Some(tokens) => SessionStatus {
                signed_in: true,
                has_refresh_token: tokens.refresh_token.is_some(),
                expires_at: decode_expiry(&tokens.access_token),
                expiring_soon: is_expiring_soon(
                    &tokens.access_token,
                    SystemTime::now(),
                    self.threshold,
                ),
                tenant,
            },
            None => SessionStatus {
                signed_in: false,
                has_refresh_token: false,
                expires_at: None,
                expiring_soon: false,
                tenant,
            },
        })
    }
}
