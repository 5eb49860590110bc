//! Refresh call against the API's auth endpoint.
//!
//! Goes straight to the transport, never through the request pipeline, so a
//! refresh can never trigger another refresh.

use async_trait::async_trait;
use http::HeaderValue;
use netdesk_types::{
    ApiRequest, NetdeskError, REQUEST_ID_HEADER, TokenPair, TokenRefresher, Transport,
    traits::Result,
};
use serde_json::json;
use std::sync::Arc;

/// Default refresh endpoint, relative to the API base URL.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// [`TokenRefresher`] that POSTs the refresh token to the auth endpoint.
pub struct HttpTokenRefresher {
    transport: Arc<dyn Transport>,
    path: String,
}

impl HttpTokenRefresher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            path: DEFAULT_REFRESH_PATH.to_string(),
        }
    }

    /// Use a non-default refresh endpoint.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let request = ApiRequest::post(self.path.clone())
            .with_json(json!({ "refresh_token": refresh_token }))
            .with_header(
                REQUEST_ID_HEADER,
                HeaderValue::from_str(&request_id)
                    .map_err(|e| NetdeskError::InvalidRequest(e.to_string()))?,
            );

        let resp = self.transport.send(&request).await.map_err(|e| {
            NetdeskError::Refresh(format!("refresh request failed: {e}"))
        })?;

        if !resp.status.is_success() {
            return Err(NetdeskError::Refresh(format!(
                "refresh endpoint returned {}",
                resp.status
            )));
        }

        resp.json::<TokenPair>()
            .map_err(|e| NetdeskError::Refresh(format!("unreadable refresh response: {e}")))
    }
}
