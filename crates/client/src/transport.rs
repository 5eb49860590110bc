//! HTTP transport backed by `rquest`.
//!
//! Sends exactly what the pipeline built and hands every status back as a
//! response; only failures with no response become errors.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header::CONTENT_TYPE};
use netdesk_types::{
    ApiRequest, ApiResponse, NetdeskError, NetworkErrorKind, Transport, traits::Result,
};
use rquest::Client;
use std::time::Duration;

/// Per-request timeout enforced by the transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`Transport`] that resolves request paths against a base URL.
#[derive(Clone)]
pub struct RquestTransport {
    http: Client,
    base_url: String,
}

impl RquestTransport {
    /// Builds a client with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NetdeskError::Config`] if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetdeskError::Config(format!("http client: {e}")))?;
        Ok(Self::with_client(http, base_url))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

#[async_trait]
impl Transport for RquestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let method = rquest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| NetdeskError::InvalidRequest(e.to_string()))?;
        let mut builder = self.http.request(method, self.url(&request.path));

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_bytes());
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE.as_str(), "application/json")
                .body(serde_json::to_vec(body)?);
        }

        let resp = builder.send().await?;

        let status = StatusCode::from_u16(resp.status().as_u16())
            .map_err(|e| NetdeskError::network(NetworkErrorKind::Other, e.to_string()))?;
        let mut headers = HeaderMap::new();
        for (name, value) in resp.headers() {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_str().as_bytes()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                headers.append(name, value);
            }
        }
        let body = resp.bytes().await?;

        Ok(ApiResponse::new(status, headers, Bytes::from(body.to_vec())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let t = RquestTransport::with_client(Client::new(), "https://api.isp.example/v1/");
        assert_eq!(t.url("/devices"), "https://api.isp.example/v1/devices");
        assert_eq!(t.url("devices?page=2"), "https://api.isp.example/v1/devices?page=2");
    }

    #[test]
    fn test_new_with_default_timeout() {
        let t = RquestTransport::new("http://127.0.0.1:8000/api/v1", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(t.url("/auth/login"), "http://127.0.0.1:8000/api/v1/auth/login");
    }

    #[test]
    fn test_transport_clone() {
        let t = RquestTransport::with_client(Client::new(), "http://localhost");
        let _t2 = t.clone();
    }
}
