//! Request/response models shared by the transport, the auth layer and the pipeline.

use crate::{NetdeskError, traits::Result};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header::AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Tenant scope header; omitted for platform-level callers.
pub const TENANT_HEADER: HeaderName = HeaderName::from_static("x-tenant-slug");
/// Anti-forgery token header, both directions.
pub const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");
/// Per-request trace/correlation identifier.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// One outgoing API call, addressed relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path (optionally with a query string), e.g. `/subscribers?page=2`.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    /// Marks a polling-style endpoint whose 429 must not be retried.
    pub polling: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            polling: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Flag this request as targeting a polling-style endpoint.
    #[must_use]
    pub fn polling(mut self) -> Self {
        self.polling = true;
        self
    }

    /// The path without its query string.
    #[must_use]
    pub fn route(&self) -> &str {
        self.path.split(['?', '#']).next().unwrap_or_default()
    }

    /// `true` for create/update/delete-style methods.
    #[must_use]
    pub fn is_state_changing(&self) -> bool {
        [Method::POST, Method::PUT, Method::PATCH, Method::DELETE].contains(&self.method)
    }

    /// `true` unless the method may duplicate side effects when replayed.
    #[must_use]
    pub fn is_idempotent(&self) -> bool {
        ![Method::POST, Method::PATCH].contains(&self.method)
    }

    /// Set `Authorization: Bearer <token>`.
    ///
    /// # Errors
    ///
    /// Returns [`NetdeskError::InvalidRequest`] if the token contains bytes that
    /// are not valid in a header value.
    pub fn set_bearer(&mut self, token: &str) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| NetdeskError::InvalidRequest("access token is not header-safe".into()))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// The bearer token currently attached, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
    }
}

/// A response as received from the transport, successful or not.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`NetdeskError::Serialization`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The body as (lossy) UTF-8 text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One logical request together with its retry bookkeeping.
///
/// The retry counter and the auth-recovery marker live here rather than in the
/// response handler so that every pass through the handler sees cumulative state.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    pub request: ApiRequest,
    retries: u32,
    auth_retried: bool,
}

impl RequestAttempt {
    #[must_use]
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retries: 0,
            auth_retried: false,
        }
    }

    /// Number of transient-failure retries performed so far.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Count one more retry and return the new total.
    pub fn record_retry(&mut self) -> u32 {
        self.retries += 1;
        self.retries
    }

    /// Whether unauthorized recovery has already been attempted.
    #[must_use]
    pub fn auth_retried(&self) -> bool {
        self.auth_retried
    }

    /// Flip the auth-recovery marker. Returns `false` if it was already set.
    pub fn mark_auth_retried(&mut self) -> bool {
        !std::mem::replace(&mut self.auth_retried, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_strips_query() {
        assert_eq!(ApiRequest::get("/devices?page=2").route(), "/devices");
        assert_eq!(ApiRequest::get("/devices").route(), "/devices");
    }

    #[test]
    fn test_state_changing_methods() {
        assert!(ApiRequest::post("/x").is_state_changing());
        assert!(ApiRequest::put("/x").is_state_changing());
        assert!(ApiRequest::patch("/x").is_state_changing());
        assert!(ApiRequest::delete("/x").is_state_changing());
        assert!(!ApiRequest::get("/x").is_state_changing());
    }

    #[test]
    fn test_idempotent_methods() {
        assert!(ApiRequest::get("/x").is_idempotent());
        assert!(ApiRequest::put("/x").is_idempotent());
        assert!(ApiRequest::delete("/x").is_idempotent());
        assert!(!ApiRequest::post("/x").is_idempotent());
        assert!(!ApiRequest::patch("/x").is_idempotent());
    }

    #[test]
    fn test_bearer_roundtrip() {
        let mut req = ApiRequest::get("/me");
        assert!(req.bearer_token().is_none());
        req.set_bearer("tok-1").unwrap();
        assert_eq!(req.bearer_token(), Some("tok-1"));
        req.set_bearer("tok-2").unwrap();
        assert_eq!(req.bearer_token(), Some("tok-2"));
        assert_eq!(req.headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_set_bearer_rejects_control_chars() {
        let mut req = ApiRequest::get("/me");
        let err = req.set_bearer("bad\ntoken").unwrap_err();
        assert!(matches!(err, NetdeskError::InvalidRequest(_)));
    }

    #[test]
    fn test_auth_marker_flips_once() {
        let mut attempt = RequestAttempt::new(ApiRequest::get("/x"));
        assert!(!attempt.auth_retried());
        assert!(attempt.mark_auth_retried());
        assert!(attempt.auth_retried());
        assert!(!attempt.mark_auth_retried());
    }

    #[test]
    fn test_retry_counter_accumulates() {
        let mut attempt = RequestAttempt::new(ApiRequest::get("/x"));
        assert_eq!(attempt.record_retry(), 1);
        assert_eq!(attempt.record_retry(), 2);
        assert_eq!(attempt.retries(), 2);
    }

    #[test]
    fn test_response_json_and_text() {
        let resp = ApiResponse::new(StatusCode::OK, HeaderMap::new(), r#"{"id":7}"#);
        let v: Value = resp.json().unwrap();
        assert_eq!(v["id"], 7);
        assert_eq!(resp.text(), r#"{"id":7}"#);
    }
}
