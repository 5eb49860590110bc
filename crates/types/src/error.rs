//! Unified error type for the netdesk workspace.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Why a request produced no HTTP response at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The transport gave up waiting (request timeout).
    Timeout,
    /// The connection could not be established.
    Connect,
    /// Any other transport-level failure (reset, TLS, body read).
    Other,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connect => write!(f, "connect"),
            Self::Other => write!(f, "transport"),
        }
    }
}

/// Enumerates all error kinds that can occur across netdesk crates.
#[derive(Debug, Error)]
pub enum NetdeskError {
    /// The server answered with a failing status.
    #[error("api error: status={status}, message={message}")]
    Api {
        status: u16,
        /// Machine-readable code supplied by the server, if any.
        code: Option<String>,
        message: String,
        details: Option<Value>,
    },

    /// No response was obtained (timeout, connection failure).
    #[error("network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    /// Unauthorized recovery failed; the session is over and credentials were cleared.
    #[error("session expired: please sign in again")]
    SessionExpired,

    /// No usable credentials are available for the request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The refresh endpoint rejected or failed the refresh call.
    #[error("token refresh failed: {0}")]
    Refresh(String),

    /// Credential storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request could not be built (bad method, header or URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ── Feature-gated From impls ──────────────────────────────────────────────────

#[cfg(feature = "rquest")]
impl From<rquest::Error> for NetdeskError {
    fn from(e: rquest::Error) -> Self {
        let kind = if e.is_timeout() {
            NetworkErrorKind::Timeout
        } else if e.is_connect() {
            NetworkErrorKind::Connect
        } else {
            NetworkErrorKind::Other
        };
        Self::Network {
            kind,
            message: e.to_string(),
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for NetdeskError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Human-readable fallback message for a failing HTTP status.
#[must_use]
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 => "The request was invalid.",
        401 => "You are not signed in or your session has expired.",
        403 => "You do not have permission to perform this action.",
        404 => "The requested resource was not found.",
        408 => "The request timed out.",
        409 => "The request conflicts with the current state of the resource.",
        422 => "Some of the submitted data is invalid.",
        429 => "Too many requests. Please wait before trying again.",
        500 => "The server encountered an internal error.",
        502 => "The server received an invalid response from an upstream service.",
        503 => "The service is temporarily unavailable.",
        504 => "The server timed out waiting for an upstream service.",
        _ => "An unexpected error occurred.",
    }
}

impl NetdeskError {
    /// Builds a network error.
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self::Network {
            kind,
            message: message.into(),
        }
    }

    /// Normalizes a failing response into [`NetdeskError::Api`].
    ///
    /// The body is read as JSON when possible: `message` (or `detail`) becomes
    /// the message, `code` the machine code, `details` the details. Without a
    /// server message the status table supplies one.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let json: Option<Value> = serde_json::from_slice(body).ok();
        let field = |name: &str| {
            json.as_ref()
                .and_then(|v| v.get(name))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let message = field("message")
            .or_else(|| field("detail"))
            .unwrap_or_else(|| status_message(status).to_string());

        Self::Api {
            status,
            code: field("code"),
            message,
            details: json.as_ref().and_then(|v| v.get("details")).cloned(),
        }
    }

    /// HTTP status associated with the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::SessionExpired | Self::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    /// Returns `true` for failures that are transient by nature: a status in
    /// the retryable set, or any network failure.
    ///
    /// Endpoint-specific carve-outs are applied by the retry policy on top.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            Self::Network { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> NetdeskError {
        NetdeskError::from_response(status, b"")
    }

    #[test]
    fn test_from_response_uses_server_message() {
        let body = br#"{"message":"plan is in use","code":"PLAN_IN_USE","details":{"subscribers":3}}"#;
        let err = NetdeskError::from_response(409, body);
        let NetdeskError::Api {
            status,
            code,
            message,
            details,
        } = err
        else {
            panic!("expected api error");
        };
        assert_eq!(status, 409);
        assert_eq!(code.as_deref(), Some("PLAN_IN_USE"));
        assert_eq!(message, "plan is in use");
        assert_eq!(details.unwrap()["subscribers"], 3);
    }

    #[test]
    fn test_from_response_reads_detail_field() {
        let err = NetdeskError::from_response(400, br#"{"detail":"username taken"}"#);
        assert!(err.to_string().contains("username taken"));
    }

    #[test]
    fn test_from_response_falls_back_to_status_table() {
        let err = NetdeskError::from_response(503, b"<html>bad gateway</html>");
        let NetdeskError::Api { message, code, .. } = err else {
            panic!("expected api error");
        };
        assert_eq!(message, status_message(503));
        assert!(code.is_none());
    }

    #[test]
    fn test_status_message_unknown_status() {
        assert_eq!(status_message(418), "An unexpected error occurred.");
    }

    #[test]
    fn test_is_transient_statuses() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(api(status).is_transient(), "{status} should be transient");
        }
        for status in [400, 401, 403, 404, 409, 422] {
            assert!(!api(status).is_transient(), "{status} should be terminal");
        }
    }

    #[test]
    fn test_is_transient_network() {
        assert!(NetdeskError::network(NetworkErrorKind::Timeout, "deadline").is_transient());
        assert!(NetdeskError::network(NetworkErrorKind::Connect, "refused").is_transient());
    }

    #[test]
    fn test_is_transient_other_errors() {
        assert!(!NetdeskError::SessionExpired.is_transient());
        assert!(!NetdeskError::Storage("disk".into()).is_transient());
        assert!(!NetdeskError::Refresh("bad".into()).is_transient());
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(api(404).status(), Some(404));
        assert_eq!(NetdeskError::SessionExpired.status(), Some(401));
        assert_eq!(
            NetdeskError::network(NetworkErrorKind::Other, "reset").status(),
            None
        );
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<Value>("invalid {{{").unwrap_err();
        let err: NetdeskError = json_err.into();
        assert!(matches!(err, NetdeskError::Serialization(_)));
    }
}
