//! Access/refresh token pair as issued by the auth endpoints.

use serde::{Deserialize, Serialize};

/// The credential pair owned by the client: a short-lived bearer access token
/// and the refresh token used to renew it.
///
/// Expiry is not stored; it is decoded from the access token's payload on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(
        default,
        alias = "refreshToken",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    /// Create a pair with only an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }

    /// Attach a refresh token.
    #[must_use]
    pub fn with_refresh(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Keep `previous`'s refresh token when this pair was issued without one
    /// (servers that do not rotate refresh tokens).
    #[must_use]
    pub fn or_refresh_from(mut self, previous: &str) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = Some(previous.to_string());
        }
        self
    }

    /// `Authorization` header value for this pair.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}
