//! Async traits shared across all netdesk crates.
//!
//! Every cross-crate abstraction is defined here so that higher layers depend
//! only on `netdesk-types`, not on each other.

use crate::{ApiRequest, ApiResponse, NetdeskError, TokenPair};
use async_trait::async_trait;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, NetdeskError>;

/// Opaque key-value storage for the current credential pair.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Load the stored pair, if any.
    async fn get(&self) -> Result<Option<TokenPair>>;
    /// Replace the stored pair.
    async fn set(&self, tokens: &TokenPair) -> Result<()>;
    /// Forget the stored pair (logout, irrecoverable refresh failure).
    async fn clear(&self) -> Result<()>;
}

/// Sends one HTTP request to the API.
///
/// Every HTTP status, including 4xx/5xx, is an `Ok` response; only failures
/// with no response at all are errors, reported as [`NetdeskError::Network`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Exchanges a refresh token for a new credential pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;
}

/// Supplies the active tenant scope. `None` means a platform-level caller.
pub trait TenantContext: Send + Sync {
    fn tenant_slug(&self) -> Option<String>;
}

/// User-facing sink for terminal errors.
pub trait Notifier: Send + Sync {
    fn notify(&self, error: &NetdeskError);
}
