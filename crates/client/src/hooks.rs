//! Default implementations of the pipeline's external collaborators.

use netdesk_types::{NetdeskError, Notifier, TenantContext};

/// A tenant scope fixed at construction. `None` is a platform-level caller.
#[derive(Debug, Clone, Default)]
pub struct StaticTenant(pub Option<String>);

impl StaticTenant {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(Some(slug.into()))
    }

    /// No tenant scope: requests go out without the tenant header.
    #[must_use]
    pub fn platform() -> Self {
        Self(None)
    }
}

impl TenantContext for StaticTenant {
    fn tenant_slug(&self) -> Option<String> {
        self.0.clone().filter(|s| !s.is_empty())
    }
}

/// Reports terminal errors through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, error: &NetdeskError) {
        match error {
            NetdeskError::SessionExpired => {
                tracing::warn!("session expired; sign in again");
            }
            other => tracing::warn!(error = %other, status = ?other.status(), "request failed"),
        }
    }
}
