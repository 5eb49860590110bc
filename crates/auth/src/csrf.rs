//! Anti-forgery token capture and propagation.

use http::{HeaderMap, HeaderValue};
use netdesk_types::{ApiRequest, CSRF_HEADER};
use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::SystemTime,
};

/// The latest CSRF token seen on any response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub value: HeaderValue,
    pub captured_at: SystemTime,
}

/// Holds the most recent anti-forgery token and applies it to mutating requests.
///
/// No client-side expiry is tracked; a stale token is rejected by the server
/// and replaced by the next response that carries one.
pub struct CsrfTokenStore {
    token: Mutex<Option<CsrfToken>>,
    /// Routes that precede CSRF issuance (login, register, refresh, logout).
    exempt: Vec<String>,
}

impl CsrfTokenStore {
    #[must_use]
    pub fn new(exempt: Vec<String>) -> Self {
        Self {
            token: Mutex::new(None),
            exempt,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<CsrfToken>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remember the `x-csrf-token` response header, if present.
    ///
    /// Call this for error responses too: middleware may set the header
    /// before rejecting the request.
    pub fn capture(&self, headers: &HeaderMap) {
        let Some(value) = headers.get(CSRF_HEADER) else {
            return;
        };
        if value.is_empty() {
            return;
        }
        let mut value = value.clone();
        value.set_sensitive(true);
        *self.lock() = Some(CsrfToken {
            value,
            captured_at: SystemTime::now(),
        });
        tracing::trace!("captured csrf token");
    }

    /// Stamp the stored token onto `request` if it is state-changing and not exempt.
    ///
    /// A missing token is logged and the request proceeds; the server decides.
    pub fn apply(&self, request: &mut ApiRequest) {
        if !request.is_state_changing() || self.is_exempt(request.route()) {
            return;
        }
        let token = self.lock().as_ref().map(|t| t.value.clone());
        match token {
            Some(value) => {
                request.headers.insert(CSRF_HEADER, value);
            }
            None => {
                tracing::warn!(
                    method = %request.method,
                    path = %request.route(),
                    "no csrf token available for state-changing request"
                );
            }
        }
    }

    /// `true` if `route` is one of the exempt auth endpoints, with or without
    /// an API prefix in front.
    #[must_use]
    pub fn is_exempt(&self, route: &str) -> bool {
        let route = route.trim_end_matches('/');
        self.exempt.iter().any(|path| {
            let path = path.trim_end_matches('/');
            !path.is_empty() && route.ends_with(path)
        })
    }

    /// The stored token, if any.
    #[must_use]
    pub fn current(&self) -> Option<CsrfToken> {
        self.lock().clone()
    }

    /// Forget the stored token (logout).
    pub fn clear(&self) {
        *self.lock() = None;
    }
}
