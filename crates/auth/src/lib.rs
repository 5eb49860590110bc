//! Credential lifecycle for the netdesk request pipeline.
//!
//! - [`inspector`] decodes access-token expiry without side effects.
//! - [`csrf`] remembers the latest anti-forgery token and stamps it on mutating requests.
//! - [`refresh`] runs at most one token refresh at a time and queues everyone else behind it.
//! - [`refresher`] performs the refresh call itself against the auth endpoint.

pub mod csrf;
pub mod inspector;
pub mod refresh;
pub mod refresher;

pub use csrf::CsrfTokenStore;
pub use refresh::RefreshCoordinator;
pub use refresher::HttpTokenRefresher;
