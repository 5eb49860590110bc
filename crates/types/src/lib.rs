//! Core types and traits for the netdesk workspace.
//!
//! This crate defines the shared abstractions used across all layers of the
//! netdesk API client, including the error taxonomy, the credential pair, the
//! request/response models, and the async traits that each layer implements.

pub mod error;
pub mod request;
pub mod token;
pub mod traits;

pub use error::{NetdeskError, NetworkErrorKind, status_message};
pub use request::{
    ApiRequest, ApiResponse, CSRF_HEADER, REQUEST_ID_HEADER, RequestAttempt, TENANT_HEADER,
};
pub use token::TokenPair;
pub use traits::{CredentialProvider, Notifier, TenantContext, TokenRefresher, Transport};
