//! Authenticated request pipeline for the netdesk API.
//!
//! [`RequestPipeline`] wraps a [`netdesk_types::Transport`] with proactive
//! token refresh, CSRF propagation, one-shot 401 recovery and transient-failure
//! retries. [`factory`] wires one from configuration; [`Session`] adds login,
//! logout and status on top.

pub mod factory;
pub mod hooks;
pub mod pipeline;
pub mod retry;
pub mod session;
pub mod transport;

#[cfg(test)]
mod mock;

pub use hooks::{StaticTenant, TracingNotifier};
pub use pipeline::RequestPipeline;
pub use retry::{MAX_RETRIES, RetryPolicy};
pub use session::{Session, SessionStatus};
pub use transport::RquestTransport;
