//! Configuration loading for the netdesk client.
//!
//! Uses figment to layer serialized defaults, an optional YAML file, and
//! `NETDESK_`-prefixed environment variables.

pub mod schema;

pub use schema::{AuthConfig, Config, LogConfig, LogFormat, RetryConfig};
