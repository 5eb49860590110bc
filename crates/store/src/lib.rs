//! Credential storage backends for the access/refresh token pair.
//!
//! Provides an in-memory store for testing and ephemeral sessions, and a
//! SQLite-backed store that keeps one pair per named profile.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;
