//! SQLite-backed credential store using sqlx.
//!
//! Schema: `credentials(profile, token_json, updated_at)` with `profile` as the
//! primary key. Each profile is an independent logical session.

use async_trait::async_trait;
use netdesk_types::{CredentialProvider, NetdeskError, TokenPair, traits::Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;

/// Profile used when none is given.
pub const DEFAULT_PROFILE: &str = "default";

/// A persistent [`CredentialProvider`] backed by `SQLite`, scoped to one profile.
pub struct SqliteCredentialStore {
    pool: SqlitePool,
    profile: String,
}

impl SqliteCredentialStore {
    /// Connects to a `SQLite` database (e.g. `"sqlite:./credentials.db"` or
    /// `"sqlite::memory:"`) and binds the store to `profile`.
    ///
    /// Automatically creates the database file if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`sqlx::Error`] if the connection or table creation fails.
    pub async fn new(
        database_url: &str,
        profile: impl Into<String>,
    ) -> std::result::Result<Self, sqlx::Error> {
        let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to `:memory:` is a separate database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self {
            pool,
            profile: profile.into(),
        })
    }

    /// Another store sharing this pool but bound to a different profile.
    #[must_use]
    pub fn for_profile(&self, profile: impl Into<String>) -> Self {
        Self {
            pool: self.pool.clone(),
            profile: profile.into(),
        }
    }

    /// The profile this store reads and writes.
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    async fn migrate(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS credentials (
                profile     TEXT    PRIMARY KEY NOT NULL,
                token_json  TEXT    NOT NULL,
                updated_at  INTEGER NOT NULL DEFAULT (unixepoch())
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for SqliteCredentialStore {
    async fn get(&self) -> Result<Option<TokenPair>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT token_json FROM credentials WHERE profile = ?")
                .bind(&self.profile)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            None => Ok(None),
            Some((json,)) => {
                let tokens: TokenPair = serde_json::from_str(&json)
                    .map_err(|e| NetdeskError::Storage(e.to_string()))?;
                Ok(Some(tokens))
            }
        }
    }

    async fn set(&self, tokens: &TokenPair) -> Result<()> {
        let json = serde_json::to_string(tokens)?;
        sqlx::query(
            "INSERT INTO credentials (profile, token_json, updated_at)
             VALUES (?, ?, unixepoch())
             ON CONFLICT(profile) DO UPDATE SET
                token_json = excluded.token_json,
                updated_at = excluded.updated_at",
        )
        .bind(&self.profile)
        .bind(json)
        .execute(&self.pool)
        .await?;
        tracing::debug!(profile = %self.profile, "credentials saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM credentials WHERE profile = ?")
            .bind(&self.profile)
            .execute(&self.pool)
            .await?;
        tracing::debug!(profile = %self.profile, "credentials cleared");
        Ok(())
    }
}
