//! In-memory credential store backed by an `Option` behind a `Mutex`.

use async_trait::async_trait;
use netdesk_types::{CredentialProvider, TokenPair, traits::Result};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An in-memory [`CredentialProvider`] for testing and ephemeral sessions.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl InMemoryCredentialStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `tokens` (e.g. restored from a login).
    #[must_use]
    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<TokenPair>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialProvider for InMemoryCredentialStore {
    async fn get(&self) -> Result<Option<TokenPair>> {
        Ok(self.lock().clone())
    }

    async fn set(&self, tokens: &TokenPair) -> Result<()> {
        *self.lock() = Some(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_by_default() {
        let store = InMemoryCredentialStore::new();
        assert!(store.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryCredentialStore::new();
        let pair = TokenPair::new("access").with_refresh("refresh");
        store.set(&pair).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(pair));
    }

    #[tokio::test]
    async fn test_overwrite() {
        let store = InMemoryCredentialStore::with_tokens(TokenPair::new("first"));
        store.set(&TokenPair::new("second")).await.unwrap();
        assert_eq!(store.get().await.unwrap().unwrap().access_token, "second");
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryCredentialStore::with_tokens(TokenPair::new("tok"));
        store.clear().await.unwrap();
        assert!(store.get().await.unwrap().is_none());
    }
}
