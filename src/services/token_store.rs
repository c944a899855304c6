//! Shared key/value store holding the upstream bearer token.
//!
//! Every request handler sees the same store. Operations are atomic per key
//! and last-write-wins; nothing serializes logins across handlers, so two
//! requests racing on a stale token may both log in.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key of the cached bearer token
pub const TOKEN_KEY: &str = "token";

/// Key of the flag set when the upstream rejected the cached token
pub const EXPIRED_KEY: &str = "expired";

/// Errors reported by a store backend
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("Token store backend error: {0}")]
    Backend(String),
}

/// Key/value contract the auth pipeline depends on
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, TokenStoreError>;

    async fn set(&self, key: &str, value: String) -> Result<(), TokenStoreError>;

    async fn delete(&self, key: &str) -> Result<(), TokenStoreError>;
}

/// In-process store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token
    pub fn with_token(token: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(TOKEN_KEY.to_string(), token.into());
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), TokenStoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), TokenStoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Snapshot of both cache keys
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SharedCacheEntry {
    pub token: Option<String>,
    pub expired: bool,
}

impl SharedCacheEntry {
    /// Read both keys. Not atomic across the two.
    pub async fn load(store: &dyn TokenStore) -> Result<Self, TokenStoreError> {
        let token = store.get(TOKEN_KEY).await?;
        let expired = store
            .get(EXPIRED_KEY)
            .await?
            .map(|v| v == "true")
            .unwrap_or(false);

        Ok(Self { token, expired })
    }
}
