//! Shared storage for installation access tokens.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::CacheError;

#[cfg(test)]
#[path = "token_cache_tests.rs"]
mod tests;

/// How long a cached installation token is kept, whatever its own expiry.
///
/// GitHub issues installation tokens for one hour.
pub const INSTALLATION_TOKEN_CACHE_TTL: Duration = Duration::from_secs(55 * 60);

/// Byte store shared by every authenticator in (and possibly across)
/// processes.
///
/// Payloads are opaque to the cache. They may be encrypted by the caller.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Returns the payload stored under `key`, or `None` when absent or
    /// expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// Implementations with a local store drop expired entries here.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Process local [`TokenCache`] with a fixed time to live per entry.
pub struct InMemoryTokenCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryTokenCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryTokenCache {
    fn default() -> Self {
        Self::new(INSTALLATION_TOKEN_CACHE_TTL)
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.value.clone()))
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            debug!(key = key, "Evicting expired token cache entry");
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired token cache entries");
        }

        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
