//! In-memory cache backend (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.

use super::CacheBackend;
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe async in-memory cache backend.
///
/// Clones share the same map, so one backend can be handed to several store
/// handles (and to successive relay instances in tests).
///
/// # Example
///
/// ```no_run
/// use cache_relay::backend::{CacheBackend, InMemoryBackend};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = InMemoryBackend::new();
///     backend.set("app-v1.0.0|GET https://example.com/", b"bytes".to_vec()).await?;
///     assert!(backend.get("app-v1.0.0|GET https://example.com/").await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    /// Create a new in-memory cache backend.
    pub fn new() -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
        }
    }

    /// Get the current number of entries.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Total stored bytes, envelopes included.
    pub fn total_bytes(&self) -> usize {
        self.store.iter().map(|entry| entry.value().len()).sum()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.store.get(key) {
            Some(entry) => {
                debug!("✓ InMemory GET {} -> HIT", key);
                Ok(Some(entry.value().clone()))
            }
            None => {
                debug!("✓ InMemory GET {} -> MISS", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.store.insert(key.to_string(), value);
        debug!("✓ InMemory SET {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        debug!("✓ InMemory DELETE {}", key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let keys: Vec<String> = self
            .store
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        debug!("✓ InMemory KEYS {}* -> {}", prefix, keys.len());
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.store.contains_key(key))
    }

    async fn mdelete(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.store.remove(key);
        }

        debug!("✓ InMemory MDELETE {} keys", keys.len());
        Ok(())
    }
}
