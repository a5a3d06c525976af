//! Cache backend implementations.

use crate::error::Result;
use std::future::Future;

pub mod inmemory;

pub use inmemory::InMemoryBackend;

/// Trait for byte-level cache backends.
///
/// Abstracts storage operations so the store can run on any key/value engine.
///
/// **IMPORTANT:** All methods use `&self` instead of `&mut self` to allow concurrent access.
/// Backend implementations should use interior mutability (DashMap, RwLock, or external storage).
/// Single-key operations must be atomic; the store relies on that instead of locking.
///
/// **ASYNC:** Methods return `Send` futures so callers can move them onto
/// spawned tasks (background refreshes). Implementations can simply use `async fn`.
pub trait CacheBackend: Send + Sync + Clone + 'static {
    /// Retrieve value by key.
    ///
    /// # Returns
    /// - `Ok(Some(bytes))` - Value found
    /// - `Ok(None)` - Key not present
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Store value, replacing any previous value (last write wins).
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn set(&self, key: &str, value: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    /// Remove value.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// List every key starting with `prefix`.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn keys_with_prefix(&self, prefix: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Check if key exists (optional optimization).
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send {
        async move { Ok(self.get(key).await?.is_some()) }
    }

    /// Bulk delete operation (optional optimization).
    ///
    /// Default implementation calls `delete()` for each key.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn mdelete(&self, keys: &[String]) -> impl Future<Output = Result<()>> + Send {
        async move {
            for key in keys {
                self.delete(key).await?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_backend_exists_default() {
        let backend = InMemoryBackend::new();
        backend
            .set("key", vec![1, 2, 3])
            .await
            .expect("Failed to set key");
        assert!(backend.exists("key").await.expect("Failed to check exists"));
        assert!(!backend
            .exists("nonexistent")
            .await
            .expect("Failed to check exists"));
    }
}
