//! Generation-scoped response store.
//!
//! A [`CacheStore`] is a set of named generations, each a namespace of
//! [`CacheEntry`] values keyed by [`RequestKey`]. Entries live in a
//! [`CacheBackend`] under `"{generation}|{METHOD} {url}"`; the set of
//! generation names (and when each was opened) is tracked next to it.
//!
//! Generations are opened and deleted by the generation manager only. Writes
//! into a generation that is not open fail with `Error::GenerationNotFound`.
//!
//! Every clone of a store shares one transition lock. Instances that populate,
//! purge or clear generations in the same store take it first, so a purge never
//! overlaps another instance's populate.

use crate::backend::CacheBackend;
use crate::entry::CacheEntry;
use crate::error::{Error, Result};
use crate::key::{RequestKey, StoreKeyBuilder};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{Mutex, MutexGuard};

/// Named, versioned response store. Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct CacheStore<B: CacheBackend> {
    backend: B,
    generations: Arc<DashMap<String, SystemTime>>,
    transitions: Arc<Mutex<()>>,
}

impl<B: CacheBackend> CacheStore<B> {
    pub fn new(backend: B) -> Self {
        CacheStore {
            backend,
            generations: Arc::new(DashMap::new()),
            transitions: Arc::new(Mutex::new(())),
        }
    }

    /// Open a generation, creating it if absent.
    ///
    /// Returns `true` when the generation was created by this call.
    pub fn open(&self, generation: &str) -> bool {
        let mut created = false;
        self.generations
            .entry(generation.to_string())
            .or_insert_with(|| {
                created = true;
                SystemTime::now()
            });
        if created {
            debug!("✓ Opened generation {}", generation);
        }
        created
    }

    /// Serialize generation transitions across every instance sharing this store.
    pub async fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        self.transitions.lock().await
    }

    pub fn has_generation(&self, generation: &str) -> bool {
        self.generations.contains_key(generation)
    }

    /// Every open generation name, sorted.
    pub fn generation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .generations
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn created_at(&self, generation: &str) -> Option<SystemTime> {
        self.generations.get(generation).map(|entry| *entry.value())
    }

    /// Look up an entry.
    ///
    /// A missing generation reads as a miss. Entries that cannot be decoded
    /// are evicted and also read as a miss.
    ///
    /// # Errors
    ///
    /// Returns `Err` only if the backend itself fails.
    pub async fn get(&self, generation: &str, key: &RequestKey) -> Result<Option<CacheEntry>> {
        if !self.has_generation(generation) {
            return Ok(None);
        }

        let store_key = StoreKeyBuilder::build(generation, key);
        let Some(bytes) = self.backend.get(&store_key).await? else {
            return Ok(None);
        };

        match CacheEntry::deserialize_from_cache(&bytes) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) if e.is_corrupt_entry() => {
                warn!("Evicting unreadable entry {}: {}", store_key, e);
                self.backend.delete(&store_key).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Store an entry, replacing any previous one for the same key.
    ///
    /// # Errors
    ///
    /// - `Error::GenerationNotFound`: The generation is not open
    /// - `Error::SerializationError` / `Error::BackendError`
    pub async fn put(&self, generation: &str, key: &RequestKey, entry: &CacheEntry) -> Result<()> {
        if !self.has_generation(generation) {
            return Err(Error::GenerationNotFound(generation.to_string()));
        }

        let store_key = StoreKeyBuilder::build(generation, key);
        let bytes = entry.serialize_for_cache()?;
        self.backend.set(&store_key, bytes).await?;

        // A concurrent delete_generation may have swept before this write landed.
        if !self.has_generation(generation) {
            self.backend.delete(&store_key).await?;
            return Err(Error::GenerationNotFound(generation.to_string()));
        }
        Ok(())
    }

    /// Remove a single entry. Missing entries are not an error.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the backend fails.
    pub async fn delete(&self, generation: &str, key: &RequestKey) -> Result<()> {
        self.backend
            .delete(&StoreKeyBuilder::build(generation, key))
            .await
    }

    /// Delete a generation and every entry in it.
    ///
    /// Returns `false` when no such generation was open. Entries are swept
    /// either way, so a retry after a backend failure completes the cleanup.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the backend fails.
    pub async fn delete_generation(&self, generation: &str) -> Result<bool> {
        let existed = self.generations.remove(generation).is_some();

        let keys = self
            .backend
            .keys_with_prefix(&StoreKeyBuilder::generation_prefix(generation))
            .await?;
        self.backend.mdelete(&keys).await?;

        if existed {
            info!(
                "✓ Deleted generation {} ({} entries)",
                generation,
                keys.len()
            );
        }
        Ok(existed)
    }

    /// Request keys stored in a generation, sorted.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the backend fails.
    pub async fn keys(&self, generation: &str) -> Result<Vec<RequestKey>> {
        let store_keys = self
            .backend
            .keys_with_prefix(&StoreKeyBuilder::generation_prefix(generation))
            .await?;
        let mut keys: Vec<RequestKey> = store_keys
            .iter()
            .filter_map(|k| StoreKeyBuilder::parse(k).map(|(_, key)| key))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Number of entries stored in a generation.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the backend fails.
    pub async fn entry_count(&self, generation: &str) -> Result<usize> {
        Ok(self
            .backend
            .keys_with_prefix(&StoreKeyBuilder::generation_prefix(generation))
            .await?
            .len())
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
