//! Postcard-based entry serialization with versioned envelopes.
//!
//! Every stored response is wrapped in an envelope before it reaches the
//! backend:
//!
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (4 bytes)│POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "CRLY"              u32                postcard::to_allocvec(T)
//! ```
//!
//! Readers validate magic and schema version before decoding. A mismatch is
//! never migrated: the store evicts the entry and reports a miss, so the next
//! successful origin fetch rewrites it.
//!
//! ```rust
//! use cache_relay::serialization::{serialize_for_cache, deserialize_from_cache};
//!
//! # fn main() -> cache_relay::Result<()> {
//! let bytes = serialize_for_cache(&(200u16, "hello".to_string()))?;
//! let (status, body): (u16, String) = deserialize_from_cache(&bytes)?;
//! assert_eq!(status, 200);
//! assert_eq!(body, "hello");
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Magic header for relay entries: b"CRLY"
pub const CACHE_MAGIC: [u8; 4] = *b"CRLY";

/// Current schema version.
///
/// Bump when the layout of [`crate::entry::CacheEntry`] changes. Entries
/// written under another version are evicted on read.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope for stored entries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    /// Magic header: must be b"CRLY"
    pub magic: [u8; 4],
    /// Schema version: must match CURRENT_SCHEMA_VERSION
    pub version: u32,
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    /// Create a new envelope with current magic and version.
    pub fn new(payload: T) -> Self {
        Self {
            magic: CACHE_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Serialize a value with envelope for storage.
///
/// # Errors
///
/// Returns `Error::SerializationError` if Postcard serialization fails.
pub fn serialize_for_cache<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let envelope = CacheEnvelope::new(value);
    postcard::to_allocvec(&envelope).map_err(|e| {
        error!("Entry serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Deserialize a value from storage, validating magic and schema version.
///
/// # Errors
///
/// - `Error::DeserializationError`: Corrupted Postcard payload
/// - `Error::InvalidCacheEntry`: Invalid magic header
/// - `Error::VersionMismatch`: Schema version mismatch
pub fn deserialize_from_cache<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T> {
    let envelope: CacheEnvelope<T> = postcard::from_bytes(bytes).map_err(|e| {
        error!("Entry deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })?;

    if envelope.magic != CACHE_MAGIC {
        warn!(
            "Invalid cache entry: expected magic {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        )));
    }

    if envelope.version != CURRENT_SCHEMA_VERSION {
        warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION, envelope.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: envelope.version,
        });
    }

    Ok(envelope.payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
    struct StoredPage {
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    fn page() -> StoredPage {
        StoredPage {
            status: 200,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: b"<h1>offline</h1>".to_vec(),
        }
    }

    #[test]
    fn test_roundtrip() {
        let bytes = serialize_for_cache(&page()).unwrap();
        let decoded: StoredPage = deserialize_from_cache(&bytes).unwrap();
        assert_eq!(decoded, page());
    }

    #[test]
    fn test_envelope_structure() {
        let bytes = serialize_for_cache(&page()).unwrap();

        // postcard uses variable-length encoding, so decode the envelope instead
        // of reading fixed offsets
        let envelope: CacheEnvelope<StoredPage> = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.magic, CACHE_MAGIC);
        assert_eq!(envelope.version, CURRENT_SCHEMA_VERSION);
        assert_eq!(envelope.payload, page());
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let mut envelope = CacheEnvelope::new(page());
        envelope.magic = *b"CKIT";
        let bytes = postcard::to_allocvec(&envelope).unwrap();

        match deserialize_from_cache::<StoredPage>(&bytes) {
            Err(Error::InvalidCacheEntry(_)) => {}
            other => panic!("Expected InvalidCacheEntry, got {:?}", other),
        }
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut envelope = CacheEnvelope::new(page());
        envelope.version = 999;
        let bytes = postcard::to_allocvec(&envelope).unwrap();

        match deserialize_from_cache::<StoredPage>(&bytes) {
            Err(Error::VersionMismatch { expected, found }) => {
                assert_eq!(expected, CURRENT_SCHEMA_VERSION);
                assert_eq!(found, 999);
            }
            other => panic!("Expected VersionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let mut bytes = serialize_for_cache(&page()).unwrap();
        let len = bytes.len();
        bytes.truncate(len / 2);

        match deserialize_from_cache::<StoredPage>(&bytes) {
            Err(Error::DeserializationError(_)) => {}
            other => panic!("Expected DeserializationError, got {:?}", other),
        }
    }
}
