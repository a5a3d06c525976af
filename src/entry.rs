//! Stored response entries.

use crate::error::{Error, Result};
use crate::response::Response;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One stored response, keyed in the store by its request key.
///
/// Only status 200 responses can become entries; there is no way to build
/// one from an error response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Insertion time, milliseconds since the Unix epoch.
    pub inserted_at_ms: u64,
}

impl CacheEntry {
    /// Capture a successful response for storage.
    ///
    /// # Errors
    ///
    /// Returns `Error::Uncacheable` for any status other than 200.
    pub fn from_response(response: &Response) -> Result<Self> {
        if !response.is_ok() {
            return Err(Error::Uncacheable(response.status));
        }
        Ok(CacheEntry {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            inserted_at_ms: now_ms(),
        })
    }

    pub fn inserted_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.inserted_at_ms)
    }

    pub fn serialize_for_cache(&self) -> Result<Vec<u8>> {
        crate::serialization::serialize_for_cache(self)
    }

    pub fn deserialize_from_cache(bytes: &[u8]) -> Result<Self> {
        crate::serialization::deserialize_from_cache(bytes)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
