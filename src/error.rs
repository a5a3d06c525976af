//! Error types for the relay.

use std::fmt;

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the relay.
///
/// Most of these never reach the original requester: the executors absorb
/// origin and store failures and always answer with a response. Errors are
/// surfaced to the embedding runtime only from lifecycle transitions,
/// configuration and direct store access.
#[derive(Debug, Clone)]
pub enum Error {
    /// One or more resources could not be fetched while populating a generation.
    ///
    /// Fatal to the install attempt, harmless to the running system: the
    /// previously current generation stays authoritative.
    Population {
        /// Generation that was being populated
        generation: String,
        /// URLs that failed, with the reason appended
        failed: Vec<String>,
    },

    /// The origin could not be reached for a single request.
    ///
    /// Recovered locally by the executors (cache, offline substitute or the
    /// synthesized 503 response). Never propagated to the requester.
    OriginUnreachable(String),

    /// A control message type that the controller does not understand.
    ///
    /// The reply channel receives a failure reply; lifecycle state is unaffected.
    UnknownControlMessage(String),

    /// A lifecycle operation was requested in a state that does not allow it.
    InvalidState(String),

    /// The named generation does not exist in the store.
    ///
    /// Only the generation manager opens generations; writes that target a
    /// deleted or never-opened generation are rejected with this variant.
    GenerationNotFound(String),

    /// Attempted to build a cache entry from a non-200 response.
    Uncacheable(u16),

    /// Request could not be built (bad URL, unsupported method, ...).
    InvalidRequest(String),

    /// Configuration is missing or inconsistent.
    ///
    /// **Recovery:** Fix configuration and restart.
    ConfigError(String),

    /// Backend storage error.
    BackendError(String),

    /// Serialization failed when converting an entry to cache bytes.
    SerializationError(String),

    /// Deserialization failed when converting cache bytes to an entry.
    ///
    /// **Recovery:** The entry is evicted and treated as a miss.
    DeserializationError(String),

    /// Invalid cache entry: bad magic in the envelope.
    InvalidCacheEntry(String),

    /// Schema version mismatch between code and cached data.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from cached entry)
        found: u32,
    },
}

impl Error {
    /// True for errors that mean the stored bytes are unreadable and should be evicted.
    pub fn is_corrupt_entry(&self) -> bool {
        matches!(
            self,
            Error::DeserializationError(_)
                | Error::InvalidCacheEntry(_)
                | Error::VersionMismatch { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Population { generation, failed } => write!(
                f,
                "Population of {} failed for {} resource(s): {}",
                generation,
                failed.len(),
                failed.join(", ")
            ),
            Error::OriginUnreachable(msg) => write!(f, "Origin unreachable: {}", msg),
            Error::UnknownControlMessage(kind) => {
                write!(f, "Unknown control message: {}", kind)
            }
            Error::InvalidState(msg) => write!(f, "Invalid lifecycle state: {}", msg),
            Error::GenerationNotFound(name) => write!(f, "Generation not found: {}", name),
            Error::Uncacheable(status) => {
                write!(f, "Response with status {} cannot be cached", status)
            }
            Error::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else {
            Error::DeserializationError(e.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidRequest(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Population {
            generation: "app-v2.0.0".to_string(),
            failed: vec!["https://example.com/a.html (status 500)".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Population of app-v2.0.0 failed for 1 resource(s): https://example.com/a.html (status 500)"
        );
    }

    #[test]
    fn test_error_from_url_parse() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_corrupt_entry_classification() {
        assert!(Error::InvalidCacheEntry("bad magic".to_string()).is_corrupt_entry());
        assert!(Error::VersionMismatch {
            expected: 1,
            found: 2
        }
        .is_corrupt_entry());
        assert!(!Error::BackendError("down".to_string()).is_corrupt_entry());
    }
}
