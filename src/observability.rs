//! Observability hooks for relay decisions.
//!
//! Implement [`RelayMetrics`] to feed hits, misses, fallbacks and refresh
//! outcomes into a monitoring system:
//!
//! ```ignore
//! use cache_relay::observability::{Fallback, RelayMetrics};
//! use cache_relay::strategy::RequestClass;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl RelayMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _key: &str, _class: RequestClass, _duration: Duration) {
//!         // counter!("relay_hits").increment(1);
//!     }
//!     fn record_fallback(&self, _key: &str, _fallback: Fallback) {
//!         // counter!("relay_fallbacks").increment(1);
//!     }
//! }
//! ```
//!
//! Every method has a default that logs through the `log` crate, so an
//! implementation only overrides what it cares about. [`NoOpMetrics`]
//! discards everything and is what the controller uses unless told otherwise.

use crate::strategy::RequestClass;
use std::fmt;
use std::time::Duration;

/// What answered a request after the origin could not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    /// Previously stored entry
    Cache,
    /// Offline substitute document
    OfflineSubstitute,
    /// Synthesized 503 response
    Synthesized,
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Cache => write!(f, "cache"),
            Fallback::OfflineSubstitute => write!(f, "offline-substitute"),
            Fallback::Synthesized => write!(f, "synthesized"),
        }
    }
}

/// Trait for relay metrics collection.
pub trait RelayMetrics: Send + Sync {
    /// Record a store hit.
    fn record_hit(&self, key: &str, class: RequestClass, duration: Duration) {
        debug!("Relay HIT ({}): {} took {:?}", class, key, duration);
    }

    /// Record a store miss.
    fn record_miss(&self, key: &str, class: RequestClass, duration: Duration) {
        debug!("Relay MISS ({}): {} took {:?}", class, key, duration);
    }

    /// Record an origin response.
    fn record_origin(&self, key: &str, status: u16, duration: Duration) {
        debug!("Relay ORIGIN: {} -> {} took {:?}", key, status, duration);
    }

    /// Record a fallback after an origin failure.
    fn record_fallback(&self, key: &str, fallback: Fallback) {
        debug!("Relay FALLBACK: {} -> {}", key, fallback);
    }

    /// Record the outcome of a background refresh.
    fn record_refresh(&self, key: &str, updated: bool) {
        debug!("Relay REFRESH: {} updated={}", key, updated);
    }

    /// Record an absorbed error.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Relay ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl RelayMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _class: RequestClass, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _class: RequestClass, _duration: Duration) {}
    fn record_origin(&self, _key: &str, _status: u16, _duration: Duration) {}
    fn record_fallback(&self, _key: &str, _fallback: Fallback) {}
    fn record_refresh(&self, _key: &str, _updated: bool) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// Logs every event at the trait's default levels.
#[derive(Clone, Default)]
pub struct LogMetrics;

impl RelayMetrics for LogMetrics {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_metrics() {
        let metrics = NoOpMetrics;
        metrics.record_hit("key", RequestClass::Static, Duration::from_millis(1));
        metrics.record_fallback("key", Fallback::Synthesized);
    }

    #[test]
    fn test_log_metrics_defaults() {
        let metrics = LogMetrics;
        metrics.record_miss("key", RequestClass::Document, Duration::from_millis(2));
        metrics.record_refresh("key", false);
        metrics.record_error("key", "boom");
    }

    #[test]
    fn test_fallback_display() {
        assert_eq!(Fallback::Cache.to_string(), "cache");
        assert_eq!(Fallback::OfflineSubstitute.to_string(), "offline-substitute");
        assert_eq!(Fallback::Synthesized.to_string(), "synthesized");
    }
}
