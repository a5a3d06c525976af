//! Strategy executors.
//!
//! [`CacheFirst`] and [`NetworkFirst`] each answer a request against one
//! generation. Neither ever returns an error to the caller: every failure
//! path ends in some [`Response`], worst case the synthesized 503.

pub mod cache_first;
pub mod network_first;
pub mod refresh;

pub use cache_first::CacheFirst;
pub use network_first::NetworkFirst;
pub use refresh::{RefreshHandle, RefreshOutcome, RefreshTracker};

use crate::backend::CacheBackend;
use crate::entry::CacheEntry;
use crate::error::Result;
use crate::key::RequestKey;
use crate::observability::{Fallback, RelayMetrics};
use crate::origin::Origin;
use crate::request::Request;
use crate::response::Response;
use crate::store::CacheStore;
use std::sync::Arc;
use std::time::Instant;

/// Where a served response came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    OfflineSubstitute,
    Synthesized,
    Passthrough,
}

/// A response plus how it was obtained.
#[derive(Debug)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
    /// Set when serving a stored entry spawned a background refresh.
    pub refresh: Option<RefreshHandle>,
}

impl Served {
    pub fn new(response: Response, source: ResponseSource) -> Self {
        Served {
            response,
            source,
            refresh: None,
        }
    }

    pub fn with_refresh(mut self, refresh: RefreshHandle) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// The synthesized 503 "Service Unavailable" answer.
    pub fn unavailable() -> Self {
        Served::new(Response::unavailable(), ResponseSource::Synthesized)
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Shared collaborators of both executors.
pub struct ExecutorContext<B: CacheBackend, O: Origin> {
    pub(crate) store: CacheStore<B>,
    pub(crate) origin: Arc<O>,
    pub(crate) metrics: Arc<dyn RelayMetrics>,
}

impl<B: CacheBackend, O: Origin> Clone for ExecutorContext<B, O> {
    fn clone(&self) -> Self {
        ExecutorContext {
            store: self.store.clone(),
            origin: self.origin.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<B: CacheBackend, O: Origin> ExecutorContext<B, O> {
    pub fn new(store: CacheStore<B>, origin: Arc<O>, metrics: Arc<dyn RelayMetrics>) -> Self {
        ExecutorContext {
            store,
            origin,
            metrics,
        }
    }

    /// Fetch from the origin, recording status and latency of any response.
    pub(crate) async fn fetch(&self, request: &Request, key: &RequestKey) -> Result<Response> {
        let start = Instant::now();
        let result = self.origin.fetch(request).await;
        match &result {
            Ok(response) => {
                self.metrics
                    .record_origin(key.as_str(), response.status, start.elapsed());
            }
            Err(e) => debug!("✗ Origin unreachable for {}: {}", key, e),
        }
        result
    }

    /// Look up `key`, treating any store failure as a miss.
    pub(crate) async fn lookup(&self, generation: &str, key: &RequestKey) -> Option<CacheEntry> {
        match self.store.get(generation, key).await {
            Ok(entry) => entry,
            Err(e) => {
                self.metrics.record_error(key.as_str(), &e.to_string());
                None
            }
        }
    }

    /// Store a 200 response. Returns whether it was written.
    ///
    /// Non-200 responses and store failures (including a generation deleted
    /// mid-flight) are absorbed.
    pub(crate) async fn store_response(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &Response,
    ) -> bool {
        let entry = match CacheEntry::from_response(response) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Not storing {}: {}", key, e);
                return false;
            }
        };
        match self.store.put(generation, key, &entry).await {
            Ok(()) => {
                debug!("✓ Stored {} in {}", key, generation);
                true
            }
            Err(e) => {
                self.metrics.record_error(key.as_str(), &e.to_string());
                false
            }
        }
    }

    /// Re-fetch `key` and replace its entry on a fresh 200.
    pub(crate) async fn refresh(
        &self,
        generation: &str,
        request: &Request,
        key: &RequestKey,
    ) -> RefreshOutcome {
        let outcome = match self.fetch(request, key).await {
            Ok(response) if response.is_ok() => {
                if self.store_response(generation, key, &response).await {
                    RefreshOutcome::Updated
                } else {
                    RefreshOutcome::Unchanged("store rejected the entry".to_string())
                }
            }
            Ok(response) => RefreshOutcome::Unchanged(format!("origin answered {}", response.status)),
            Err(e) => RefreshOutcome::Unchanged(e.to_string()),
        };
        self.metrics.record_refresh(key.as_str(), outcome.is_updated());
        outcome
    }

    /// Forward to the origin with no cache access.
    pub(crate) async fn passthrough(&self, request: &Request) -> Served {
        let key = RequestKey::from_request(request);
        match self.fetch(request, &key).await {
            Ok(response) => Served::new(response, ResponseSource::Passthrough),
            Err(e) => {
                self.metrics.record_error(key.as_str(), &e.to_string());
                self.metrics.record_fallback(key.as_str(), Fallback::Synthesized);
                Served::unavailable()
            }
        }
    }
}
