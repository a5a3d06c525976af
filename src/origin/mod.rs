//! Origin resource providers.
//!
//! The [`Origin`] trait decouples the relay from the transport that reaches
//! the real resource provider. Any non-network outcome is an `Ok(Response)`,
//! whatever its status; only a failure to obtain a response at all is an
//! `Err(Error::OriginUnreachable)`.
//!
//! [`InMemoryOrigin`] is a scripted origin for tests and embedding demos.
//! With the `http` feature, [`HttpOrigin`] reaches a real server over reqwest.

use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{HttpOrigin, HttpOriginConfig};

/// Trait for origin implementations.
///
/// Returned futures must be `Send`: background refreshes run on spawned tasks.
pub trait Origin: Send + Sync + 'static {
    /// Fetch a response for `request`.
    ///
    /// # Errors
    ///
    /// Returns `Error::OriginUnreachable` when no response could be obtained
    /// (connection refused, DNS failure, transport timeout, ...).
    fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}

// ============================================================================
// In-Memory Origin
// ============================================================================

/// Scripted origin keyed by absolute URL (query string included).
///
/// Unknown URLs answer 404. Individual URLs can be made unreachable with
/// [`InMemoryOrigin::fail`], or the whole origin with
/// [`InMemoryOrigin::set_offline`]. Clones share state, so a test can keep a
/// handle and re-script the origin while the relay owns another.
///
/// ```ignore
/// let origin = InMemoryOrigin::new();
/// origin.insert("https://example.com/app.js", Response::ok("console.log(1)"));
/// origin.set_offline(true);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryOrigin {
    routes: Arc<DashMap<String, Response>>,
    failing: Arc<DashMap<String, String>>,
    hits: Arc<DashMap<String, usize>>,
    offline: Arc<AtomicBool>,
    latency: Option<Duration>,
}

impl InMemoryOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Serve `response` for `url`, replacing any previous script and clearing
    /// a failure set with [`InMemoryOrigin::fail`].
    pub fn insert(&self, url: &str, response: Response) {
        self.failing.remove(url);
        self.routes.insert(url.to_string(), response);
    }

    /// Make `url` unreachable.
    pub fn fail(&self, url: &str, reason: &str) {
        self.failing.insert(url.to_string(), reason.to_string());
    }

    /// Toggle whole-origin reachability.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of fetches received for `url`, including failed ones.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.hits.get(url).map(|count| *count).unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.hits.iter().map(|entry| *entry.value()).sum()
    }
}

impl Origin for InMemoryOrigin {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let url = request.url().as_str();
        *self.hits.entry(url.to_string()).or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::OriginUnreachable(format!("{}: origin offline", url)));
        }
        if let Some(reason) = self.failing.get(url) {
            return Err(Error::OriginUnreachable(format!("{}: {}", url, reason.value())));
        }

        Ok(self
            .routes
            .get(url)
            .map(|response| response.value().clone())
            .unwrap_or_else(|| Response::new(404, "Not Found")))
    }
}
