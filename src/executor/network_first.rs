//! Network-First with cache fallback.

use super::{ExecutorContext, ResponseSource, Served};
use crate::backend::CacheBackend;
use crate::key::RequestKey;
use crate::observability::Fallback;
use crate::origin::Origin;
use crate::request::{Method, Request};
use crate::response::Response;
use crate::strategy::RequestClass;
use std::time::Instant;
use url::Url;

/// Prefers the origin; falls back to stored data only when it is unreachable.
///
/// An origin that answers at all, even with a 404 or 500, is authoritative:
/// its response is returned as-is and only a 200 is stored.
pub struct NetworkFirst<B: CacheBackend, O: Origin> {
    ctx: ExecutorContext<B, O>,
    offline_key: RequestKey,
}

impl<B: CacheBackend, O: Origin> NetworkFirst<B, O> {
    /// `offline_url` names the precached document served to navigations
    /// when both origin and store come up empty.
    pub fn new(ctx: ExecutorContext<B, O>, offline_url: Url) -> Self {
        NetworkFirst {
            ctx,
            offline_key: RequestKey::new(&Method::Get, &offline_url),
        }
    }

    pub async fn serve(&self, generation: &str, request: &Request, class: RequestClass) -> Served {
        let key = RequestKey::from_request(request);

        let error = match self.ctx.fetch(request, &key).await {
            Ok(response) => {
                if response.is_ok() {
                    self.ctx.store_response(generation, &key, &response).await;
                } else {
                    debug!("Origin answered {} for {}, not stored", response.status, key);
                }
                return Served::new(response, ResponseSource::Network);
            }
            Err(e) => e,
        };

        self.ctx.metrics.record_error(key.as_str(), &error.to_string());

        let start = Instant::now();
        if let Some(entry) = self.ctx.lookup(generation, &key).await {
            self.ctx.metrics.record_hit(key.as_str(), class, start.elapsed());
            self.ctx.metrics.record_fallback(key.as_str(), Fallback::Cache);
            return Served::new(Response::from_entry(&entry), ResponseSource::Cache);
        }
        self.ctx.metrics.record_miss(key.as_str(), class, start.elapsed());

        if class == RequestClass::Document {
            if let Some(entry) = self.ctx.lookup(generation, &self.offline_key).await {
                self.ctx
                    .metrics
                    .record_fallback(key.as_str(), Fallback::OfflineSubstitute);
                return Served::new(
                    Response::from_entry(&entry),
                    ResponseSource::OfflineSubstitute,
                );
            }
            warn!("Offline substitute {} missing from {}", self.offline_key, generation);
        }

        self.ctx.metrics.record_fallback(key.as_str(), Fallback::Synthesized);
        Served::unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::entry::CacheEntry;
    use crate::observability::NoOpMetrics;
    use crate::origin::InMemoryOrigin;
    use crate::store::CacheStore;
    use std::sync::Arc;

    const GEN: &str = "app-v1.0.0";
    const OFFLINE: &str = "https://example.com/offline.html";

    type Executor = NetworkFirst<InMemoryBackend, InMemoryOrigin>;

    fn executor(origin: &InMemoryOrigin) -> (Executor, CacheStore<InMemoryBackend>) {
        let store = CacheStore::new(InMemoryBackend::new());
        store.open(GEN);
        let ctx = ExecutorContext::new(
            store.clone(),
            Arc::new(origin.clone()),
            Arc::new(NoOpMetrics),
        );
        let offline = Url::parse(OFFLINE).expect("Failed to parse URL");
        (NetworkFirst::new(ctx, offline), store)
    }

    async fn precache_offline(store: &CacheStore<InMemoryBackend>) {
        let key = RequestKey::from_request(&Request::get(OFFLINE).expect("Failed to build request"));
        let entry = CacheEntry::from_response(&Response::ok("you are offline"))
            .expect("Failed to build entry");
        store.put(GEN, &key, &entry).await.expect("Failed to put");
    }

    #[tokio::test]
    async fn test_online_returns_fresh_and_stores() {
        let origin = InMemoryOrigin::new();
        origin.insert("https://example.com/api/items", Response::ok("[1]"));
        let (executor, store) = executor(&origin);
        let request = Request::get("https://example.com/api/items").expect("Failed to build request");

        let served = executor.serve(GEN, &request, RequestClass::Dynamic).await;
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.text(), "[1]");
        assert_eq!(store.entry_count(GEN).await.expect("count"), 1);

        origin.insert("https://example.com/api/items", Response::ok("[1,2]"));
        let served = executor.serve(GEN, &request, RequestClass::Dynamic).await;
        assert_eq!(served.response.text(), "[1,2]");
    }

    #[tokio::test]
    async fn test_error_status_passed_through_not_stored() {
        let origin = InMemoryOrigin::new();
        let (executor, store) = executor(&origin);
        let request = Request::get("https://example.com/api/missing").expect("Failed to build request");

        let served = executor.serve(GEN, &request, RequestClass::Dynamic).await;
        assert_eq!(served.response.status, 404);
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(store.entry_count(GEN).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_offline_falls_back_to_stored_entry() {
        let origin = InMemoryOrigin::new();
        origin.insert("https://example.com/api/items", Response::ok("[1]"));
        let (executor, _store) = executor(&origin);
        let request = Request::get("https://example.com/api/items").expect("Failed to build request");
        executor.serve(GEN, &request, RequestClass::Dynamic).await;

        origin.set_offline(true);
        let served = executor.serve(GEN, &request, RequestClass::Dynamic).await;
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.text(), "[1]");
    }

    #[tokio::test]
    async fn test_offline_document_gets_substitute() {
        let origin = InMemoryOrigin::new();
        origin.set_offline(true);
        let (executor, store) = executor(&origin);
        precache_offline(&store).await;

        let request = Request::navigate("https://example.com/never-seen").expect("Failed to build request");
        let served = executor.serve(GEN, &request, RequestClass::Document).await;
        assert_eq!(served.source, ResponseSource::OfflineSubstitute);
        assert_eq!(served.response.text(), "you are offline");
    }

    #[tokio::test]
    async fn test_offline_dynamic_never_gets_substitute() {
        let origin = InMemoryOrigin::new();
        origin.set_offline(true);
        let (executor, store) = executor(&origin);
        precache_offline(&store).await;

        let request = Request::get("https://example.com/api/items").expect("Failed to build request");
        let served = executor.serve(GEN, &request, RequestClass::Dynamic).await;
        assert_eq!(served.source, ResponseSource::Synthesized);
        assert_eq!(served.response.status, 503);
    }

    #[tokio::test]
    async fn test_offline_document_without_substitute_is_synthesized() {
        let origin = InMemoryOrigin::new();
        origin.set_offline(true);
        let (executor, _store) = executor(&origin);

        let request = Request::navigate("https://example.com/").expect("Failed to build request");
        let served = executor.serve(GEN, &request, RequestClass::Document).await;
        assert_eq!(served.response.status, 503);
    }
}
