//! Cache-First with background refresh (stale-while-revalidate).

use super::{ExecutorContext, RefreshHandle, RefreshTracker, ResponseSource, Served};
use crate::backend::CacheBackend;
use crate::key::RequestKey;
use crate::observability::Fallback;
use crate::origin::Origin;
use crate::request::Request;
use crate::response::Response;
use crate::strategy::RequestClass;
use std::time::Instant;

/// Serves stored entries immediately and refreshes them in the background.
///
/// A stored entry is at most one successful refresh behind the origin: every
/// hit schedules a refresh, and the next hit after it completes sees the new
/// body.
pub struct CacheFirst<B: CacheBackend, O: Origin> {
    ctx: ExecutorContext<B, O>,
    refreshes: RefreshTracker,
}

impl<B: CacheBackend, O: Origin> CacheFirst<B, O> {
    pub fn new(ctx: ExecutorContext<B, O>) -> Self {
        CacheFirst {
            ctx,
            refreshes: RefreshTracker::new(),
        }
    }

    pub fn refreshes(&self) -> &RefreshTracker {
        &self.refreshes
    }

    pub async fn serve(&self, generation: &str, request: &Request) -> Served {
        let key = RequestKey::from_request(request);
        let start = Instant::now();

        if let Some(entry) = self.ctx.lookup(generation, &key).await {
            self.ctx
                .metrics
                .record_hit(key.as_str(), RequestClass::Static, start.elapsed());
            let refresh = self.spawn_refresh(generation, request, key);
            return Served::new(Response::from_entry(&entry), ResponseSource::Cache)
                .with_refresh(refresh);
        }

        self.ctx
            .metrics
            .record_miss(key.as_str(), RequestClass::Static, start.elapsed());

        match self.ctx.fetch(request, &key).await {
            Ok(response) if response.is_ok() => {
                self.ctx.store_response(generation, &key, &response).await;
                Served::new(response, ResponseSource::Network)
            }
            Ok(response) => {
                debug!("✗ Origin answered {} for {}, nothing stored", response.status, key);
                self.ctx.metrics.record_fallback(key.as_str(), Fallback::Synthesized);
                Served::unavailable()
            }
            Err(e) => {
                self.ctx.metrics.record_error(key.as_str(), &e.to_string());
                self.ctx.metrics.record_fallback(key.as_str(), Fallback::Synthesized);
                Served::unavailable()
            }
        }
    }

    fn spawn_refresh(
        &self,
        generation: &str,
        request: &Request,
        key: RequestKey,
    ) -> RefreshHandle {
        let ctx = self.ctx.clone();
        let generation = generation.to_string();
        let request = request.clone();
        self.refreshes
            .spawn(async move { ctx.refresh(&generation, &request, &key).await })
    }
}
