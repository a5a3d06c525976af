//! Request classification and strategy dispatch.
//!
//! Every intercepted request gets exactly one [`RequestClass`], computed from
//! its method, URL path, query presence and navigation mode. The class picks
//! the serving [`Strategy`]:
//!
//! | Class | Matches | Strategy | Last resort |
//! |-------|---------|----------|-------------|
//! | **Document** | top-level navigation | Network-First | offline substitute, then 503 |
//! | **Dynamic** | API-prefix path or non-empty query | Network-First | 503 |
//! | **Static** | everything else | Cache-First | 503 |
//!
//! Documents and parameterized responses must reflect the latest origin state
//! whenever the origin is reachable. Static assets tolerate staleness and
//! benefit from instant hits with a background refresh.
//!
//! Requests that are not intercepted at all ([`Route::Passthrough`]) go
//! straight to the origin with no cache access:
//!
//! ```text
//! request ─┬─ other origin ─────────────► Passthrough(CrossOrigin)
//!          ├─ method != GET ────────────► Passthrough(Method)
//!          └─ same origin GET ─┬─ navigate ──────────► Document
//!                              ├─ /api/… or ?query ──► Dynamic
//!                              └─ else ──────────────► Static
//! ```

use crate::backend::CacheBackend;
use crate::executor::{CacheFirst, ExecutorContext, NetworkFirst, RefreshTracker, Served};
use crate::origin::Origin;
use crate::request::{Method, Request};
use std::fmt;
use url::Url;

/// Handling class of an intercepted request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestClass {
    /// Top-level navigable document.
    Document,
    /// Parameterized or API response.
    Dynamic,
    /// Scripts, styles, images and other assets.
    Static,
}

impl RequestClass {
    /// Serving strategy for this class.
    pub fn strategy(self) -> Strategy {
        match self {
            RequestClass::Document | RequestClass::Dynamic => Strategy::NetworkFirst,
            RequestClass::Static => Strategy::CacheFirst,
        }
    }
}

impl fmt::Display for RequestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestClass::Document => write!(f, "document"),
            RequestClass::Dynamic => write!(f, "dynamic"),
            RequestClass::Static => write!(f, "static"),
        }
    }
}

/// Serving strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// **CacheFirst**: Serve the stored entry, refresh it in the background.
    ///
    /// Flow:
    /// 1. Check store
    /// 2. If hit: return stored response, spawn refresh
    /// 3. If miss: fetch origin, store a 200, return it
    /// 4. If origin fails: synthesized 503
    CacheFirst,

    /// **NetworkFirst**: Prefer the origin, fall back to the store.
    ///
    /// Flow:
    /// 1. Fetch origin
    /// 2. If reachable: store a 200, return the response whatever its status
    /// 3. If unreachable: stored entry, then offline substitute (documents), then 503
    NetworkFirst,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::CacheFirst => write!(f, "CacheFirst"),
            Strategy::NetworkFirst => write!(f, "NetworkFirst"),
        }
    }
}

/// Why a request is not intercepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassReason {
    /// Target origin differs from the relay's scope.
    CrossOrigin,
    /// Only GET requests are cached.
    Method,
    /// The relay is not active yet.
    NotActive,
}

/// Routing decision for one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Passthrough(PassReason),
    Intercept(RequestClass),
}

/// Classify a same-origin GET request.
///
/// First match wins: navigation, then API prefix or query string, then static.
/// Pure: never consults the store.
pub fn classify(request: &Request, api_prefixes: &[String]) -> RequestClass {
    if request.is_navigation() {
        return RequestClass::Document;
    }
    let path = request.url().path();
    if request.has_query() || api_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
        return RequestClass::Dynamic;
    }
    RequestClass::Static
}

/// Routes requests and dispatches intercepted ones to their executor.
pub struct StrategySelector<B: CacheBackend, O: Origin> {
    scope: Url,
    api_prefixes: Vec<String>,
    ctx: ExecutorContext<B, O>,
    cache_first: CacheFirst<B, O>,
    network_first: NetworkFirst<B, O>,
}

impl<B: CacheBackend, O: Origin> StrategySelector<B, O> {
    pub fn new(
        ctx: ExecutorContext<B, O>,
        scope: Url,
        api_prefixes: Vec<String>,
        offline_url: Url,
    ) -> Self {
        StrategySelector {
            scope,
            api_prefixes,
            cache_first: CacheFirst::new(ctx.clone()),
            network_first: NetworkFirst::new(ctx.clone(), offline_url),
            ctx,
        }
    }

    /// Decide whether and how a request is intercepted.
    pub fn route(&self, request: &Request) -> Route {
        if !request.is_same_origin(&self.scope) {
            return Route::Passthrough(PassReason::CrossOrigin);
        }
        if *request.method() != Method::Get {
            return Route::Passthrough(PassReason::Method);
        }
        Route::Intercept(classify(request, &self.api_prefixes))
    }

    /// Serve a request against `generation`.
    pub async fn serve(&self, generation: &str, request: &Request) -> Served {
        match self.route(request) {
            Route::Passthrough(reason) => {
                debug!("» Passthrough {} ({:?})", request.url(), reason);
                self.passthrough(request).await
            }
            Route::Intercept(class) => {
                debug!(
                    "» Intercept {} as {} (strategy: {})",
                    request.url(),
                    class,
                    class.strategy()
                );
                match class.strategy() {
                    Strategy::CacheFirst => self.cache_first.serve(generation, request).await,
                    Strategy::NetworkFirst => {
                        self.network_first.serve(generation, request, class).await
                    }
                }
            }
        }
    }

    /// Forward to the origin with no cache access.
    pub async fn passthrough(&self, request: &Request) -> Served {
        self.ctx.passthrough(request).await
    }

    /// Tracker of the background refreshes spawned by Cache-First.
    pub fn refreshes(&self) -> &RefreshTracker {
        self.cache_first.refreshes()
    }
}
