//! # cache-relay
//!
//! A request-interception cache layer for offline-capable web applications.
//!
//! ## Features
//!
//! - **Versioned generations:** Each release caches into its own `"<app>-v<semver>"`
//!   generation; activation promotes it and purges the rest
//! - **Per-class strategies:** Network-First for documents and API calls,
//!   Cache-First with background refresh for static assets
//! - **Offline fallback:** Stored entry, then offline substitute, then a 503
//! - **Backend agnostic:** Any [`CacheBackend`]; in-memory included
//! - **Origin agnostic:** Any [`Origin`]; scripted in-memory and (with the
//!   `http` feature) reqwest-based origins included
//! - **Observable:** `log` output and [`RelayMetrics`] hooks
//!
//! ## Quick Start
//!
//! ```ignore
//! use cache_relay::{
//!     backend::InMemoryBackend, origin::InMemoryOrigin,
//!     CacheStore, LifecycleController, RelayConfig, Request,
//! };
//!
//! // 1. Configure the instance
//! let config = RelayConfig::default()
//!     .with_app_id("shop")
//!     .with_version("1.4.0")
//!     .with_scope("https://shop.example.com/")
//!     .with_precache(["/", "/app.js", "/offline.html"]);
//!
//! // 2. Create the controller over a store and an origin
//! let relay = LifecycleController::new(config, CacheStore::new(InMemoryBackend::new()), origin)?;
//!
//! // 3. Install (populate) and activate (promote + purge)
//! relay.install().await?;
//! relay.activate().await?;
//!
//! // 4. Intercept requests
//! let served = relay.fetch(&Request::get("https://shop.example.com/app.js")?).await;
//! println!("{} via {:?}", served.response.status, served.source);
//! ```
//!
//! ### Event-driven embedding
//!
//! Use [`Worker`] to drive a controller from an event queue:
//!
//! ```ignore
//! let handle = Worker::spawn(Arc::new(relay), WorkerOptions::default());
//! handle.install().await?;
//! let reply = handle.post_json(r#"{"type":"get-version"}"#).await;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod config;
pub mod control;
pub mod entry;
pub mod error;
pub mod executor;
pub mod generation;
pub mod key;
pub mod lifecycle;
pub mod observability;
pub mod origin;
pub mod request;
pub mod response;
pub mod serialization;
pub mod store;
pub mod strategy;
pub mod worker;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use config::RelayConfig;
pub use control::{ControlMessage, ControlReply};
pub use entry::CacheEntry;
pub use error::{Error, Result};
pub use executor::{ResponseSource, Served};
pub use generation::{GenerationManager, GenerationName};
pub use key::RequestKey;
pub use lifecycle::{LifecycleController, LifecycleHandler, LifecycleState};
pub use observability::RelayMetrics;
pub use origin::Origin;
pub use request::{Method, Request, RequestMode};
pub use response::Response;
pub use store::CacheStore;
pub use strategy::{RequestClass, Strategy};
pub use worker::{Worker, WorkerHandle, WorkerOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
