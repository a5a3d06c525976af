//! Lifecycle controller.
//!
//! Drives one relay instance through
//!
//! ```text
//! Uninstalled ─install─► Installing ─ok─► Installed ─activate─► Activating ─ok─► Active
//!                            │                                      │
//!                            └──────────── err ──► Failed ◄── err ──┘
//! ```
//!
//! and answers fetches and control messages in every state. Only an `Active`
//! instance routes requests through the [`StrategySelector`]; in any other
//! state requests pass straight through to the origin.
//!
//! Install, activate, `skip-wait`, `clear-cache` and `update-cache` hold the
//! transition lock of the [`CacheStore`], shared by every instance on it.
//!
//! # Example
//!
//! ```ignore
//! use cache_relay::{LifecycleController, RelayConfig, CacheStore};
//! use cache_relay::backend::InMemoryBackend;
//! use cache_relay::origin::InMemoryOrigin;
//!
//! let controller = LifecycleController::new(
//!     RelayConfig::default().with_scope("https://example.com/"),
//!     CacheStore::new(InMemoryBackend::new()),
//!     InMemoryOrigin::new(),
//! )?;
//! controller.install().await?;
//! controller.activate().await?;
//! let response = controller.fetch(&Request::get("https://example.com/app.js")?).await;
//! ```

use crate::backend::CacheBackend;
use crate::config::RelayConfig;
use crate::control::{ControlMessage, ControlReply};
use crate::error::{Error, Result};
use crate::executor::{ExecutorContext, Served};
use crate::generation::{GenerationManager, GenerationName, PopulateReport};
use crate::observability::{NoOpMetrics, RelayMetrics};
use crate::origin::Origin;
use crate::request::Request;
use crate::response::Response;
use crate::store::CacheStore;
use crate::strategy::{PassReason, StrategySelector};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninstalled,
    Installing,
    /// Populated and waiting to be activated.
    Installed,
    Activating,
    Active,
    /// Install or activation failed. Terminal.
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninstalled => "uninstalled",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Event callbacks an embedding runtime delivers to a relay instance.
///
/// Returned futures must be `Send`: fetch events run on spawned tasks.
pub trait LifecycleHandler: Send + Sync + 'static {
    fn on_install(&self) -> impl Future<Output = Result<()>> + Send;

    fn on_activate(&self) -> impl Future<Output = Result<()>> + Send;

    /// Always produces a response.
    fn on_fetch(&self, request: &Request) -> impl Future<Output = Response> + Send;

    /// Always produces exactly one reply.
    fn on_message(&self, message: ControlMessage) -> impl Future<Output = ControlReply> + Send;

    fn state(&self) -> LifecycleState;
}

/// One relay instance: its generation, its state and its request routing.
pub struct LifecycleController<B: CacheBackend, O: Origin> {
    config: RelayConfig,
    generation: String,
    resources: Vec<Url>,
    manager: GenerationManager<B, O>,
    selector: StrategySelector<B, O>,
    store: CacheStore<B>,
    state: watch::Sender<LifecycleState>,
}

impl<B: CacheBackend, O: Origin> LifecycleController<B, O> {
    /// Create a controller with no metrics.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the configuration does not validate.
    pub fn new(config: RelayConfig, store: CacheStore<B>, origin: O) -> Result<Self> {
        Self::with_metrics(config, store, origin, Box::new(NoOpMetrics))
    }

    /// Create a controller reporting to `metrics`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the configuration does not validate.
    pub fn with_metrics(
        config: RelayConfig,
        store: CacheStore<B>,
        origin: O,
        metrics: Box<dyn RelayMetrics>,
    ) -> Result<Self> {
        config.validate()?;

        let generation = config.generation_name()?.to_string();
        let resources = config.resource_urls()?;
        let origin = Arc::new(origin);
        let metrics: Arc<dyn RelayMetrics> = Arc::from(metrics);

        let ctx = ExecutorContext::new(store.clone(), origin.clone(), metrics);
        let selector = StrategySelector::new(
            ctx,
            config.scope_url()?,
            config.api_prefixes.clone(),
            config.offline_url()?,
        );
        let manager = GenerationManager::new(&config.app_id, store.clone(), origin);
        let (state, _) = watch::channel(LifecycleState::Uninstalled);

        debug!("Created relay instance {}", generation);
        Ok(LifecycleController {
            config,
            generation,
            resources,
            manager,
            selector,
            store,
            state,
        })
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// This instance's own generation name.
    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub fn generation_name(&self) -> Result<GenerationName> {
        GenerationName::parse(&self.generation)
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore<B> {
        &self.store
    }

    pub fn manager(&self) -> &GenerationManager<B, O> {
        &self.manager
    }

    fn set_state(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!("{}: {} -> {}", self.generation, previous, next);
        }
    }

    /// Generation serving requests: the current one, or this instance's own.
    async fn serving_generation(&self) -> String {
        self.manager
            .current()
            .await
            .unwrap_or_else(|| self.generation.clone())
    }

    /// Populate this instance's generation.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState`: Not `Uninstalled`
    /// - `Error::Population`: A resource could not be fetched; state becomes `Failed`
    pub async fn install(&self) -> Result<()> {
        let _guard = self.store.lock_transitions().await;

        let state = self.state();
        if state != LifecycleState::Uninstalled {
            return Err(Error::InvalidState(format!(
                "install requires uninstalled, instance is {}",
                state
            )));
        }

        self.set_state(LifecycleState::Installing);
        match self.manager.populate(&self.generation, &self.resources).await {
            Ok(PopulateReport { stored, .. }) => {
                info!("✓ Installed {} ({} resources)", self.generation, stored);
                self.set_state(LifecycleState::Installed);
                Ok(())
            }
            Err(e) => {
                error!("✗ Install of {} failed: {}", self.generation, e);
                self.set_state(LifecycleState::Failed);
                Err(e)
            }
        }
    }

    /// Promote this instance's generation and purge the others.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState`: Not `Installed`
    /// - `Error::BackendError`: Purge failed; state becomes `Failed`
    pub async fn activate(&self) -> Result<()> {
        let _guard = self.store.lock_transitions().await;
        self.activate_locked().await
    }

    async fn activate_locked(&self) -> Result<()> {
        let state = self.state();
        if state != LifecycleState::Installed {
            return Err(Error::InvalidState(format!(
                "activate requires installed, instance is {}",
                state
            )));
        }

        self.set_state(LifecycleState::Activating);
        // a clear-cache while waiting deletes the installed generation
        if self.manager.open(&self.generation) {
            warn!("{} was cleared before activation, serving it empty", self.generation);
        }
        self.manager.promote(&self.generation).await;
        match self.manager.purge_others(&self.generation).await {
            Ok(purged) => {
                info!(
                    "✓ Activated {} (purged {} generation(s))",
                    self.generation,
                    purged.len()
                );
                self.set_state(LifecycleState::Active);
                Ok(())
            }
            Err(e) => {
                error!("✗ Activation of {} failed: {}", self.generation, e);
                self.set_state(LifecycleState::Failed);
                Err(e)
            }
        }
    }

    /// Answer a request. Never fails.
    pub async fn fetch(&self, request: &Request) -> Served {
        if self.state() != LifecycleState::Active {
            debug!(
                "» Passthrough {} ({:?}, {})",
                request.url(),
                PassReason::NotActive,
                self.state()
            );
            return self.selector.passthrough(request).await;
        }
        let generation = self.serving_generation().await;
        self.selector.serve(&generation, request).await
    }

    /// Handle a control message. Always produces exactly one reply.
    pub async fn handle_message(&self, message: ControlMessage) -> ControlReply {
        debug!("» Control message {} ({})", message, self.state());
        match message {
            ControlMessage::SkipWait => {
                let _guard = self.store.lock_transitions().await;
                if self.state() != LifecycleState::Installed {
                    debug!("skip-wait ignored in state {}", self.state());
                    return ControlReply::Ack;
                }
                match self.activate_locked().await {
                    Ok(()) => ControlReply::Ack,
                    Err(e) => ControlReply::error(e),
                }
            }
            ControlMessage::GetVersion => ControlReply::Version {
                version: self.serving_generation().await,
            },
            ControlMessage::ClearCache => {
                let _guard = self.store.lock_transitions().await;
                match self.manager.clear_all().await {
                    Ok(_) => {
                        if self.state() == LifecycleState::Active {
                            // keep serving: an empty generation accepts new entries
                            self.manager.open(&self.generation);
                            self.manager.promote(&self.generation).await;
                        }
                        ControlReply::Cleared { success: true }
                    }
                    Err(e) => {
                        warn!("✗ clear-cache failed: {}", e);
                        ControlReply::Cleared { success: false }
                    }
                }
            }
            ControlMessage::UpdateCache => {
                let _guard = self.store.lock_transitions().await;
                let generation = self.serving_generation().await;
                match self.manager.populate(&generation, &self.resources).await {
                    Ok(_) => ControlReply::Updated { success: true },
                    Err(e) => {
                        warn!("✗ update-cache failed: {}", e);
                        ControlReply::Updated { success: false }
                    }
                }
            }
        }
    }

    /// Parse and handle a JSON control message.
    pub async fn handle_json(&self, raw: &str) -> ControlReply {
        match ControlMessage::from_json(raw) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => {
                warn!("Rejected control message: {}", e);
                ControlReply::error(e)
            }
        }
    }

    /// Wait for every background refresh spawned so far.
    pub async fn wait_for_refreshes(&self) {
        self.selector.refreshes().wait_idle().await;
    }
}

impl<B: CacheBackend, O: Origin> LifecycleHandler for LifecycleController<B, O> {
    async fn on_install(&self) -> Result<()> {
        self.install().await
    }

    async fn on_activate(&self) -> Result<()> {
        self.activate().await
    }

    async fn on_fetch(&self, request: &Request) -> Response {
        self.fetch(request).await.into_response()
    }

    async fn on_message(&self, message: ControlMessage) -> ControlReply {
        self.handle_message(message).await
    }

    fn state(&self) -> LifecycleState {
        LifecycleController::state(self)
    }
}
