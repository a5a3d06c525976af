//! Event-loop adapter for embedding runtimes.
//!
//! A [`Worker`] owns one [`LifecycleHandler`] and consumes its events from an
//! unbounded queue, one at a time. Install, activate and control messages
//! are awaited in arrival order; each fetch is spawned onto its own task so a
//! slow origin never holds up later events.
//!
//! ```ignore
//! let handle = Worker::spawn(Arc::new(controller), WorkerOptions::default());
//! handle.install().await?;            // activates too: no predecessor
//! let response = handle.fetch(request).await;
//! let reply = handle.post_json(r#"{"type":"get-version"}"#).await;
//! handle.shutdown();
//! ```

use crate::config::RelayConfig;
use crate::control::{ControlMessage, ControlReply};
use crate::error::{Error, Result};
use crate::lifecycle::{LifecycleHandler, LifecycleState};
use crate::request::Request;
use crate::response::Response;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Activation policy for a spawned worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Another instance is active; wait for it to be released before
    /// activating.
    pub predecessor_active: bool,
    /// Activate right after install regardless of any predecessor.
    pub skip_waiting: bool,
}

impl WorkerOptions {
    pub fn from_config(config: &RelayConfig) -> Self {
        WorkerOptions {
            predecessor_active: false,
            skip_waiting: config.skip_waiting,
        }
    }

    pub fn with_predecessor(mut self, active: bool) -> Self {
        self.predecessor_active = active;
        self
    }
}

enum Event {
    Install(oneshot::Sender<Result<()>>),
    Activate(oneshot::Sender<Result<()>>),
    Fetch(Request, oneshot::Sender<Response>),
    Message(ControlMessage, Option<oneshot::Sender<ControlReply>>),
    ReleasePredecessor(oneshot::Sender<Result<()>>),
    Shutdown,
}

pub struct Worker;

impl Worker {
    /// Start the event loop on the current tokio runtime.
    pub fn spawn<H: LifecycleHandler>(handler: Arc<H>, options: WorkerOptions) -> WorkerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(handler, rx, options));
        WorkerHandle { tx }
    }
}

async fn run<H: LifecycleHandler>(
    handler: Arc<H>,
    mut rx: mpsc::UnboundedReceiver<Event>,
    options: WorkerOptions,
) {
    let mut predecessor_active = options.predecessor_active;

    while let Some(event) = rx.recv().await {
        match event {
            Event::Install(reply) => {
                let result = handler.on_install().await;
                if result.is_ok() && (!predecessor_active || options.skip_waiting) {
                    if let Err(e) = handler.on_activate().await {
                        warn!("✗ Automatic activation failed: {}", e);
                    }
                } else if result.is_ok() {
                    info!("Installed, waiting for the active predecessor to be released");
                }
                let _ = reply.send(result);
            }
            Event::Activate(reply) => {
                let _ = reply.send(handler.on_activate().await);
            }
            Event::Fetch(request, reply) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let response = handler.on_fetch(&request).await;
                    let _ = reply.send(response);
                });
            }
            Event::Message(message, reply) => {
                let answer = handler.on_message(message).await;
                match reply {
                    Some(reply) => {
                        let _ = reply.send(answer);
                    }
                    None => debug!("Reply to {} dropped (no reply channel)", message),
                }
            }
            Event::ReleasePredecessor(reply) => {
                predecessor_active = false;
                let result = if handler.state() == LifecycleState::Installed {
                    handler.on_activate().await
                } else {
                    Ok(())
                };
                let _ = reply.send(result);
            }
            Event::Shutdown => break,
        }
    }

    debug!("Worker event loop stopped");
}

/// Sends events to a running [`Worker`]. Cheap to clone.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl WorkerHandle {
    fn stopped() -> Error {
        Error::InvalidState("worker event loop has stopped".to_string())
    }

    async fn call<T>(&self, event: impl FnOnce(oneshot::Sender<T>) -> Event) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(event(reply)).map_err(|_| Self::stopped())?;
        rx.await.map_err(|_| Self::stopped())
    }

    /// Deliver the install event. Activation follows automatically when no
    /// predecessor is active or `skip_waiting` is set.
    ///
    /// # Errors
    ///
    /// The install error, or `Error::InvalidState` if the loop has stopped.
    pub async fn install(&self) -> Result<()> {
        self.call(Event::Install).await?
    }

    /// # Errors
    ///
    /// The activation error, or `Error::InvalidState` if the loop has stopped.
    pub async fn activate(&self) -> Result<()> {
        self.call(Event::Activate).await?
    }

    /// Deliver a fetch event. A stopped worker answers 503.
    pub async fn fetch(&self, request: Request) -> Response {
        self.call(|reply| Event::Fetch(request, reply))
            .await
            .unwrap_or_else(|e| {
                warn!("✗ Fetch not delivered: {}", e);
                Response::unavailable()
            })
    }

    /// Deliver a control message and wait for its reply.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the loop has stopped.
    pub async fn post(&self, message: ControlMessage) -> Result<ControlReply> {
        self.call(|reply| Event::Message(message, Some(reply))).await
    }

    /// Parse and deliver a JSON control message. Always yields one reply.
    pub async fn post_json(&self, raw: &str) -> ControlReply {
        let message = match ControlMessage::from_json(raw) {
            Ok(message) => message,
            Err(e) => return ControlReply::error(e),
        };
        self.post(message).await.unwrap_or_else(ControlReply::error)
    }

    /// Deliver a control message without a reply channel.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the loop has stopped.
    pub fn notify(&self, message: ControlMessage) -> Result<()> {
        self.tx
            .send(Event::Message(message, None))
            .map_err(|_| Self::stopped())
    }

    /// The previously active instance is gone: activate if waiting.
    ///
    /// # Errors
    ///
    /// The activation error, or `Error::InvalidState` if the loop has stopped.
    pub async fn release_predecessor(&self) -> Result<()> {
        self.call(Event::ReleasePredecessor).await?
    }

    /// Stop the loop after the events already queued.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Event::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
