//! Listener contract and the stock adapters.
//!
//! Listeners are invoked synchronously from the bus delivery task and must
//! not block. Anything slow belongs behind a [`ChannelListener`].

use std::fmt;

use tokio::sync::mpsc;

use pulsehub_core::error::AppError;
use pulsehub_core::events::Event;
use pulsehub_core::result::AppResult;

/// Receives events from the bus.
pub trait EventListener: Send + Sync {
    /// Handle one event. Errors are logged and counted by the bus, never
    /// propagated to whoever dispatched the event.
    fn on_event(&self, event: &Event) -> AppResult<()>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "listener"
    }
}

/// Forwards events into a bounded tokio channel, e.g. a websocket hub's
/// outbound queue.
#[derive(Debug)]
pub struct ChannelListener {
    name: String,
    tx: mpsc::Sender<Event>,
}

impl ChannelListener {
    /// Create a listener and the receiver it feeds.
    pub fn new(name: impl Into<String>, buffer: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }

    /// Wrap an existing sender.
    pub fn from_sender(name: impl Into<String>, tx: mpsc::Sender<Event>) -> Self {
        Self {
            name: name.into(),
            tx,
        }
    }
}

impl EventListener for ChannelListener {
    fn on_event(&self, event: &Event) -> AppResult<()> {
        self.tx.try_send(event.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                AppError::internal(format!("Listener '{}' queue is full", self.name))
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::internal(format!("Listener '{}' receiver dropped", self.name))
            }
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Adapts a closure into a listener.
pub struct FnListener<F> {
    name: String,
    f: F,
}

impl<F> FnListener<F>
where
    F: Fn(&Event) -> AppResult<()> + Send + Sync,
{
    /// Wrap `f`.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for FnListener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener")
            .field("name", &self.name)
            .finish()
    }
}

impl<F> EventListener for FnListener<F>
where
    F: Fn(&Event) -> AppResult<()> + Send + Sync,
{
    fn on_event(&self, event: &Event) -> AppResult<()> {
        (self.f)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
