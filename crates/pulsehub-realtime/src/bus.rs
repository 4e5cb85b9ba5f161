//! The in-process event bus.
//!
//! [`EventBus::dispatch`] only enqueues. A single delivery task started with
//! [`EventBus::start`] drains the queue in arrival order, so events published
//! on the same channel reach each listener in the order they were
//! dispatched. No ordering is promised across listeners or channels.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pulsehub_core::config::event_bus::EventBusConfig;
use pulsehub_core::error::AppError;
use pulsehub_core::events::Event;
use pulsehub_core::result::AppResult;
use pulsehub_core::traits::EventDispatcher;
use pulsehub_core::types::SubscriptionId;

use crate::channel::listener::EventListener;
use crate::channel::registry::ChannelRegistry;
use crate::metrics::{BusMetrics, BusMetricsSnapshot};

/// Returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub SubscriptionId);

/// Publish/subscribe fan-out keyed by channel name.
pub struct EventBus {
    registry: ChannelRegistry,
    metrics: BusMetrics,
    tx: mpsc::Sender<Event>,
    rx: Mutex<Option<mpsc::Receiver<Event>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("channels", &self.registry.channel_count())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

impl EventBus {
    /// Creates a bus with a bounded queue. Nothing is delivered until
    /// [`start`](Self::start) is called.
    pub fn new(config: &EventBusConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            registry: ChannelRegistry::new(),
            metrics: BusMetrics::new(),
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Registers a listener on a channel name or a `prefix*` pattern.
    pub fn subscribe(
        &self,
        channel: &str,
        listener: Arc<dyn EventListener>,
    ) -> SubscriptionHandle {
        let id = self.registry.subscribe(channel, listener);
        self.metrics.record_subscribe();
        debug!(channel = %channel, subscription_id = %id, "Listener subscribed");
        SubscriptionHandle(id)
    }

    /// Removes a subscription. Returns `false` if the handle was unknown.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let removed = self.registry.unsubscribe(handle.0);
        if removed {
            debug!(subscription_id = %handle.0, "Listener unsubscribed");
        }
        removed
    }

    /// Listener count for an exact channel or pattern.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.registry.channel_subscriber_count(channel)
    }

    /// Number of channels and patterns with at least one listener.
    pub fn channel_count(&self) -> usize {
        self.registry.channel_count()
    }

    /// Current counters.
    pub fn metrics(&self) -> BusMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Fans one event out to every matching listener right now.
    ///
    /// Each listener runs in isolation: an error or panic is logged and
    /// counted and the remaining listeners still run. Returns the number of
    /// successful deliveries.
    pub fn deliver_now(&self, event: &Event) -> usize {
        let mut delivered = 0;
        for (id, listener) in self.registry.listeners_for(&event.channel) {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => {
                    delivered += 1;
                    self.metrics.record_delivered();
                }
                Ok(Err(e)) => {
                    self.metrics.record_failure();
                    warn!(
                        channel = %event.channel,
                        listener = %listener.name(),
                        subscription_id = %id,
                        error = %e,
                        "Listener failed to handle event"
                    );
                }
                Err(_) => {
                    self.metrics.record_failure();
                    warn!(
                        channel = %event.channel,
                        listener = %listener.name(),
                        subscription_id = %id,
                        "Listener panicked while handling event"
                    );
                }
            }
        }
        delivered
    }

    /// Spawns the delivery task. It runs until `shutdown` flips to `true`,
    /// then delivers whatever is already queued and exits.
    ///
    /// Fails if the bus was already started.
    pub fn start(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> AppResult<JoinHandle<()>> {
        let mut rx = self
            .rx
            .lock()
            .map_err(|_| AppError::internal("Event bus receiver lock poisoned"))?
            .take()
            .ok_or_else(|| AppError::internal("Event bus already started"))?;

        let bus = Arc::clone(self);
        info!("Event bus delivery task started");

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe = rx.recv() => match maybe {
                        Some(event) => {
                            bus.deliver_now(&event);
                        }
                        None => break,
                    },
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            rx.close();
                            let mut drained = 0usize;
                            while let Ok(event) = rx.try_recv() {
                                bus.deliver_now(&event);
                                drained += 1;
                            }
                            info!(drained = drained, "Event bus delivery task stopping");
                            break;
                        }
                    }
                }
            }
        }))
    }
}

impl EventDispatcher for EventBus {
    fn dispatch(&self, event: Event) {
        match self.tx.try_send(event) {
            Ok(()) => self.metrics.record_dispatched(),
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.metrics.record_dropped();
                warn!(channel = %event.channel, kind = %event.kind, "Event queue full, event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.metrics.record_dropped();
                debug!(channel = %event.channel, kind = %event.kind, "Event bus stopped, event dropped");
            }
        }
    }
}
