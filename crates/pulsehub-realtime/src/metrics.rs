//! Event bus metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Bus-level counters.
#[derive(Debug, Default)]
pub struct BusMetrics {
    /// Events accepted onto the delivery queue
    pub events_dispatched: AtomicU64,
    /// Events dropped because the queue was full or closed
    pub events_dropped: AtomicU64,
    /// Successful listener invocations
    pub events_delivered: AtomicU64,
    /// Listener invocations that returned an error or panicked
    pub listener_failures: AtomicU64,
    /// Total subscribe operations
    pub subscriptions_total: AtomicU64,
}

impl BusMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted dispatch
    pub fn record_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped dispatch
    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful delivery
    pub fn record_delivered(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed delivery
    pub fn record_failure(&self) {
        self.listener_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a subscribe operation
    pub fn record_subscribe(&self) {
        self.subscriptions_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> BusMetricsSnapshot {
        BusMetricsSnapshot {
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
            subscriptions_total: self.subscriptions_total.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMetricsSnapshot {
    /// Events accepted onto the delivery queue
    pub events_dispatched: u64,
    /// Events dropped
    pub events_dropped: u64,
    /// Successful listener invocations
    pub events_delivered: u64,
    /// Failed listener invocations
    pub listener_failures: u64,
    /// Total subscribe operations
    pub subscriptions_total: u64,
}
