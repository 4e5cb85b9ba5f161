//! The fire-and-forget dispatch contract used by every tracker.

use std::sync::Arc;

use crate::events::Event;

/// Accepts already-decided events for distribution.
///
/// `dispatch` never fails and never blocks beyond enqueueing. Trackers hold
/// an `Option<Arc<dyn EventDispatcher>>` and skip dispatch entirely when
/// none is configured.
pub trait EventDispatcher: Send + Sync {
    /// Hand an event to the distribution layer.
    fn dispatch(&self, event: Event);
}

impl<T: EventDispatcher + ?Sized> EventDispatcher for Arc<T> {
    fn dispatch(&self, event: Event) {
        (**self).dispatch(event);
    }
}
