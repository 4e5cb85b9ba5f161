//! # pulsehub-realtime
//!
//! In-process real-time core for PulseHub. Provides:
//!
//! - An event bus with exact and wildcard channel subscriptions, a bounded
//!   delivery queue, and isolated listener invocation
//! - Typed channel names for presence, activity and session events
//! - Per-user presence tracking with transition history and stale eviction
//! - The activity broadcast policy and the broadcaster that applies it

pub mod activity;
pub mod bus;
pub mod channel;
pub mod metrics;
pub mod presence;

pub use activity::broadcaster::ActivityBroadcaster;
pub use activity::policy::ActivityPolicy;
pub use activity::store::{ActivityLogStore, MemoryActivityLog};
pub use bus::EventBus;
pub use channel::listener::{ChannelListener, EventListener, FnListener};
pub use channel::registry::ChannelRegistry;
pub use channel::types::ChannelType;
pub use presence::status::PresenceStatus;
pub use presence::tracker::PresenceTracker;
