//! Built-in job handler implementations.

pub mod presence;
pub mod session;

pub use presence::PresenceEvictionHandler;
pub use session::{RiskScanHandler, SessionCleanupHandler};
