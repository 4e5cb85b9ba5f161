//! Seams between the trackers and the event distribution layer.

pub mod dispatcher;

pub use dispatcher::EventDispatcher;
