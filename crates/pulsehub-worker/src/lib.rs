//! Background maintenance for PulseHub.
//!
//! This crate provides:
//! - A job executor that dispatches named jobs to their handlers
//! - A scheduler that runs each job on its configured interval
//! - Built-in jobs for stale-presence eviction, ended-session cleanup
//!   and suspicious-session scans

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use scheduler::CronScheduler;
