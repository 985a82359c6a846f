//! Background maintenance for the analytics pipeline.
//!
//! - Cache sweep (expired view cache entries)
//! - Retention (expired projections and events)
//! - Store health check
//! - Metrics report

pub mod retention;
pub mod scheduler;

pub use retention::{RetentionReport, RetentionWorker};
pub use scheduler::*;
