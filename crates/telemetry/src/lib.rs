//! In-process telemetry for the clickstream pipeline.
//!
//! Metrics and health live in global registries that the worker reports
//! through `tracing` and the API exposes on the health endpoints.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
