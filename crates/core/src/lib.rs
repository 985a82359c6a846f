//! Core records, ingestion and shared utilities for the clickstream pipeline.

pub mod clock;
pub mod error;
pub mod event;
pub mod ids;
pub mod limits;
pub mod referrer;
pub mod session;

pub use clock::{duration_ms, Clock, DisplayZone, ManualClock, SystemClock};
pub use error::{Error, ErrorCode, Result};
pub use event::*;
pub use referrer::{ReferrerRule, ReferrerTable};
pub use session::*;
