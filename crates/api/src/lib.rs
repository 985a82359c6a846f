//! HTTP API for event collection and the dashboard.

pub mod extractors;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
