//! Bits Endpoint Directory REST API
//!
//! This crate provides the Axum-based HTTP API serving the active and
//! dated endpoint views, the administrative refresh and cache endpoints.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
