//! services/api/src/web/mod.rs
//!
//! HTTP layer: route handlers, auth middleware, shared state, and the
//! OpenAPI definition.

pub mod ai;
pub mod auth;
pub mod documents;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod summaries;
pub mod symptoms;

pub use rest::{router, ApiDoc};
pub use state::AppState;
