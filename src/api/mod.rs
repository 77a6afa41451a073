//! HTTP API layer for the wrapper service.
//!
//! Provides REST endpoints for single runs, batches and introspection.

pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
