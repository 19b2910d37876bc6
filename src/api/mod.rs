//! HTTP request boundary.
//!
//! Accepts a photo (URL or inline data URL) plus an optional description,
//! runs the search pipeline, and returns one match per backend. Errors use
//! the structured `{"error": {"code", "message"}}` body.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, ApiServer};
pub use types::ApiContext;
