//! HTTP API on axum: structured error responses, bearer-token session
//! auth, and one endpoint module per page surface.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod types;
