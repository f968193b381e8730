//! Insight API.
//!
//! Exposes the cache operations as HTTP endpoints under `/api/`. The
//! router is composable — `insights_router()` returns a `Router` that can
//! be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod types;

pub use router::insights_router;
pub use types::ApiContext;
