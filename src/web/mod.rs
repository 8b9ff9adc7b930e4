//! Web surface
//!
//! The axum realization of the HTTP contract: token-issuing endpoints
//! under `/auth/{source_id}`, the bearer middleware that turns an
//! `Authorization` header into request-scoped session state, and a
//! session-introspection root route.

mod routes;
mod server;

pub use routes::CurrentSession;
pub use server::{build_router, serve, AppState};
