//! Middleware layer.
//!
//! Cross-cutting concerns applied by the server around every dispatch:
//!
//! - [`Cors`]: fixed CORS headers on every response, and `204` answers to
//!   `OPTIONS` preflight requests before they reach the router.
//! - [`trace`]: one log line per request with method, path, status, latency.

mod cors;
pub mod trace;

pub use cors::Cors;
