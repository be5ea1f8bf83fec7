//! HTTP middleware stack for the sync service.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (any origin, webhook headers allowed)
//! 5. Rate limiting (governor, client endpoints only)

pub mod cors;
pub mod rate_limit;
pub mod request_id;

pub use cors::cors_layer;
pub use rate_limit::client_rate_limiter;
pub use request_id::request_id_middleware;
