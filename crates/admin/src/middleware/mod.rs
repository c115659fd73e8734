//! HTTP middleware stack for the back-office.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. Request ID (add unique ID to each request)
//! 3. `TraceLayer` (request tracing with status and latency)
//! 4. Security headers (strict CSP, no inline scripts)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication is enforced per handler through the extractors in [`auth`].
//! The sign-in form carries its own rate limiter.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AdminAuthRejection, RequireAdminAuth, RequireWriter, clear_current_admin, set_current_admin,
};
pub use rate_limit::login_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
