//! Middleware and extractors for HTTP request processing.
//!
//! Cross-cutting concerns live here: the authentication guard, client
//! identification, rate limiting, security headers and request validation.

pub mod auth;
pub mod ip;
pub mod rate_limit;
pub mod security_headers;
pub mod validation;

pub use auth::AuthUser;
pub use rate_limit::EndpointRateLimiter;
