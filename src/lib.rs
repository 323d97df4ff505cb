//! # Buecherei Backend Library
//!
//! REST backend for a book-lending and review platform: books, users, bans and
//! reviews over SQLite, with JWT authentication and admin-gated mutations.
//!
//! ## Architecture
//!
//! - **Axum**: HTTP server, routing and extractors (the auth guard is an extractor)
//! - **SQLx**: asynchronous SQLite access
//! - **jsonwebtoken / bcrypt**: bearer tokens and password hashing
//! - **Tokio**: async runtime
//!
//! ## Core Components
//!
//! - [`auth`]: token service, password hashing, admin bootstrap
//! - [`config`]: layered configuration
//! - [`db`]: schema and queries
//! - [`error`]: centralized error handling and HTTP error responses
//! - [`metrics`]: in-process counters
//! - [`middleware`]: auth guard, rate limiting, security headers, request validation
//! - [`routes`]: HTTP handlers and the router
//! - [`state`]: shared application state
//! - [`types`]: request/response DTOs and their validation

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
