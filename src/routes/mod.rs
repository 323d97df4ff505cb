//! HTTP route handlers for the Buecherei API.
//!
//! - `auth`: registration and login
//! - `books`: book CRUD, lending
//! - `health`: health, readiness, metrics and version endpoints
//! - `reviews`: reviews of a book
//! - `users`: profile, user listing and ban management

pub mod auth;
pub mod books;
pub mod health;
pub mod reviews;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::{
    error::AppError,
    middleware::{security_headers::security_headers_middleware, validation::validate_request_middleware},
    state::AppState,
};

/// Builds the complete application router including its middleware stack.
pub fn router(state: AppState) -> Router {
    let cfg = state.config.clone();

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/users", get(users::list_users))
        .route("/users/me", get(users::me))
        .route("/users/{user_id}/banstatus", get(users::get_banstatus).put(users::update_banstatus))
        .route("/books", post(books::create_book).get(books::list_books))
        .route(
            "/books/{book_id}",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        .route("/books/{book_id}/borrow", put(books::borrow_book))
        .route("/books/{book_id}/return", put(books::return_book))
        .route("/books/{book_id}/reviews", get(reviews::list_reviews).post(reviews::create_review))
        .route(
            "/books/{book_id}/reviews/{review_id}",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        .fallback(route_not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(cfg.limits.max_body_bytes))
        .layer(from_fn_with_state(cfg.clone(), validate_request_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(cfg, security_headers_middleware))
}

async fn route_not_found() -> AppError {
    AppError::not_found("Route not found")
}
