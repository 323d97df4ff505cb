use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::EndpointRateLimiter;

/// Rate-limit keys used by the auth handlers.
pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REGISTER_ENDPOINT: &str = "/auth/register";

/// The shared application state.
///
/// Cloned into every handler and extractor; all members are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: sqlx::SqlitePool,
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Token signing/verification and password hashing.
    pub auth: AuthService,
    /// The application metrics.
    pub metrics: Metrics,
    /// Per-endpoint rate limiter for the credential endpoints.
    pub rate_limiter: EndpointRateLimiter,
}

impl AppState {
    /// Creates the shared state. Rate limits for login and registration come from
    /// `limits` and use a one minute window.
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let rate_limiter = EndpointRateLimiter::new().with_limits(vec![
            (LOGIN_ENDPOINT, config.limits.login_per_minute, 60),
            (REGISTER_ENDPOINT, config.limits.register_per_minute, 60),
        ]);

        Self {
            db,
            auth: AuthService::new(&config.auth),
            config: Arc::new(config),
            metrics: Metrics::new(),
            rate_limiter,
        }
    }
}
