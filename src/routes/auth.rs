use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    db,
    error::{AppError, AppResult},
    metrics::Metrics,
    middleware::{ip::ClientIp, validation::sanitize_for_logging, validation::ValidJson},
    state::{AppState, LOGIN_ENDPOINT, REGISTER_ENDPOINT},
    types::{Envelope, LoginRequest, LoginResponse, RegisterRequest},
};

const INVALID_CREDENTIALS: &str = "Invalid username or password!";

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    state.rate_limiter.check_endpoint_limit(REGISTER_ENDPOINT, ip).await?;
    let username = req.validate()?;

    if db::users::find_by_username(&state.db, &username).await?.is_some() {
        return Err(AppError::Conflict("Username is already taken!".to_string()));
    }
    let hash = state.auth.hash_password(req.password).await?;
    let user = db::users::create_user(&state.db, &username, &hash, false).await.map_err(|e| {
        match AppError::from(e) {
            // Lost the race against a concurrent registration
            AppError::Conflict(_) => AppError::Conflict("Username is already taken!".to_string()),
            other => other,
        }
    })?;
    Metrics::inc(&state.metrics.users_registered);
    tracing::info!(user_id = %user.id, username = %user.username, "user registered");

    Ok((StatusCode::CREATED, Json(Envelope::new("User has been registered successfully!", user.into_show()))))
}

/// `POST /auth/login` - issues a bearer token.
///
/// Banned users receive a token too; the guard rejects it on use.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ValidJson(req): ValidJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    state.rate_limiter.check_endpoint_limit(LOGIN_ENDPOINT, ip).await?;

    let Some(user) = db::users::find_by_username(&state.db, req.username.trim()).await? else {
        // Same bcrypt work as a wrong password, so response times do not reveal usernames
        state.auth.verify_dummy_password(req.password).await?;
        Metrics::inc(&state.metrics.logins_failed);
        tracing::info!(username = %sanitize_for_logging(&req.username), %ip, "login for unknown user");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };
    if !state.auth.verify_password(req.password, user.password_hash.clone()).await? {
        Metrics::inc(&state.metrics.logins_failed);
        tracing::info!(username = %user.username, %ip, "login with wrong password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    let token = state.auth.issue_token(&user.id, &user.username, user.is_admin)?;
    Metrics::inc(&state.metrics.logins_succeeded);
    tracing::info!(username = %user.username, "login succeeded");

    Ok(Json(LoginResponse { token, user: user.into_show() }))
}
