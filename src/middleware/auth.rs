use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::{
    auth::bearer_token,
    db,
    error::{AppError, AppResult},
    state::AppState,
};

/// The authenticated caller.
///
/// Using this extractor guards a handler: the bearer token must verify, the user
/// must still exist and must not be banned. Role data is read from the database
/// so that changes apply to tokens already issued.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
}

impl AuthUser {
    /// Fails with `401` and `message` unless the caller is an admin.
    pub fn require_admin(&self, message: &str) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            tracing::info!(user = %self.username, "admin-only action refused");
            Err(AppError::unauthorized(message))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;
        let token = bearer_token(header_value).ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

        let claims = state.auth.verify_token(token)?;
        let user = db::users::find_by_id(&state.db, &claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

        if user.banstatus.is_banned {
            tracing::info!(user = %user.username, "banned user rejected");
            return Err(AppError::unauthorized(format!("You are banned: {}", user.banstatus.description)));
        }

        Ok(AuthUser { id: user.id, username: user.username, is_admin: user.is_admin })
    }
}
