use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::{
    db,
    error::{AppError, AppResult, OptionExt},
    metrics::Metrics,
    middleware::{validation::ValidJson, AuthUser},
    state::AppState,
    types::{Envelope, UpdateBanstatusRequest, UserShowDto},
};

const USER_NOT_FOUND: &str = "User does not exist!";

/// `GET /users/me`
pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<impl IntoResponse> {
    let record = db::users::find_by_id(&state.db, &user.id).await?.ok_or_not_found(USER_NOT_FOUND)?;
    Ok(Json(record.into_show()))
}

/// `GET /users` - admin only.
pub async fn list_users(State(state): State<AppState>, user: AuthUser) -> AppResult<impl IntoResponse> {
    user.require_admin("Users can be listed only by the admin!")?;
    let users: Vec<UserShowDto> =
        db::users::list_users(&state.db).await?.into_iter().map(|u| u.into_show()).collect();
    Ok(Json(users))
}

/// `GET /users/{user_id}/banstatus` - the user themself or an admin.
pub async fn get_banstatus(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    if user.id != user_id {
        user.require_admin("Ban status can be viewed only by the user or the admin!")?;
    }
    let record = db::users::find_by_id(&state.db, &user_id).await?.ok_or_not_found(USER_NOT_FOUND)?;
    Ok(Json(record.banstatus))
}

/// `PUT /users/{user_id}/banstatus` - admin only; admins cannot ban themselves.
pub async fn update_banstatus(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
    ValidJson(req): ValidJson<UpdateBanstatusRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin("Users can be banned only by the admin!")?;
    let (is_banned, description) = req.validate()?;
    if is_banned && user.id == user_id {
        return Err(AppError::BadRequest("Admins cannot ban themselves!".to_string()));
    }

    let banstatus = db::users::set_banstatus(&state.db, &user_id, is_banned, &description)
        .await?
        .ok_or_not_found(USER_NOT_FOUND)?;
    if is_banned {
        Metrics::inc(&state.metrics.bans_applied);
    }
    tracing::info!(%user_id, is_banned, admin = %user.username, "ban status updated");

    Ok(Json(Envelope::new("Ban status has been updated successfully!", banstatus)))
}
