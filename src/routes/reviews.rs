use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    db,
    error::{AppError, AppResult, OptionExt},
    metrics::Metrics,
    middleware::{validation::ValidJson, AuthUser},
    state::AppState,
    types::{CreateReviewRequest, Envelope, UpdateReviewRequest},
};

const BOOK_NOT_FOUND: &str = "Book does not exist!";
const REVIEW_NOT_FOUND: &str = "Review does not exist!";

async fn ensure_book_exists(state: &AppState, book_id: &str) -> AppResult<()> {
    db::books::get_book(&state.db, book_id).await?.ok_or_not_found(BOOK_NOT_FOUND).map(|_| ())
}

/// `GET /books/{book_id}/reviews` - oldest first.
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    ensure_book_exists(&state, &book_id).await?;
    let reviews = db::reviews::list_for_book(&state.db, &book_id).await?;
    Ok(Json(reviews))
}

/// `POST /books/{book_id}/reviews` - one review per user and book.
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(book_id): Path<String>,
    ValidJson(req): ValidJson<CreateReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let (content, rating) = req.validate()?;
    ensure_book_exists(&state, &book_id).await?;

    let review = db::reviews::create_review(&state.db, &book_id, &user.id, &content, rating)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("You have already reviewed this book!".to_string()),
            other => other,
        })?;
    Metrics::inc(&state.metrics.reviews_created);
    tracing::info!(%book_id, review_id = %review.id, user = %user.username, "review created");

    Ok((StatusCode::CREATED, Json(Envelope::new("Review has been submitted successfully!", review))))
}

/// `PUT /books/{book_id}/reviews/{review_id}` - only the author may edit.
pub async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path((book_id, review_id)): Path<(String, String)>,
    ValidJson(req): ValidJson<UpdateReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let changes = req.validate()?;
    let existing = db::reviews::get_review(&state.db, &book_id, &review_id)
        .await?
        .ok_or_not_found(REVIEW_NOT_FOUND)?;
    if existing.user_id != user.id {
        return Err(AppError::unauthorized("Reviews can be updated only by their author!"));
    }

    let review = db::reviews::update_review(&state.db, &book_id, &review_id, &changes)
        .await?
        .ok_or_not_found(REVIEW_NOT_FOUND)?;
    Ok(Json(Envelope::new("Review has been updated successfully!", review)))
}

/// `DELETE /books/{book_id}/reviews/{review_id}` - the author or an admin.
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path((book_id, review_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let existing = db::reviews::get_review(&state.db, &book_id, &review_id)
        .await?
        .ok_or_not_found(REVIEW_NOT_FOUND)?;
    if existing.user_id != user.id && !user.is_admin {
        return Err(AppError::unauthorized("Reviews can be deleted only by their author or the admin!"));
    }

    let review = db::reviews::delete_review(&state.db, &book_id, &review_id)
        .await?
        .ok_or_not_found(REVIEW_NOT_FOUND)?;
    tracing::info!(%book_id, %review_id, user = %user.username, "review deleted");
    Ok(Json(Envelope::new("Review has been deleted successfully!", review)))
}
