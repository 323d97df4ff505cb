use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    db::{self, books::LendOutcome},
    error::{AppError, AppResult, OptionExt},
    metrics::Metrics,
    middleware::{
        validation::{ValidJson, ValidQuery},
        AuthUser,
    },
    state::AppState,
    types::{BookQuery, BookWithReviewsDto, CreateBookRequest, Envelope, UpdateBookRequest},
};

const BOOK_NOT_FOUND: &str = "Book does not exist!";

/// `POST /books` - any authenticated user may submit a book.
pub async fn create_book(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(req): ValidJson<CreateBookRequest>,
) -> AppResult<impl IntoResponse> {
    let new_book = req.validate()?;
    let book = db::books::create_book(&state.db, &new_book).await?;
    Metrics::inc(&state.metrics.books_created);
    tracing::info!(book_id = %book.id, user = %user.username, "book created");

    Ok((StatusCode::CREATED, Json(Envelope::new("Book has been submitted successfully!", book))))
}

/// `GET /books` - open listing with optional filters.
pub async fn list_books(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<BookQuery>,
) -> AppResult<impl IntoResponse> {
    query.validate()?;
    let books = db::books::list_books(&state.db, &query).await?;
    Ok(Json(books))
}

/// `GET /books/{book_id}` - a single book with its reviews.
pub async fn get_book(State(state): State<AppState>, Path(book_id): Path<String>) -> AppResult<impl IntoResponse> {
    let book = db::books::get_book(&state.db, &book_id).await?.ok_or_not_found(BOOK_NOT_FOUND)?;
    let reviews = db::reviews::list_for_book(&state.db, &book_id).await?;
    Ok(Json(BookWithReviewsDto { book, reviews }))
}

/// `DELETE /books/{book_id}` - admin only; the admin check precedes the existence check.
pub async fn delete_book(
    State(state): State<AppState>,
    user: AuthUser,
    Path(book_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    user.require_admin("Books can be deleted only by the admin!")?;
    let book = db::books::delete_book(&state.db, &book_id).await?.ok_or_not_found(BOOK_NOT_FOUND)?;
    Metrics::inc(&state.metrics.books_deleted);
    tracing::info!(%book_id, admin = %user.username, "book deleted");

    Ok(Json(Envelope::new("Book has been deleted successfully!", book)))
}

/// `PUT /books/{book_id}` - admin only.
pub async fn update_book(
    State(state): State<AppState>,
    user: AuthUser,
    Path(book_id): Path<String>,
    ValidJson(req): ValidJson<UpdateBookRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin("Books can be updated only by the admin!")?;
    let changes = req.validate()?;
    let book = db::books::update_book(&state.db, &book_id, &changes)
        .await?
        .ok_or_not_found("Book does not exist.")?;
    Metrics::inc(&state.metrics.books_updated);
    tracing::info!(%book_id, admin = %user.username, "book updated");

    Ok(Json(Envelope::new("Book has been updated successfully!", book)))
}

/// `PUT /books/{book_id}/borrow`
pub async fn borrow_book(
    State(state): State<AppState>,
    user: AuthUser,
    Path(book_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    match db::books::borrow_book(&state.db, &book_id, &user.id).await? {
        LendOutcome::Done(book) => {
            Metrics::inc(&state.metrics.books_borrowed);
            tracing::info!(%book_id, user = %user.username, "book borrowed");
            Ok(Json(Envelope::new("Book has been borrowed successfully!", book)))
        }
        LendOutcome::NotFound => Err(AppError::not_found(BOOK_NOT_FOUND)),
        LendOutcome::WrongState | LendOutcome::NotBorrower => {
            Err(AppError::Conflict("Book is already taken!".to_string()))
        }
    }
}

/// `PUT /books/{book_id}/return` - by the borrower, or by an admin on their behalf.
pub async fn return_book(
    State(state): State<AppState>,
    user: AuthUser,
    Path(book_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    match db::books::return_book(&state.db, &book_id, &user.id, user.is_admin).await? {
        LendOutcome::Done(book) => {
            Metrics::inc(&state.metrics.books_returned);
            tracing::info!(%book_id, user = %user.username, "book returned");
            Ok(Json(Envelope::new("Book has been returned successfully!", book)))
        }
        LendOutcome::NotFound => Err(AppError::not_found(BOOK_NOT_FOUND)),
        LendOutcome::WrongState => Err(AppError::Conflict("Book is not taken!".to_string())),
        LendOutcome::NotBorrower => {
            Err(AppError::unauthorized("Only the borrower or an admin can return this book!"))
        }
    }
}
