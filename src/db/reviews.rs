use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::types::{ReviewDto, UpdateReviewRequest};

const SELECT_REVIEW: &str = r#"SELECT r.id, r.book_id, r.user_id, u.username, r.content, r.rating,
        r.created_at, r.updated_at
    FROM reviews r JOIN users u ON u.id = r.user_id"#;

fn review_from_row(row: &SqliteRow) -> Result<ReviewDto, sqlx::Error> {
    Ok(ReviewDto {
        id: row.try_get("id")?,
        book_id: row.try_get("book_id")?,
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        content: row.try_get("content")?,
        rating: row.try_get("rating")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Fails with a unique violation when the user already reviewed the book.
pub async fn create_review(
    pool: &SqlitePool,
    book_id: &str,
    user_id: &str,
    content: &str,
    rating: i64,
) -> Result<ReviewDto, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO reviews (id, book_id, user_id, content, rating) VALUES (?1, ?2, ?3, ?4, ?5)")
        .bind(&id)
        .bind(book_id)
        .bind(user_id)
        .bind(content)
        .bind(rating)
        .execute(pool)
        .await?;
    get_review(pool, book_id, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Looks a review up within its book; a review id under the wrong book is absent.
pub async fn get_review(pool: &SqlitePool, book_id: &str, id: &str) -> Result<Option<ReviewDto>, sqlx::Error> {
    let sql = format!("{} WHERE r.id = ?1 AND r.book_id = ?2", SELECT_REVIEW);
    let row = sqlx::query(&sql).bind(id).bind(book_id).fetch_optional(pool).await?;
    row.as_ref().map(review_from_row).transpose()
}

pub async fn list_for_book(pool: &SqlitePool, book_id: &str) -> Result<Vec<ReviewDto>, sqlx::Error> {
    let sql = format!("{} WHERE r.book_id = ?1 ORDER BY r.created_at, r.rowid", SELECT_REVIEW);
    let rows = sqlx::query(&sql).bind(book_id).fetch_all(pool).await?;
    rows.iter().map(review_from_row).collect()
}

pub async fn update_review(
    pool: &SqlitePool,
    book_id: &str,
    id: &str,
    changes: &UpdateReviewRequest,
) -> Result<Option<ReviewDto>, sqlx::Error> {
    let res = sqlx::query(
        r#"UPDATE reviews SET content = COALESCE(?1, content), rating = COALESCE(?2, rating),
               updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
           WHERE id = ?3 AND book_id = ?4"#,
    )
    .bind(&changes.content)
    .bind(changes.rating)
    .bind(id)
    .bind(book_id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Ok(None);
    }
    get_review(pool, book_id, id).await
}

pub async fn delete_review(pool: &SqlitePool, book_id: &str, id: &str) -> Result<Option<ReviewDto>, sqlx::Error> {
    let Some(review) = get_review(pool, book_id, id).await? else {
        return Ok(None);
    };
    sqlx::query("DELETE FROM reviews WHERE id = ?1").bind(id).execute(pool).await?;
    Ok(Some(review))
}
