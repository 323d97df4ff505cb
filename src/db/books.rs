use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::types::{format_average_rating, BookDto, BookQuery, NewBook, UpdateBookRequest, DEFAULT_PAGE_SIZE};

const SELECT_BOOK: &str = r#"SELECT b.id, b.title, b.author, b.topic, b.language, b.timestamp,
        b.is_taken, b.taken_by,
        (SELECT AVG(r.rating) FROM reviews r WHERE r.book_id = b.id) AS avg_rating
    FROM books b"#;

const LIKE_ESCAPE: char = '!';

fn escape_like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

fn book_from_row(row: &SqliteRow) -> Result<BookDto, sqlx::Error> {
    let avg: Option<f64> = row.try_get("avg_rating")?;
    Ok(BookDto {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        topic: row.try_get("topic")?,
        language: row.try_get("language")?,
        timestamp: row.try_get("timestamp")?,
        average_rating: format_average_rating(avg),
        is_taken: row.try_get("is_taken")?,
        taken_by: row.try_get("taken_by")?,
    })
}

/// Outcome of a lending state change that can lose against the current state.
#[derive(Debug, Clone, PartialEq)]
pub enum LendOutcome {
    Done(BookDto),
    NotFound,
    /// Borrowing a taken book or returning a book that is not taken.
    WrongState,
    /// Returning a book borrowed by someone else.
    NotBorrower,
}

pub async fn create_book(pool: &SqlitePool, book: &NewBook) -> Result<BookDto, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO books (id, title, author, topic, language) VALUES (?1, ?2, ?3, ?4, ?5)")
        .bind(&id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.topic)
        .bind(&book.language)
        .execute(pool)
        .await?;
    get_book(pool, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_book(pool: &SqlitePool, id: &str) -> Result<Option<BookDto>, sqlx::Error> {
    let sql = format!("{} WHERE b.id = ?1", SELECT_BOOK);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(book_from_row).transpose()
}

/// Lists books newest first, filtered by case-insensitive substring matches.
pub async fn list_books(pool: &SqlitePool, query: &BookQuery) -> Result<Vec<BookDto>, sqlx::Error> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_BOOK);
    qb.push(" WHERE 1 = 1");
    for (column, value) in [
        ("b.title", &query.title),
        ("b.author", &query.author),
        ("b.topic", &query.topic),
        ("b.language", &query.language),
    ] {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            qb.push(format!(" AND {} LIKE ", column))
                .push_bind(format!("%{}%", escape_like_pattern(v)))
                .push(" ESCAPE '!'");
        }
    }
    if let Some(taken) = query.taken {
        qb.push(" AND b.is_taken = ").push_bind(taken);
    }
    qb.push(" ORDER BY b.timestamp DESC, b.rowid DESC LIMIT ")
        .push_bind(query.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .push(" OFFSET ")
        .push_bind(query.offset.unwrap_or(0));

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(book_from_row).collect()
}

/// Applies the present fields. Returns `None` when the book does not exist.
pub async fn update_book(
    pool: &SqlitePool,
    id: &str,
    changes: &UpdateBookRequest,
) -> Result<Option<BookDto>, sqlx::Error> {
    let res = sqlx::query(
        r#"UPDATE books SET title = COALESCE(?1, title), author = COALESCE(?2, author),
               topic = COALESCE(?3, topic), language = COALESCE(?4, language)
           WHERE id = ?5"#,
    )
    .bind(&changes.title)
    .bind(&changes.author)
    .bind(&changes.topic)
    .bind(&changes.language)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Ok(None);
    }
    get_book(pool, id).await
}

/// Deletes the book (reviews cascade) and returns it as it was before deletion.
pub async fn delete_book(pool: &SqlitePool, id: &str) -> Result<Option<BookDto>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let sql = format!("{} WHERE b.id = ?1", SELECT_BOOK);
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *tx).await?;
    let Some(book) = row.as_ref().map(book_from_row).transpose()? else {
        return Ok(None);
    };
    sqlx::query("DELETE FROM books WHERE id = ?1").bind(id).execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(Some(book))
}

/// Marks the book as taken by `user_id`. The conditional update makes concurrent
/// borrowers race on the row: exactly one of them sees `Done`.
pub async fn borrow_book(pool: &SqlitePool, id: &str, user_id: &str) -> Result<LendOutcome, sqlx::Error> {
    let res = sqlx::query("UPDATE books SET is_taken = 1, taken_by = ?1 WHERE id = ?2 AND is_taken = 0")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 1 {
        return Ok(get_book(pool, id).await?.map_or(LendOutcome::NotFound, LendOutcome::Done));
    }
    Ok(match get_book(pool, id).await? {
        None => LendOutcome::NotFound,
        Some(_) => LendOutcome::WrongState,
    })
}

/// Clears the taken flag. Only the borrower may return a book unless `as_admin` is set.
pub async fn return_book(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    as_admin: bool,
) -> Result<LendOutcome, sqlx::Error> {
    let Some(book) = get_book(pool, id).await? else {
        return Ok(LendOutcome::NotFound);
    };
    if !book.is_taken {
        return Ok(LendOutcome::WrongState);
    }
    if !as_admin && book.taken_by.as_deref() != Some(user_id) {
        return Ok(LendOutcome::NotBorrower);
    }

    let res = sqlx::query(
        "UPDATE books SET is_taken = 0, taken_by = NULL WHERE id = ?1 AND is_taken = 1 AND taken_by IS ?2",
    )
    .bind(id)
    .bind(&book.taken_by)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        // Lost a race against another return
        return Ok(LendOutcome::WrongState);
    }
    Ok(get_book(pool, id).await?.map_or(LendOutcome::NotFound, LendOutcome::Done))
}
