use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::types::{BanstatusDto, UserShowDto};

/// A user row joined with its ban status. Holds the password hash, so it never
/// leaves the crate as-is; handlers convert it with [`UserRecord::into_show`].
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: String,
    pub banstatus: BanstatusDto,
}

impl UserRecord {
    pub fn into_show(self) -> UserShowDto {
        UserShowDto {
            id: self.id,
            username: self.username,
            is_admin: self.is_admin,
            created_at: self.created_at,
            banstatus: self.banstatus,
        }
    }
}

const SELECT_USER: &str = r#"SELECT u.id, u.username, u.password_hash, u.is_admin, u.created_at,
        COALESCE(b.is_banned, 0) AS is_banned,
        COALESCE(b.description, 'This user is not banned!') AS ban_description,
        COALESCE(b.updated_at, u.created_at) AS ban_updated_at
    FROM users u LEFT JOIN banstatus b ON b.user_id = u.id"#;

fn user_from_row(row: &SqliteRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
        banstatus: BanstatusDto {
            is_banned: row.try_get("is_banned")?,
            description: row.try_get("ban_description")?,
            updated_at: row.try_get("ban_updated_at")?,
        },
    })
}

/// Inserts the user and its default ban status in one transaction.
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    is_admin: bool,
) -> Result<UserRecord, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO users (id, username, password_hash, is_admin) VALUES (?1, ?2, ?3, ?4)")
        .bind(&id)
        .bind(username)
        .bind(password_hash)
        .bind(is_admin)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO banstatus (user_id) VALUES (?1)").bind(&id).execute(&mut *tx).await?;
    tx.commit().await?;

    find_by_id(pool, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<UserRecord>, sqlx::Error> {
    let sql = format!("{} WHERE u.id = ?1", SELECT_USER);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(user_from_row).transpose()
}

/// Username lookup is case-insensitive (the column uses `COLLATE NOCASE`).
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<UserRecord>, sqlx::Error> {
    let sql = format!("{} WHERE u.username = ?1", SELECT_USER);
    let row = sqlx::query(&sql).bind(username).fetch_optional(pool).await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<UserRecord>, sqlx::Error> {
    let sql = format!("{} ORDER BY u.created_at, u.rowid", SELECT_USER);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(user_from_row).collect()
}

/// Upserts the ban status of `user_id`. Returns `None` when the user does not exist.
pub async fn set_banstatus(
    pool: &SqlitePool,
    user_id: &str,
    is_banned: bool,
    description: &str,
) -> Result<Option<BanstatusDto>, sqlx::Error> {
    if find_by_id(pool, user_id).await?.is_none() {
        return Ok(None);
    }
    sqlx::query(
        r#"INSERT INTO banstatus (user_id, is_banned, description) VALUES (?1, ?2, ?3)
           ON CONFLICT(user_id) DO UPDATE SET is_banned = excluded.is_banned,
               description = excluded.description,
               updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')"#,
    )
    .bind(user_id)
    .bind(is_banned)
    .bind(description)
    .execute(pool)
    .await?;

    Ok(find_by_id(pool, user_id).await?.map(|u| u.banstatus))
}
