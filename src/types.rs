use serde::{Deserialize, Serialize};

use crate::error::{
    validation::{validate_optional_text, validate_password, validate_rating, validate_text, validate_username},
    AppError, AppResult,
};

pub const DEFAULT_BAN_DESCRIPTION: &str = "This user is not banned!";

/// Success envelope returned by every mutating endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self { message: message.into(), data }
    }
}

// ---------------------------------------------------------------------------
// Books

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookDto {
    pub id: String,
    pub title: String,
    pub author: String,
    pub topic: String,
    pub language: String,
    pub timestamp: String,
    /// Mean review rating with two decimals, `"0.00"` without reviews.
    pub average_rating: String,
    pub is_taken: bool,
    pub taken_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookWithReviewsDto {
    #[serde(flatten)]
    pub book: BookDto,
    pub reviews: Vec<ReviewDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub topic: String,
    pub language: String,
}

/// A create request whose fields have been trimmed and checked.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub topic: String,
    pub language: String,
}

impl CreateBookRequest {
    pub fn validate(&self) -> AppResult<NewBook> {
        Ok(NewBook {
            title: validate_text("title", &self.title, 1, 200)?,
            author: validate_text("author", &self.author, 1, 200)?,
            topic: validate_text("topic", &self.topic, 1, 100)?,
            language: validate_text("language", &self.language, 1, 50)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub topic: Option<String>,
    pub language: Option<String>,
}

impl UpdateBookRequest {
    /// Returns the trimmed changes; at least one field must be present.
    pub fn validate(&self) -> AppResult<UpdateBookRequest> {
        let changes = UpdateBookRequest {
            title: validate_optional_text("title", self.title.as_deref(), 1, 200)?,
            author: validate_optional_text("author", self.author.as_deref(), 1, 200)?,
            topic: validate_optional_text("topic", self.topic.as_deref(), 1, 100)?,
            language: validate_optional_text("language", self.language.as_deref(), 1, 50)?,
        };
        if changes == UpdateBookRequest::default() {
            return Err(AppError::BadRequest("At least one field must be provided".to_string()));
        }
        Ok(changes)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub topic: Option<String>,
    pub language: Option<String>,
    pub taken: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

impl BookQuery {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(limit) = self.limit {
            if !(1..=MAX_PAGE_SIZE).contains(&limit) {
                return Err(AppError::validation(
                    "limit",
                    format!("Value must be between 1 and {}", MAX_PAGE_SIZE),
                ));
            }
        }
        if let Some(offset) = self.offset {
            if offset < 0 {
                return Err(AppError::validation("offset", "Value must not be negative"));
            }
        }
        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("topic", &self.topic),
            ("language", &self.language),
        ] {
            if let Some(v) = value {
                if v.chars().count() > 200 {
                    return Err(AppError::validation(field, "Filter must be at most 200 characters"));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reviews

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDto {
    pub id: String,
    pub book_id: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub rating: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub content: String,
    pub rating: i64,
}

impl CreateReviewRequest {
    pub fn validate(&self) -> AppResult<(String, i64)> {
        Ok((validate_text("content", &self.content, 1, 2000)?, validate_rating(self.rating)?))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateReviewRequest {
    pub content: Option<String>,
    pub rating: Option<i64>,
}

impl UpdateReviewRequest {
    pub fn validate(&self) -> AppResult<UpdateReviewRequest> {
        let changes = UpdateReviewRequest {
            content: validate_optional_text("content", self.content.as_deref(), 1, 2000)?,
            rating: self.rating.map(validate_rating).transpose()?,
        };
        if changes == UpdateReviewRequest::default() {
            return Err(AppError::BadRequest("At least one field must be provided".to_string()));
        }
        Ok(changes)
    }
}

// ---------------------------------------------------------------------------
// Users, bans and authentication

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BanstatusDto {
    pub is_banned: bool,
    pub description: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserShowDto {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
    pub created_at: String,
    pub banstatus: BanstatusDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

impl RegisterRequest {
    /// Returns the normalized username.
    pub fn validate(&self) -> AppResult<String> {
        let username = validate_username(&self.username)?;
        validate_password(&self.password)?;
        Ok(username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserShowDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBanstatusRequest {
    pub is_banned: bool,
    pub description: Option<String>,
}

impl UpdateBanstatusRequest {
    /// Resolves the description to store: the given text, a generic reason for bans,
    /// or the default text when lifting a ban.
    pub fn validate(&self) -> AppResult<(bool, String)> {
        let description = validate_optional_text("description", self.description.as_deref(), 1, 500)?;
        let description = match (self.is_banned, description) {
            (_, Some(d)) => d,
            (true, None) => "This user has been banned by an admin.".to_string(),
            (false, None) => DEFAULT_BAN_DESCRIPTION.to_string(),
        };
        Ok((self.is_banned, description))
    }
}

/// Formats the average of review ratings the way `BookDto::average_rating` exposes it.
pub fn format_average_rating(avg: Option<f64>) -> String {
    format!("{:.2}", avg.unwrap_or(0.0))
}
