//! Token issuing/verification and password hashing.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::{sync::OnceCell, task};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    /// Admin flag at issue time. The guard re-reads it from the database.
    pub adm: bool,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// HS256 token service plus bcrypt settings.
#[derive(Clone)]
pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    bcrypt_cost: u32,
    /// Hash checked against when the username is unknown, so both login paths pay bcrypt.
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            ttl: Duration::hours(cfg.token_ttl_hours),
            bcrypt_cost: cfg.bcrypt_cost,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn issue_token(&self, user_id: &str, username: &str, is_admin: bool) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            adm: is_admin,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// bcrypt is CPU-bound, so it runs on the blocking pool.
    pub async fn hash_password(&self, password: String) -> AppResult<String> {
        let cost = self.bcrypt_cost;
        let hashed = task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("hashing task failed: {}", e)))??;
        Ok(hashed)
    }

    pub async fn verify_password(&self, password: String, hash: String) -> AppResult<bool> {
        let ok = task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("verification task failed: {}", e)))??;
        Ok(ok)
    }

    /// Runs a verification against a throwaway hash of the configured cost. Always `false`.
    pub async fn verify_dummy_password(&self, password: String) -> AppResult<bool> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| self.hash_password(Uuid::new_v4().to_string()))
            .await?
            .clone();
        self.verify_password(password, hash).await?;
        Ok(false)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Creates the configured admin account unless a user with that name exists.
pub async fn ensure_admin(state: &AppState) -> anyhow::Result<()> {
    let cfg = &state.config.auth;
    let (Some(username), Some(password)) = (cfg.admin_username.as_deref(), cfg.admin_password.as_deref()) else {
        return Ok(());
    };
    let username = crate::error::validation::validate_username(username)
        .map_err(|e| anyhow::anyhow!("invalid auth.admin_username: {}", e))?;
    crate::error::validation::validate_password(password)
        .map_err(|e| anyhow::anyhow!("invalid auth.admin_password: {}", e))?;

    if let Some(existing) = db::users::find_by_username(&state.db, &username).await? {
        if !existing.is_admin {
            tracing::warn!(%username, "configured admin name belongs to a regular user; not promoting");
        }
        return Ok(());
    }
    let hash = state
        .auth
        .hash_password(password.to_string())
        .await
        .map_err(|e| anyhow::anyhow!("failed to hash admin password: {}", e))?;
    let admin = db::users::create_user(&state.db, &username, &hash, true).await?;
    tracing::info!(user_id = %admin.id, %username, "admin account created");
    Ok(())
}
