use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`. Only enable
    /// behind a reverse proxy that overwrites these headers.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    /// Admin account created at startup when both fields are set.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub max_body_bytes: usize,
    pub login_per_minute: usize,
    pub register_per_minute: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub limits: LimitsConfig,
    pub security: Option<SecurityConfig>,
}

/// Reasons a loaded configuration is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid server.port: {0}")]
    InvalidPort(u16),
    #[error("database.max_connections must be > 0")]
    NoConnections,
    #[error("auth.jwt_secret must be at least 32 bytes")]
    WeakSecret,
    #[error("auth.jwt_secret is still the shipped placeholder; set BUECHEREI__AUTH__JWT_SECRET")]
    PlaceholderSecret,
    #[error("auth.token_ttl_hours must be in 1..=720, got {0}")]
    InvalidTokenTtl(i64),
    #[error("auth.bcrypt_cost must be in 4..=31, got {0}")]
    InvalidBcryptCost(u32),
    #[error("auth.admin_username and auth.admin_password must be set together")]
    IncompleteAdmin,
    #[error("limits.{0} must be > 0")]
    ZeroLimit(&'static str),
}

pub const MIN_SECRET_LEN: usize = 32;

/// The value of `auth.jwt_secret` in the embedded defaults. Public knowledge, so never accepted.
pub const PLACEHOLDER_SECRET: &str = "change-me-change-me-change-me-change-me";

const DEFAULTS: &str = include_str!("../config/default.toml");

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        // Optional local file: buecherei.toml (in CWD)
        .add_source(::config::File::with_name("buecherei").required(false));

    if let Ok(custom_path) = std::env::var("BUECHEREI_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("BUECHEREI").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    if cfg.server.port == 0 {
        return Err(ConfigError::InvalidPort(cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    if cfg.database.max_connections == 0 {
        return Err(ConfigError::NoConnections);
    }

    let auth = &cfg.auth;
    if auth.jwt_secret == PLACEHOLDER_SECRET {
        return Err(ConfigError::PlaceholderSecret);
    }
    if auth.jwt_secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::WeakSecret);
    }
    if !(1..=720).contains(&auth.token_ttl_hours) {
        return Err(ConfigError::InvalidTokenTtl(auth.token_ttl_hours));
    }
    if !(4..=31).contains(&auth.bcrypt_cost) {
        return Err(ConfigError::InvalidBcryptCost(auth.bcrypt_cost));
    }
    if auth.admin_username.is_some() != auth.admin_password.is_some() {
        return Err(ConfigError::IncompleteAdmin);
    }

    if cfg.limits.max_body_bytes == 0 {
        return Err(ConfigError::ZeroLimit("max_body_bytes"));
    }
    if cfg.limits.login_per_minute == 0 {
        return Err(ConfigError::ZeroLimit("login_per_minute"));
    }
    if cfg.limits.register_per_minute == 0 {
        return Err(ConfigError::ZeroLimit("register_per_minute"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
