//! Configuration for the Auth API service.

use chrono::Duration;
use prospect_auth_core::{AuthConfig, GoogleConfig, SuperadminSeed};

/// Auth API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,

    /// Database URL
    pub database_url: String,

    /// Auth core configuration
    pub auth: AuthConfig,

    /// Google federated login; disabled when unset
    pub google: Option<GoogleConfig>,

    /// Default superadmin account seeded at startup
    pub superadmin: Option<SuperadminSeed>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Database
        let database_url =
            lookup("APP_DATABASE_URL").ok_or(ConfigError::Missing("APP_DATABASE_URL"))?;

        // Server port
        let http_port = parse_or(&lookup, "APP_HTTP_PORT", 8080)?;

        // Token signing
        let secret_key = lookup("APP_SECRET_KEY").ok_or(ConfigError::Missing("APP_SECRET_KEY"))?;
        let algorithm = lookup("APP_ALGORITHM").unwrap_or_else(|| "HS256".to_string());
        let algorithm = AuthConfig::parse_algorithm(&algorithm)
            .map_err(|e| ConfigError::AuthConfig(e.to_string()))?;

        // Token lifetimes
        let access_minutes: i64 = parse_or(&lookup, "APP_ACCESS_TOKEN_EXPIRE_MINUTES", 15)?;
        let refresh_minutes: i64 = parse_or(&lookup, "APP_REFRESH_TOKEN_EXPIRE_MINUTES", 10080)?;
        if access_minutes <= 0 {
            return Err(ConfigError::Invalid("APP_ACCESS_TOKEN_EXPIRE_MINUTES"));
        }
        if refresh_minutes <= 0 {
            return Err(ConfigError::Invalid("APP_REFRESH_TOKEN_EXPIRE_MINUTES"));
        }

        // bcrypt cost
        let password_hash_cost: u32 = parse_or(&lookup, "APP_PASSWORD_HASH_COST", 12)?;
        if !(4..=31).contains(&password_hash_cost) {
            return Err(ConfigError::Invalid("APP_PASSWORD_HASH_COST"));
        }

        let auth = AuthConfig::try_new(secret_key, algorithm)
            .map_err(|e| ConfigError::AuthConfig(e.to_string()))?
            .with_access_token_ttl(Duration::minutes(access_minutes))
            .with_refresh_token_ttl(Duration::minutes(refresh_minutes))
            .with_password_hash_cost(password_hash_cost);

        let google = match (
            lookup("APP_GOOGLE_CLIENT_ID"),
            lookup("APP_GOOGLE_CLIENT_SECRET"),
            lookup("APP_GOOGLE_REDIRECT_URI"),
        ) {
            (Some(id), Some(secret), Some(redirect)) => {
                Some(GoogleConfig::new(id, secret, redirect))
            }
            (None, None, None) => None,
            _ => return Err(ConfigError::Incomplete("APP_GOOGLE_*")),
        };

        let superadmin = match (
            lookup("APP_SUPERADMIN_USERNAME"),
            lookup("APP_SUPERADMIN_EMAIL"),
            lookup("APP_SUPERADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(SuperadminSeed {
                username,
                email,
                password,
            }),
            (None, None, None) => None,
            _ => return Err(ConfigError::Incomplete("APP_SUPERADMIN_*")),
        };

        Ok(Self {
            http_port,
            database_url,
            auth,
            google,
            superadmin,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Variables {0} must be set together")]
    Incomplete(&'static str),

    #[error("Auth config error: {0}")]
    AuthConfig(String),
}
