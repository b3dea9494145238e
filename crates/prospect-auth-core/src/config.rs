//! Configuration types for the auth core

use chrono::Duration;
use jsonwebtoken::Algorithm;

use crate::AuthError;

/// Auth core configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared HMAC secret used to sign and verify tokens
    pub secret_key: String,
    /// Signing algorithm (HMAC family only)
    pub algorithm: Algorithm,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// bcrypt cost factor
    pub password_hash_cost: u32,
    /// Role attached to every newly registered account
    pub default_role: String,
}

impl AuthConfig {
    /// Minimum secret length in bytes (256 bits)
    pub const MIN_SECRET_LENGTH: usize = 32;

    /// Create a validated config with default lifetimes (15 minutes / 7 days)
    pub fn try_new(secret_key: impl Into<String>, algorithm: Algorithm) -> Result<Self, AuthError> {
        let secret_key = secret_key.into();
        if secret_key.len() < Self::MIN_SECRET_LENGTH {
            return Err(AuthError::Configuration(format!(
                "secret key too short: got {} bytes, need at least {}",
                secret_key.len(),
                Self::MIN_SECRET_LENGTH
            )));
        }
        if !is_hmac(algorithm) {
            return Err(AuthError::Configuration(format!(
                "algorithm {algorithm:?} is not supported, use HS256, HS384 or HS512"
            )));
        }

        Ok(Self {
            secret_key,
            algorithm,
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            password_hash_cost: bcrypt::DEFAULT_COST,
            default_role: crate::bootstrap::DEFAULT_ROLE.to_string(),
        })
    }

    /// Parse an algorithm name such as `HS256`
    pub fn parse_algorithm(name: &str) -> Result<Algorithm, AuthError> {
        let algorithm: Algorithm = name
            .parse()
            .map_err(|_| AuthError::Configuration(format!("unknown algorithm: {name}")))?;
        if !is_hmac(algorithm) {
            return Err(AuthError::Configuration(format!(
                "algorithm {name} is not supported, use HS256, HS384 or HS512"
            )));
        }
        Ok(algorithm)
    }

    /// Set access token lifetime
    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    /// Set refresh token lifetime
    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Set bcrypt cost
    pub fn with_password_hash_cost(mut self, cost: u32) -> Self {
        self.password_hash_cost = cost;
        self
    }

    /// Set the role given to new accounts
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }
}

fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    )
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key_length", &self.secret_key.len())
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("password_hash_cost", &self.password_hash_cost)
            .field("default_role", &self.default_role)
            .finish()
    }
}
