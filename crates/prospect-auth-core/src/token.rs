//! Signed bearer tokens (access and refresh)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use prospect_types::AccountId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AuthConfig, AuthError};

/// Which flow a token may be presented to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by every token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account id)
    pub sub: String,
    /// Expiration timestamp (seconds)
    pub exp: i64,
    /// Issued at timestamp (seconds)
    pub iat: i64,
    /// Unique token id, refresh tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Token kind
    pub typ: TokenKind,
}

/// A freshly signed token and its absolute expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Encodes and verifies signed tokens with the process-wide secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    /// Build a codec from validated config
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(config.algorithm);
        validation.leeway = 0;
        validation.validate_aud = false;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            header: Header::new(config.algorithm),
            validation,
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        }
    }

    /// Configured access token lifetime
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Configured refresh token lifetime
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue an access token with the configured lifetime
    pub fn issue_access(&self, subject: AccountId) -> Result<IssuedToken, AuthError> {
        self.issue_access_with_ttl(subject, self.access_ttl)
    }

    /// Issue an access token with an explicit lifetime
    pub fn issue_access_with_ttl(
        &self,
        subject: AccountId,
        ttl: Duration,
    ) -> Result<IssuedToken, AuthError> {
        self.issue(subject, TokenKind::Access, ttl, None)
    }

    /// Issue a refresh token with the configured lifetime
    pub fn issue_refresh(&self, subject: AccountId) -> Result<IssuedToken, AuthError> {
        self.issue_refresh_with_ttl(subject, self.refresh_ttl)
    }

    /// Issue a refresh token with an explicit lifetime.
    ///
    /// Every refresh token carries a fresh random `jti`, so two tokens for
    /// the same subject in the same second are still distinct strings.
    pub fn issue_refresh_with_ttl(
        &self,
        subject: AccountId,
        ttl: Duration,
    ) -> Result<IssuedToken, AuthError> {
        self.issue(
            subject,
            TokenKind::Refresh,
            ttl,
            Some(Uuid::new_v4().to_string()),
        )
    }

    fn issue(
        &self,
        subject: AccountId,
        typ: TokenKind,
        ttl: Duration,
        jti: Option<String>,
    ) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = Claims {
            sub: subject.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti,
            typ,
        };

        let token = encode(&self.header, &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign token: {}", e);
            AuthError::Internal("failed to sign token".to_string())
        })?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Check signature and expiry and return the claims
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::TokenInvalid,
                }
            })
    }

    /// Verify a token of either kind and return its subject
    pub fn verify(&self, token: &str) -> Result<AccountId, AuthError> {
        let claims = self.decode(token)?;
        parse_subject(&claims)
    }

    /// Verify a token and require it to be of `kind`
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<AccountId, AuthError> {
        let claims = self.decode(token)?;
        if claims.typ != kind {
            tracing::debug!(expected = ?kind, got = ?claims.typ, "Token kind mismatch");
            return Err(AuthError::TokenInvalid);
        }
        parse_subject(&claims)
    }
}

fn parse_subject(claims: &Claims) -> Result<AccountId, AuthError> {
    AccountId::parse(&claims.sub).map_err(|_| {
        tracing::debug!("Token subject is not an account id");
        AuthError::TokenInvalid
    })
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.header.alg)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}
