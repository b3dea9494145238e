//! Auth errors

use prospect_db::DbError;
use prospect_types::PermissionCode;
use thiserror::Error;

/// Authentication and authorization errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// A unique field (username, email, role name, ...) is already taken
    #[error("conflict: {0}")]
    Conflict(String),

    /// Wrong password, unknown email or no local password
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token signature was valid but its expiry has passed
    #[error("token expired")]
    TokenExpired,

    /// Token is malformed, badly signed, of the wrong kind or names no valid subject
    #[error("invalid token")]
    TokenInvalid,

    /// Token was well-formed but the session behind it is not usable
    #[error("unauthorized")]
    Unauthorized,

    /// Entity or token absent where presence was required
    #[error("not found: {0}")]
    NotFound(String),

    /// Authenticated but lacking the required permission
    #[error("missing permission {0}")]
    Forbidden(PermissionCode),

    /// Request validation failure
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Identity provider exchange failed or returned unusable data
    #[error("federated identity error: {0}")]
    FederatedIdentity(String),

    /// Persistence failure; the in-flight transaction was rolled back
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Conflict(_) => 409,
            Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::Unauthorized => 401,
            Self::NotFound(_) => 404,
            Self::Forbidden(_) => 403,
            Self::InvalidInput(_) | Self::FederatedIdentity(_) => 400,
            Self::Storage(_) | Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid => "INVALID_TOKEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::FederatedIdentity(_) => "FEDERATED_IDENTITY_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the error is a server-side fault whose details stay in the logs
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation(constraint) => {
                tracing::debug!(constraint = %constraint, "Unique constraint rejected write");
                Self::Conflict(conflict_message(&constraint).to_string())
            }
            DbError::NotFound => Self::NotFound("record".to_string()),
            other => {
                tracing::error!("Database error: {}", other);
                Self::Storage(other.to_string())
            }
        }
    }
}

/// Human readable message for a named unique constraint
fn conflict_message(constraint: &str) -> &'static str {
    match constraint {
        "accounts_username_key" => "username already registered",
        "accounts_email_key" => "email already registered",
        "accounts_federated_id_key" => "federated identity already linked",
        "roles_name_key" => "role already exists",
        "permissions_module_name_key" => "permission already exists",
        _ => "resource already exists",
    }
}
