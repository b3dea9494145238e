//! Error responses for auth extractors and handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use prospect_auth_core::AuthError;
use serde::Serialize;

/// Error envelope returned to clients
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Why a request was rejected at the auth boundary.
#[derive(Debug, thiserror::Error)]
pub enum AuthRejection {
    /// No `Authorization` header
    #[error("no authentication token provided")]
    MissingToken,

    /// `Authorization` header present but not a usable bearer credential
    #[error("malformed authorization header")]
    InvalidHeader,

    /// Failure reported by the auth core
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl AuthRejection {
    /// HTTP status for this rejection
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::InvalidHeader => StatusCode::BAD_REQUEST,
            Self::Auth(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::InvalidHeader => "INVALID_HEADER",
            Self::Auth(err) => err.error_code(),
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Auth(err) if err.is_server_error() => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        if let Self::Auth(err) = &self {
            if err.is_server_error() {
                tracing::error!(error = %err, "Internal auth error");
            }
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code(),
                message: self.client_message(),
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}

/// Result type for handlers behind the auth extractors
pub type ApiResult<T> = Result<T, AuthRejection>;
