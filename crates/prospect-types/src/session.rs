//! Token types

use serde::{Deserialize, Serialize};

/// Token pair returned after authentication or refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived)
    pub access_token: String,
    /// Refresh token (long-lived, single use)
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    /// Token type (always "bearer")
    pub token_type: String,
}

impl TokenPair {
    /// Create a bearer token pair
    pub fn bearer(access_token: String, refresh_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            token_type: "bearer".to_string(),
        }
    }
}

/// How a login treats the account's other refresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMode {
    /// Revoke every other unrevoked refresh token of the account
    #[default]
    SingleSession,
    /// Leave other sessions usable
    MultiDevice,
}

impl LoginMode {
    /// Whether prior refresh tokens are revoked on login
    pub const fn revokes_existing(&self) -> bool {
        matches!(self, Self::SingleSession)
    }
}

impl From<bool> for LoginMode {
    /// `true` means revoke old sessions
    fn from(revoke_old: bool) -> Self {
        if revoke_old {
            Self::SingleSession
        } else {
            Self::MultiDevice
        }
    }
}
