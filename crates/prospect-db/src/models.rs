//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use prospect_types::{AccountId, AccountView, PermissionCode, PermissionId, RoleId};
use sqlx::FromRow;
use uuid::Uuid;

/// Account row from the database
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub federated_id: Option<String>,
    pub profile_pic: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role row from the database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RoleRow {
    pub id: Uuid,
    pub name: String,
}

/// Permission row from the database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PermissionRow {
    pub id: Uuid,
    pub module: String,
    pub name: String,
}

/// A role together with its permissions, loaded eagerly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleWithPermissions {
    pub role: RoleRow,
    pub permissions: Vec<PermissionRow>,
}

/// Refresh token row from the database
#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRow {
    pub id: Uuid,
    pub account_id: Uuid,
    /// SHA-256 hex digest of the issued token string
    pub token_hash: String,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// Conversion implementations from Row types to prospect-types domain types
impl AccountRow {
    /// Convert to domain AccountId
    pub fn account_id(&self) -> AccountId {
        AccountId(self.id)
    }

    /// Whether a local password is set
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Build the client-facing view with the given role names
    pub fn into_view(self, roles: Vec<String>) -> AccountView {
        AccountView {
            id: AccountId(self.id),
            username: self.username,
            email: self.email,
            profile_pic: self.profile_pic,
            is_active: self.is_active,
            roles,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl RoleRow {
    /// Convert to domain RoleId
    pub fn role_id(&self) -> RoleId {
        RoleId(self.id)
    }
}

impl PermissionRow {
    /// Convert to domain PermissionId
    pub fn permission_id(&self) -> PermissionId {
        PermissionId(self.id)
    }

    /// The `module:name` code granted by this permission
    pub fn code(&self) -> PermissionCode {
        PermissionCode::new(&self.module, &self.name)
    }
}

impl RefreshTokenRow {
    /// Convert to domain AccountId
    pub fn account_id(&self) -> AccountId {
        AccountId(self.account_id)
    }

    /// Whether the token has passed its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Usable iff not revoked and `now < expires_at`.
    ///
    /// Revocation and expiry are independent: a row can be both.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired_at(now)
    }

    /// Usable right now
    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_row(revoked: bool, expires_in: Duration) -> RefreshTokenRow {
        let now = Utc::now();
        RefreshTokenRow {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            token_hash: "hash".to_string(),
            revoked,
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn test_refresh_token_usability() {
        assert!(token_row(false, Duration::days(7)).is_usable());
        assert!(!token_row(true, Duration::days(7)).is_usable());
        assert!(!token_row(false, Duration::seconds(-1)).is_usable());
        assert!(!token_row(true, Duration::seconds(-1)).is_usable());
    }

    #[test]
    fn test_refresh_token_expiry_boundary() {
        let row = token_row(false, Duration::hours(1));
        assert!(row.is_usable_at(row.expires_at - Duration::seconds(1)));
        assert!(!row.is_usable_at(row.expires_at));
    }

    #[test]
    fn test_permission_row_code() {
        let row = PermissionRow {
            id: Uuid::new_v4(),
            module: "lead".to_string(),
            name: "view".to_string(),
        };
        assert_eq!(row.code(), PermissionCode::new("lead", "view"));
    }
}
