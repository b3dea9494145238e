//! Repository traits
//!
//! Define async repository interfaces for database operations. Every method
//! that writes more than one statement runs in a single transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::*;

/// Account repository trait
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AccountRow>>;

    /// Find an account by email
    async fn find_by_email(&self, email: &str) -> DbResult<Option<AccountRow>>;

    /// Find an account by username
    async fn find_by_username(&self, username: &str) -> DbResult<Option<AccountRow>>;

    /// Find an account by federated identity subject
    async fn find_by_federated_id(&self, federated_id: &str) -> DbResult<Option<AccountRow>>;

    /// List all accounts, oldest first
    async fn list(&self) -> DbResult<Vec<AccountRow>>;

    /// Create an account and link its roles
    async fn create(&self, account: CreateAccount) -> DbResult<AccountRow>;

    /// Apply a partial update; `role_ids`, when present, replaces the role set.
    ///
    /// Returns [`DbError::NotFound`](crate::DbError::NotFound) for an unknown id.
    async fn update(&self, id: Uuid, update: UpdateAccount) -> DbResult<AccountRow>;

    /// Attach a federated identity (and picture) to an existing account
    async fn link_federated_identity(
        &self,
        id: Uuid,
        federated_id: &str,
        profile_pic: Option<&str>,
    ) -> DbResult<AccountRow>;

    /// Update the profile picture
    async fn update_profile_pic(&self, id: Uuid, profile_pic: &str) -> DbResult<()>;

    /// Names of the roles assigned to an account
    async fn role_names(&self, id: Uuid) -> DbResult<Vec<String>>;

    /// Delete an account; returns false when it did not exist
    async fn delete(&self, id: Uuid) -> DbResult<bool>;
}

/// Create account input
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub federated_id: Option<String>,
    pub profile_pic: Option<String>,
    pub role_ids: Vec<Uuid>,
}

/// Partial account update
#[derive(Debug, Clone, Default)]
pub struct UpdateAccount {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub role_ids: Option<Vec<Uuid>>,
}

/// Role repository trait
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Find a role by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<RoleRow>>;

    /// Find a role by its unique name
    async fn find_by_name(&self, name: &str) -> DbResult<Option<RoleRow>>;

    /// List roles ordered by name
    async fn list(&self) -> DbResult<Vec<RoleRow>>;

    /// Create a role
    async fn create(&self, role: CreateRole) -> DbResult<RoleRow>;

    /// Rename a role; `None` when it does not exist
    async fn rename(&self, id: Uuid, name: &str) -> DbResult<Option<RoleRow>>;

    /// Delete a role; returns false when it did not exist
    async fn delete(&self, id: Uuid) -> DbResult<bool>;

    /// Permissions currently granted to a role
    async fn permissions(&self, id: Uuid) -> DbResult<Vec<PermissionRow>>;

    /// Replace the role's permission set.
    ///
    /// Returns [`DbError::NotFound`](crate::DbError::NotFound) for an unknown role.
    async fn set_permissions(&self, id: Uuid, permission_ids: &[Uuid]) -> DbResult<()>;

    /// Roles assigned to an account, each with its permissions
    async fn find_for_account(&self, account_id: Uuid) -> DbResult<Vec<RoleWithPermissions>>;
}

/// Create role input
#[derive(Debug, Clone)]
pub struct CreateRole {
    pub id: Uuid,
    pub name: String,
}

/// Permission repository trait
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Find a permission by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<PermissionRow>>;

    /// Find a permission by module and name
    async fn find_by_code(&self, module: &str, name: &str) -> DbResult<Option<PermissionRow>>;

    /// List permissions ordered by module, then name
    async fn list(&self) -> DbResult<Vec<PermissionRow>>;

    /// Create a permission
    async fn create(&self, permission: CreatePermission) -> DbResult<PermissionRow>;

    /// Rename a permission; `None` when it does not exist
    async fn rename(&self, id: Uuid, name: &str) -> DbResult<Option<PermissionRow>>;

    /// Delete a permission; returns false when it did not exist
    async fn delete(&self, id: Uuid) -> DbResult<bool>;
}

/// Create permission input
#[derive(Debug, Clone)]
pub struct CreatePermission {
    pub id: Uuid,
    pub module: String,
    pub name: String,
}

/// Refresh token repository trait
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Find a token record by the digest of its token string
    async fn find_by_token_hash(&self, token_hash: &str) -> DbResult<Option<RefreshTokenRow>>;

    /// All token records of an account, newest first
    async fn find_by_account_id(&self, account_id: Uuid) -> DbResult<Vec<RefreshTokenRow>>;

    /// Persist a new unrevoked token.
    ///
    /// With `revoke_existing`, every unrevoked token of the same account is
    /// revoked in the same transaction.
    async fn create(
        &self,
        token: CreateRefreshToken,
        revoke_existing: bool,
    ) -> DbResult<RefreshTokenRow>;

    /// Mark a token revoked; returns false when no record matches.
    ///
    /// Revoking an already revoked token succeeds.
    async fn revoke(&self, token_hash: &str) -> DbResult<bool>;

    /// Revoke every unrevoked token of an account; returns the number flipped
    async fn revoke_all_for_account(&self, account_id: Uuid) -> DbResult<u64>;

    /// Single-use exchange: revoke the presented token and persist its successor.
    ///
    /// The presented token is revoked only if it belongs to the successor's
    /// account, is unrevoked and unexpired at `now`. Returns `None` (and
    /// writes nothing) otherwise.
    async fn rotate(
        &self,
        presented_hash: &str,
        successor: CreateRefreshToken,
        now: DateTime<Utc>,
    ) -> DbResult<Option<RefreshTokenRow>>;
}

/// Create refresh token input
#[derive(Debug, Clone)]
pub struct CreateRefreshToken {
    pub id: Uuid,
    pub account_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
