//! Administrative CRUD over accounts, roles and permissions

use prospect_db::{
    AccountRepository, AccountRow, CreateAccount, CreatePermission, CreateRole, DbError,
    PermissionRepository, PermissionRow, RoleRepository, RoleRow, RoleWithPermissions,
    UpdateAccount,
};
use prospect_types::{AccountId, AccountView, PermissionId, RoleId};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::account::validate_identity;
use crate::{AuthError, PasswordHasher, BUILTIN_ROLES};

/// Account created by an administrator
#[derive(Clone)]
pub struct NewManagedAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role_ids: Vec<RoleId>,
}

impl std::fmt::Debug for NewManagedAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewManagedAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role_ids", &self.role_ids)
            .finish_non_exhaustive()
    }
}

/// Partial account update; `None` leaves a field unchanged
#[derive(Clone, Default)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces the role set when present
    pub role_ids: Option<Vec<RoleId>>,
}

impl std::fmt::Debug for AccountChanges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountChanges")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("is_active", &self.is_active)
            .field("role_ids", &self.role_ids)
            .finish()
    }
}

/// User, role and permission administration
pub struct DirectoryService<A, R, P>
where
    A: AccountRepository,
    R: RoleRepository,
    P: PermissionRepository,
{
    accounts: Arc<A>,
    roles: Arc<R>,
    permissions: Arc<P>,
    hasher: PasswordHasher,
}

impl<A, R, P> DirectoryService<A, R, P>
where
    A: AccountRepository,
    R: RoleRepository,
    P: PermissionRepository,
{
    /// Create a new directory service
    pub fn new(accounts: Arc<A>, roles: Arc<R>, permissions: Arc<P>, hasher: PasswordHasher) -> Self {
        Self {
            accounts,
            roles,
            permissions,
            hasher,
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// List every account with its role names
    pub async fn list_accounts(&self) -> Result<Vec<AccountView>, AuthError> {
        let rows = self.accounts.list().await?;
        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            views.push(self.view(row).await?);
        }
        Ok(views)
    }

    /// Get one account
    pub async fn get_account(&self, id: AccountId) -> Result<AccountView, AuthError> {
        let row = self.find_account(id).await?;
        self.view(row).await
    }

    /// Create an account with explicit roles
    pub async fn create_account(&self, new: NewManagedAccount) -> Result<AccountView, AuthError> {
        let username = new.username.trim().to_string();
        let email = new.email.trim().to_string();
        validate_identity(&username, &email)?;
        PasswordHasher::validate(&new.password)?;

        if self.accounts.find_by_username(&username).await?.is_some() {
            return Err(AuthError::Conflict("username already registered".to_string()));
        }
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict("email already registered".to_string()));
        }

        let role_ids = self.existing_roles(&new.role_ids).await?;
        let password_hash = self.hasher.hash_blocking(&new.password).await?;

        let row = self
            .accounts
            .create(CreateAccount {
                id: Uuid::new_v4(),
                username,
                email,
                password_hash: Some(password_hash),
                federated_id: None,
                profile_pic: None,
                role_ids,
            })
            .await?;

        tracing::info!(account_id = %row.id, "Account created by administrator");
        self.view(row).await
    }

    /// Apply a partial update
    pub async fn update_account(
        &self,
        id: AccountId,
        changes: AccountChanges,
    ) -> Result<AccountView, AuthError> {
        let current = self.find_account(id).await?;

        let username = changes.username.map(|u| u.trim().to_string());
        let email = changes.email.map(|e| e.trim().to_string());
        validate_identity(
            username.as_deref().unwrap_or(&current.username),
            email.as_deref().unwrap_or(&current.email),
        )?;

        if let Some(username) = username.as_deref().filter(|u| *u != current.username) {
            if self.accounts.find_by_username(username).await?.is_some() {
                return Err(AuthError::Conflict("username already registered".to_string()));
            }
        }
        if let Some(email) = email.as_deref().filter(|e| *e != current.email) {
            if self.accounts.find_by_email(email).await?.is_some() {
                return Err(AuthError::Conflict("email already registered".to_string()));
            }
        }

        let password_hash = match changes.password.as_deref() {
            Some(password) => {
                PasswordHasher::validate(password)?;
                Some(self.hasher.hash_blocking(password).await?)
            }
            None => None,
        };

        let role_ids = match changes.role_ids.as_deref() {
            Some(ids) => Some(self.existing_roles(ids).await?),
            None => None,
        };

        let update = UpdateAccount {
            username,
            email,
            password_hash,
            is_active: changes.is_active,
            role_ids,
        };
        let row = self
            .accounts
            .update(current.id, update)
            .await
            .map_err(|e| not_found_as(e, "account"))?;

        tracing::info!(account_id = %row.id, "Account updated");
        self.view(row).await
    }

    /// Delete an account (its role links and refresh tokens go with it)
    pub async fn delete_account(&self, id: AccountId) -> Result<(), AuthError> {
        if !self.accounts.delete(id.0).await? {
            return Err(AuthError::NotFound("account".to_string()));
        }
        tracing::info!(account_id = %id, "Account deleted");
        Ok(())
    }

    async fn find_account(&self, id: AccountId) -> Result<AccountRow, AuthError> {
        self.accounts
            .find_by_id(id.0)
            .await?
            .ok_or_else(|| AuthError::NotFound("account".to_string()))
    }

    async fn view(&self, row: AccountRow) -> Result<AccountView, AuthError> {
        let roles = self.accounts.role_names(row.id).await?;
        Ok(row.into_view(roles))
    }

    async fn existing_roles(&self, ids: &[RoleId]) -> Result<Vec<Uuid>, AuthError> {
        let unique: BTreeSet<Uuid> = ids.iter().map(|id| id.0).collect();
        for id in &unique {
            if self.roles.find_by_id(*id).await?.is_none() {
                return Err(AuthError::InvalidInput(format!("unknown role {id}")));
            }
        }
        Ok(unique.into_iter().collect())
    }

    // =========================================================================
    // Roles
    // =========================================================================

    /// Create a role
    pub async fn create_role(&self, name: &str) -> Result<RoleRow, AuthError> {
        let name = required_name(name, "role name")?;
        if self.roles.find_by_name(&name).await?.is_some() {
            return Err(AuthError::Conflict("role already exists".to_string()));
        }
        let role = self
            .roles
            .create(CreateRole {
                id: Uuid::new_v4(),
                name,
            })
            .await?;
        tracing::info!(role = %role.name, "Role created");
        Ok(role)
    }

    /// List roles with their permissions
    pub async fn list_roles(&self) -> Result<Vec<RoleWithPermissions>, AuthError> {
        let roles = self.roles.list().await?;
        let mut out = Vec::with_capacity(roles.len());
        for role in roles {
            let permissions = self.roles.permissions(role.id).await?;
            out.push(RoleWithPermissions { role, permissions });
        }
        Ok(out)
    }

    /// Get one role with its permissions
    pub async fn get_role(&self, id: RoleId) -> Result<RoleWithPermissions, AuthError> {
        let role = self.find_role(id).await?;
        let permissions = self.roles.permissions(role.id).await?;
        Ok(RoleWithPermissions { role, permissions })
    }

    /// Rename a role; built-in roles keep their names
    pub async fn rename_role(&self, id: RoleId, name: &str) -> Result<RoleRow, AuthError> {
        let name = required_name(name, "role name")?;
        let current = self.find_role(id).await?;
        if current.name == name {
            return Ok(current);
        }
        reject_builtin(&current)?;
        if self.roles.find_by_name(&name).await?.is_some() {
            return Err(AuthError::Conflict("role already exists".to_string()));
        }
        self.roles
            .rename(id.0, &name)
            .await?
            .ok_or_else(|| AuthError::NotFound("role".to_string()))
    }

    /// Delete a role; built-in roles cannot be deleted
    pub async fn delete_role(&self, id: RoleId) -> Result<(), AuthError> {
        let current = self.find_role(id).await?;
        reject_builtin(&current)?;
        if !self.roles.delete(id.0).await? {
            return Err(AuthError::NotFound("role".to_string()));
        }
        tracing::info!(role = %current.name, "Role deleted");
        Ok(())
    }

    /// Replace a role's permission set
    pub async fn assign_permissions(
        &self,
        id: RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<RoleWithPermissions, AuthError> {
        let role = self.find_role(id).await?;

        let unique: BTreeSet<Uuid> = permission_ids.iter().map(|p| p.0).collect();
        for pid in &unique {
            if self.permissions.find_by_id(*pid).await?.is_none() {
                return Err(AuthError::InvalidInput(format!("unknown permission {pid}")));
            }
        }
        let ids: Vec<Uuid> = unique.into_iter().collect();

        self.roles
            .set_permissions(role.id, &ids)
            .await
            .map_err(|e| not_found_as(e, "role"))?;

        tracing::info!(role = %role.name, permissions = ids.len(), "Role permissions replaced");
        let permissions = self.roles.permissions(role.id).await?;
        Ok(RoleWithPermissions { role, permissions })
    }

    async fn find_role(&self, id: RoleId) -> Result<RoleRow, AuthError> {
        self.roles
            .find_by_id(id.0)
            .await?
            .ok_or_else(|| AuthError::NotFound("role".to_string()))
    }

    // =========================================================================
    // Permissions
    // =========================================================================

    /// Create a permission `module:name`
    pub async fn create_permission(&self, module: &str, name: &str) -> Result<PermissionRow, AuthError> {
        let module = required_code_part(module, "module")?;
        let name = required_code_part(name, "permission name")?;
        if self.permissions.find_by_code(&module, &name).await?.is_some() {
            return Err(AuthError::Conflict("permission already exists".to_string()));
        }
        let permission = self
            .permissions
            .create(CreatePermission {
                id: Uuid::new_v4(),
                module,
                name,
            })
            .await?;
        tracing::info!(code = %permission.code(), "Permission created");
        Ok(permission)
    }

    /// List all permissions
    pub async fn list_permissions(&self) -> Result<Vec<PermissionRow>, AuthError> {
        Ok(self.permissions.list().await?)
    }

    /// Get one permission
    pub async fn get_permission(&self, id: PermissionId) -> Result<PermissionRow, AuthError> {
        self.permissions
            .find_by_id(id.0)
            .await?
            .ok_or_else(|| AuthError::NotFound("permission".to_string()))
    }

    /// Rename a permission within its module
    pub async fn rename_permission(
        &self,
        id: PermissionId,
        name: &str,
    ) -> Result<PermissionRow, AuthError> {
        let name = required_code_part(name, "permission name")?;
        let current = self.get_permission(id).await?;
        if current.name == name {
            return Ok(current);
        }
        if self.permissions.find_by_code(&current.module, &name).await?.is_some() {
            return Err(AuthError::Conflict("permission already exists".to_string()));
        }
        self.permissions
            .rename(id.0, &name)
            .await?
            .ok_or_else(|| AuthError::NotFound("permission".to_string()))
    }

    /// Delete a permission (revoking it from every role)
    pub async fn delete_permission(&self, id: PermissionId) -> Result<(), AuthError> {
        if !self.permissions.delete(id.0).await? {
            return Err(AuthError::NotFound("permission".to_string()));
        }
        tracing::info!(permission_id = %id, "Permission deleted");
        Ok(())
    }
}

fn not_found_as(err: DbError, what: &str) -> AuthError {
    match err {
        DbError::NotFound => AuthError::NotFound(what.to_string()),
        other => other.into(),
    }
}

fn reject_builtin(role: &RoleRow) -> Result<(), AuthError> {
    if BUILTIN_ROLES.contains(&role.name.as_str()) {
        return Err(AuthError::InvalidInput(format!(
            "built-in role {} cannot be renamed or deleted",
            role.name
        )));
    }
    Ok(())
}

fn required_name(value: &str, what: &str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::InvalidInput(format!("{what} is required")));
    }
    Ok(value.to_string())
}

/// Module and action names may not contain the code separator
fn required_code_part(value: &str, what: &str) -> Result<String, AuthError> {
    let value = required_name(value, what)?;
    if value.contains(prospect_types::PermissionCode::SEPARATOR) {
        return Err(AuthError::InvalidInput(format!(
            "{what} may not contain '{}'",
            prospect_types::PermissionCode::SEPARATOR
        )));
    }
    Ok(value)
}

impl<A, R, P> std::fmt::Debug for DirectoryService<A, R, P>
where
    A: AccountRepository,
    R: RoleRepository,
    P: PermissionRepository,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryService").finish_non_exhaustive()
    }
}
