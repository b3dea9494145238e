//! Idempotent startup seeding of roles, permissions and the first superadmin

use prospect_db::{
    AccountRepository, CreateAccount, CreatePermission, CreateRole, DbError, PermissionRepository,
    RoleRepository, RoleRow,
};
use prospect_types::AccountView;
use std::sync::Arc;
use uuid::Uuid;

use crate::{AuthError, PasswordHasher};

/// Role with every defined permission
pub const SUPERADMIN_ROLE: &str = "superadmin";
/// Administrative role
pub const ADMIN_ROLE: &str = "admin";
/// Role attached to newly registered accounts
pub const DEFAULT_ROLE: &str = "user";

/// Roles that always exist after seeding
pub const BUILTIN_ROLES: [&str; 3] = [SUPERADMIN_ROLE, ADMIN_ROLE, DEFAULT_ROLE];
/// Modules that receive the baseline actions
pub const BASELINE_MODULES: [&str; 4] = ["user", "role", "permission", "lead"];
/// Actions seeded for every baseline module
pub const BASELINE_ACTIONS: [&str; 4] = ["create", "view", "update", "delete"];

/// Credentials for the default superadmin account
#[derive(Clone)]
pub struct SuperadminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SuperadminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuperadminSeed")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Outcome of a role/permission seeding run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub roles_created: usize,
    pub permissions_created: usize,
    /// Size of the superadmin permission set after the overwrite
    pub superadmin_permissions: usize,
}

/// Seeds built-in roles and permissions
pub struct Bootstrapper<A, R, P>
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

impl<A, R, P> Bootstrapper<A, R, P>
where
    A: AccountRepository,
    R: RoleRepository,
    P: PermissionRepository,
{
    /// Create a new bootstrapper
    pub fn new(accounts: Arc<A>, roles: Arc<R>, permissions: Arc<P>, hasher: PasswordHasher) -> Self {
        Self {
            accounts,
            roles,
            permissions,
            hasher,
        }
    }

    /// Ensure built-in roles and baseline permissions exist, then overwrite
    /// the superadmin permission set with every permission currently defined.
    pub async fn seed_roles_permissions(&self) -> Result<SeedReport, AuthError> {
        let mut report = SeedReport::default();

        let mut superadmin = None;
        for name in BUILTIN_ROLES {
            let (role, created) = self.ensure_role(name).await?;
            if created {
                report.roles_created += 1;
            }
            if name == SUPERADMIN_ROLE {
                superadmin = Some(role);
            }
        }

        for module in BASELINE_MODULES {
            for action in BASELINE_ACTIONS {
                if self.ensure_permission(module, action).await? {
                    report.permissions_created += 1;
                }
            }
        }

        let superadmin = superadmin
            .ok_or_else(|| AuthError::Internal("superadmin role was not seeded".to_string()))?;
        let all: Vec<Uuid> = self.permissions.list().await?.iter().map(|p| p.id).collect();
        self.roles.set_permissions(superadmin.id, &all).await?;
        report.superadmin_permissions = all.len();

        tracing::info!(
            roles_created = report.roles_created,
            permissions_created = report.permissions_created,
            superadmin_permissions = report.superadmin_permissions,
            "Roles and permissions seeded"
        );
        Ok(report)
    }

    /// Create the default superadmin unless an account with that username exists.
    ///
    /// Returns the created account, or `None` when seeding was skipped.
    pub async fn seed_default_superadmin(
        &self,
        seed: &SuperadminSeed,
    ) -> Result<Option<AccountView>, AuthError> {
        if self.accounts.find_by_username(&seed.username).await?.is_some() {
            tracing::info!(username = %seed.username, "Superadmin already exists, skipping seeding");
            return Ok(None);
        }

        PasswordHasher::validate(&seed.password)?;
        let role = self.roles.find_by_name(SUPERADMIN_ROLE).await?.ok_or_else(|| {
            AuthError::Configuration("superadmin role is missing, seed roles first".to_string())
        })?;
        let password_hash = self.hasher.hash_blocking(&seed.password).await?;

        let account = self
            .accounts
            .create(CreateAccount {
                id: Uuid::new_v4(),
                username: seed.username.clone(),
                email: seed.email.clone(),
                password_hash: Some(password_hash),
                federated_id: None,
                profile_pic: None,
                role_ids: vec![role.id],
            })
            .await?;

        tracing::info!(account_id = %account.id, username = %account.username, "Default superadmin created");
        Ok(Some(account.into_view(vec![role.name])))
    }

    async fn ensure_role(&self, name: &str) -> Result<(RoleRow, bool), AuthError> {
        if let Some(role) = self.roles.find_by_name(name).await? {
            return Ok((role, false));
        }
        let create = CreateRole {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        match self.roles.create(create).await {
            Ok(role) => Ok((role, true)),
            // Another instance seeded it first
            Err(DbError::UniqueViolation(_)) => {
                let role = self.roles.find_by_name(name).await?.ok_or_else(|| {
                    AuthError::Internal(format!("role {name} vanished during seeding"))
                })?;
                Ok((role, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_permission(&self, module: &str, action: &str) -> Result<bool, AuthError> {
        if self.permissions.find_by_code(module, action).await?.is_some() {
            return Ok(false);
        }
        let create = CreatePermission {
            id: Uuid::new_v4(),
            module: module.to_string(),
            name: action.to_string(),
        };
        match self.permissions.create(create).await {
            Ok(_) => Ok(true),
            Err(DbError::UniqueViolation(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
