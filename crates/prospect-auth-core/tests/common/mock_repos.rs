//! Mock repositories for testing
//!
//! All four repositories share one set of in-memory tables so that joins
//! (account roles, role permissions) behave like the database. Unique
//! constraints are enforced with the same constraint names as the schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use prospect_db::{
    AccountRepository, AccountRow, CreateAccount, CreatePermission, CreateRefreshToken,
    CreateRole, DbError, DbResult, PermissionRepository, PermissionRow, RefreshTokenRepository,
    RefreshTokenRow, RoleRepository, RoleRow, RoleWithPermissions, UpdateAccount,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Shared in-memory tables
#[derive(Default)]
pub struct MockTables {
    accounts: DashMap<Uuid, AccountRow>,
    account_roles: DashMap<Uuid, Vec<Uuid>>,
    roles: DashMap<Uuid, RoleRow>,
    role_permissions: DashMap<Uuid, Vec<Uuid>>,
    permissions: DashMap<Uuid, PermissionRow>,
    refresh_tokens: DashMap<Uuid, RefreshTokenRow>,
    /// Serializes multi-statement writes like a transaction would
    tx: Mutex<()>,
    fail_writes: AtomicBool,
    /// Row committed by a concurrent writer just before the next account insert
    racing_account: Mutex<Option<AccountRow>>,
    /// Revoke the presented token just before the next rotation
    racing_rotation: AtomicBool,
}

impl MockTables {
    fn check_writable(&self) -> DbResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn take_racing_account(&self) -> Option<AccountRow> {
        self.racing_account
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.tx.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn existing_role_ids(&self, ids: &[Uuid]) -> Vec<Uuid> {
        ids.iter()
            .copied()
            .filter(|id| self.roles.contains_key(id))
            .collect()
    }

    fn account_conflict(&self, id: Uuid, username: &str, email: &str, federated_id: Option<&str>) -> Option<&'static str> {
        for entry in self.accounts.iter() {
            let row = entry.value();
            if row.id == id {
                continue;
            }
            if row.username == username {
                return Some("accounts_username_key");
            }
            if row.email == email {
                return Some("accounts_email_key");
            }
            if federated_id.is_some() && row.federated_id.as_deref() == federated_id {
                return Some("accounts_federated_id_key");
            }
        }
        None
    }
}

/// Handle bundling the four mock repositories over shared tables
#[derive(Clone)]
pub struct MockRepos {
    pub tables: Arc<MockTables>,
    pub accounts: Arc<MockAccountRepository>,
    pub roles: Arc<MockRoleRepository>,
    pub permissions: Arc<MockPermissionRepository>,
    pub refresh_tokens: Arc<MockRefreshTokenRepository>,
}

impl MockRepos {
    pub fn new() -> Self {
        let tables = Arc::new(MockTables::default());
        Self {
            accounts: Arc::new(MockAccountRepository {
                tables: Arc::clone(&tables),
            }),
            roles: Arc::new(MockRoleRepository {
                tables: Arc::clone(&tables),
            }),
            permissions: Arc::new(MockPermissionRepository {
                tables: Arc::clone(&tables),
            }),
            refresh_tokens: Arc::new(MockRefreshTokenRepository {
                tables: Arc::clone(&tables),
            }),
            tables,
        }
    }

    /// Make every subsequent write fail with a storage error
    #[allow(dead_code)]
    pub fn fail_writes(&self, fail: bool) {
        self.tables.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Commit `row` on behalf of another request after the caller's
    /// pre-checks but before its next account insert
    #[allow(dead_code)]
    pub fn race_next_account_create(&self, row: AccountRow) {
        *self
            .tables
            .racing_account
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(row);
    }

    /// Let another request rotate the presented token right before the next rotation
    #[allow(dead_code)]
    pub fn race_next_rotation(&self) {
        self.tables.racing_rotation.store(true, Ordering::SeqCst);
    }

    /// Insert a role directly, returning its id
    #[allow(dead_code)]
    pub fn insert_role(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.roles.insert(
            id,
            RoleRow {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    /// Insert a permission directly, returning its id
    #[allow(dead_code)]
    pub fn insert_permission(&self, module: &str, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.permissions.insert(
            id,
            PermissionRow {
                id,
                module: module.to_string(),
                name: name.to_string(),
            },
        );
        id
    }

    /// Grant a permission to a role directly
    #[allow(dead_code)]
    pub fn grant(&self, role_id: Uuid, permission_id: Uuid) {
        self.tables
            .role_permissions
            .entry(role_id)
            .or_default()
            .push(permission_id);
    }

    /// Insert an account row directly with the given roles
    #[allow(dead_code)]
    pub fn insert_account(&self, row: AccountRow, role_ids: Vec<Uuid>) {
        self.tables.account_roles.insert(row.id, role_ids);
        self.tables.accounts.insert(row.id, row);
    }

    /// Build an account row without touching the tables
    #[allow(dead_code)]
    pub fn account_row(username: &str, email: &str, password_hash: Option<String>) -> AccountRow {
        let now = Utc::now();
        AccountRow {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            federated_id: None,
            profile_pic: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of stored accounts
    #[allow(dead_code)]
    pub fn account_count(&self) -> usize {
        self.tables.accounts.len()
    }

    /// All refresh token rows of an account
    #[allow(dead_code)]
    pub fn tokens_of(&self, account_id: Uuid) -> Vec<RefreshTokenRow> {
        self.tables
            .refresh_tokens
            .iter()
            .filter(|r| r.account_id == account_id)
            .map(|r| r.value().clone())
            .collect()
    }
}

impl Default for MockRepos {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Accounts
// ============================================================================

pub struct MockAccountRepository {
    tables: Arc<MockTables>,
}

impl MockAccountRepository {
    fn find_where(&self, pred: impl Fn(&AccountRow) -> bool) -> Option<AccountRow> {
        self.tables
            .accounts
            .iter()
            .find(|r| pred(r.value()))
            .map(|r| r.value().clone())
    }
}

#[async_trait]
impl AccountRepository for MockAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AccountRow>> {
        Ok(self.tables.accounts.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<AccountRow>> {
        Ok(self.find_where(|a| a.email == email))
    }

    async fn find_by_username(&self, username: &str) -> DbResult<Option<AccountRow>> {
        Ok(self.find_where(|a| a.username == username))
    }

    async fn find_by_federated_id(&self, federated_id: &str) -> DbResult<Option<AccountRow>> {
        Ok(self.find_where(|a| a.federated_id.as_deref() == Some(federated_id)))
    }

    async fn list(&self) -> DbResult<Vec<AccountRow>> {
        let mut rows: Vec<AccountRow> = self
            .tables
            .accounts
            .iter()
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|a| a.created_at);
        Ok(rows)
    }

    async fn create(&self, account: CreateAccount) -> DbResult<AccountRow> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        if let Some(winner) = self.tables.take_racing_account() {
            self.tables.account_roles.insert(winner.id, Vec::new());
            self.tables.accounts.insert(winner.id, winner);
        }

        if let Some(constraint) = self.tables.account_conflict(
            account.id,
            &account.username,
            &account.email,
            account.federated_id.as_deref(),
        ) {
            return Err(DbError::UniqueViolation(constraint.to_string()));
        }

        let now = Utc::now();
        let row = AccountRow {
            id: account.id,
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            federated_id: account.federated_id,
            profile_pic: account.profile_pic,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let role_ids = self.tables.existing_role_ids(&account.role_ids);
        self.tables.account_roles.insert(row.id, role_ids);
        self.tables.accounts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, update: UpdateAccount) -> DbResult<AccountRow> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        let mut row = self
            .tables
            .accounts
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(DbError::NotFound)?;

        if let Some(username) = update.username {
            row.username = username;
        }
        if let Some(email) = update.email {
            row.email = email;
        }
        if let Some(constraint) = self.tables.account_conflict(
            id,
            &row.username,
            &row.email,
            row.federated_id.as_deref(),
        ) {
            return Err(DbError::UniqueViolation(constraint.to_string()));
        }
        if let Some(hash) = update.password_hash {
            row.password_hash = Some(hash);
        }
        if let Some(active) = update.is_active {
            row.is_active = active;
        }
        row.updated_at = Utc::now();

        if let Some(role_ids) = update.role_ids {
            let role_ids = self.tables.existing_role_ids(&role_ids);
            self.tables.account_roles.insert(id, role_ids);
        }
        self.tables.accounts.insert(id, row.clone());
        Ok(row)
    }

    async fn link_federated_identity(
        &self,
        id: Uuid,
        federated_id: &str,
        profile_pic: Option<&str>,
    ) -> DbResult<AccountRow> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        if self
            .find_where(|a| a.id != id && a.federated_id.as_deref() == Some(federated_id))
            .is_some()
        {
            return Err(DbError::UniqueViolation(
                "accounts_federated_id_key".to_string(),
            ));
        }
        let mut row = self.tables.accounts.get_mut(&id).ok_or(DbError::NotFound)?;
        row.federated_id = Some(federated_id.to_string());
        if let Some(pic) = profile_pic {
            row.profile_pic = Some(pic.to_string());
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn update_profile_pic(&self, id: Uuid, profile_pic: &str) -> DbResult<()> {
        self.tables.check_writable()?;
        if let Some(mut row) = self.tables.accounts.get_mut(&id) {
            row.profile_pic = Some(profile_pic.to_string());
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn role_names(&self, id: Uuid) -> DbResult<Vec<String>> {
        let role_ids = self
            .tables
            .account_roles
            .get(&id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        let mut names: Vec<String> = role_ids
            .iter()
            .filter_map(|rid| self.tables.roles.get(rid).map(|r| r.name.clone()))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        let removed = self.tables.accounts.remove(&id).is_some();
        self.tables.account_roles.remove(&id);
        self.tables.refresh_tokens.retain(|_, t| t.account_id != id);
        Ok(removed)
    }
}

// ============================================================================
// Roles
// ============================================================================

pub struct MockRoleRepository {
    tables: Arc<MockTables>,
}

impl MockRoleRepository {
    fn permissions_of(&self, role_id: Uuid) -> Vec<PermissionRow> {
        let ids = self
            .tables
            .role_permissions
            .get(&role_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        let mut rows: Vec<PermissionRow> = ids
            .iter()
            .filter_map(|pid| self.tables.permissions.get(pid).map(|p| p.value().clone()))
            .collect();
        rows.sort_by(|a, b| (&a.module, &a.name).cmp(&(&b.module, &b.name)));
        rows
    }
}

#[async_trait]
impl RoleRepository for MockRoleRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<RoleRow>> {
        Ok(self.tables.roles.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_name(&self, name: &str) -> DbResult<Option<RoleRow>> {
        Ok(self
            .tables
            .roles
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.value().clone()))
    }

    async fn list(&self) -> DbResult<Vec<RoleRow>> {
        let mut roles: Vec<RoleRow> = self.tables.roles.iter().map(|r| r.value().clone()).collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn create(&self, role: CreateRole) -> DbResult<RoleRow> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        if self.tables.roles.iter().any(|r| r.name == role.name) {
            return Err(DbError::UniqueViolation("roles_name_key".to_string()));
        }
        let row = RoleRow {
            id: role.id,
            name: role.name,
        };
        self.tables.roles.insert(row.id, row.clone());
        Ok(row)
    }

    async fn rename(&self, id: Uuid, name: &str) -> DbResult<Option<RoleRow>> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        if self.tables.roles.iter().any(|r| r.id != id && r.name == name) {
            return Err(DbError::UniqueViolation("roles_name_key".to_string()));
        }
        Ok(self.tables.roles.get_mut(&id).map(|mut r| {
            r.name = name.to_string();
            r.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        let removed = self.tables.roles.remove(&id).is_some();
        self.tables.role_permissions.remove(&id);
        for mut links in self.tables.account_roles.iter_mut() {
            links.retain(|rid| *rid != id);
        }
        Ok(removed)
    }

    async fn permissions(&self, id: Uuid) -> DbResult<Vec<PermissionRow>> {
        Ok(self.permissions_of(id))
    }

    async fn set_permissions(&self, id: Uuid, permission_ids: &[Uuid]) -> DbResult<()> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        if !self.tables.roles.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        let existing: Vec<Uuid> = permission_ids
            .iter()
            .copied()
            .filter(|pid| self.tables.permissions.contains_key(pid))
            .collect();
        self.tables.role_permissions.insert(id, existing);
        Ok(())
    }

    async fn find_for_account(&self, account_id: Uuid) -> DbResult<Vec<RoleWithPermissions>> {
        let role_ids = self
            .tables
            .account_roles
            .get(&account_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        let mut roles: Vec<RoleWithPermissions> = role_ids
            .iter()
            .filter_map(|rid| self.tables.roles.get(rid).map(|r| r.value().clone()))
            .map(|role| RoleWithPermissions {
                permissions: self.permissions_of(role.id),
                role,
            })
            .collect();
        roles.sort_by(|a, b| a.role.name.cmp(&b.role.name));
        Ok(roles)
    }
}

// ============================================================================
// Permissions
// ============================================================================

pub struct MockPermissionRepository {
    tables: Arc<MockTables>,
}

#[async_trait]
impl PermissionRepository for MockPermissionRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<PermissionRow>> {
        Ok(self.tables.permissions.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_code(&self, module: &str, name: &str) -> DbResult<Option<PermissionRow>> {
        Ok(self
            .tables
            .permissions
            .iter()
            .find(|p| p.module == module && p.name == name)
            .map(|p| p.value().clone()))
    }

    async fn list(&self) -> DbResult<Vec<PermissionRow>> {
        let mut rows: Vec<PermissionRow> = self
            .tables
            .permissions
            .iter()
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by(|a, b| (&a.module, &a.name).cmp(&(&b.module, &b.name)));
        Ok(rows)
    }

    async fn create(&self, permission: CreatePermission) -> DbResult<PermissionRow> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        if self
            .tables
            .permissions
            .iter()
            .any(|p| p.module == permission.module && p.name == permission.name)
        {
            return Err(DbError::UniqueViolation(
                "permissions_module_name_key".to_string(),
            ));
        }
        let row = PermissionRow {
            id: permission.id,
            module: permission.module,
            name: permission.name,
        };
        self.tables.permissions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn rename(&self, id: Uuid, name: &str) -> DbResult<Option<PermissionRow>> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        let Some(module) = self.tables.permissions.get(&id).map(|p| p.module.clone()) else {
            return Ok(None);
        };
        if self
            .tables
            .permissions
            .iter()
            .any(|p| p.id != id && p.module == module && p.name == name)
        {
            return Err(DbError::UniqueViolation(
                "permissions_module_name_key".to_string(),
            ));
        }
        Ok(self.tables.permissions.get_mut(&id).map(|mut p| {
            p.name = name.to_string();
            p.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        let removed = self.tables.permissions.remove(&id).is_some();
        for mut links in self.tables.role_permissions.iter_mut() {
            links.retain(|pid| *pid != id);
        }
        Ok(removed)
    }
}

// ============================================================================
// Refresh tokens
// ============================================================================

pub struct MockRefreshTokenRepository {
    tables: Arc<MockTables>,
}

impl MockRefreshTokenRepository {
    fn insert(&self, token: CreateRefreshToken) -> DbResult<RefreshTokenRow> {
        if self
            .tables
            .refresh_tokens
            .iter()
            .any(|t| t.token_hash == token.token_hash)
        {
            return Err(DbError::UniqueViolation(
                "refresh_tokens_token_hash_key".to_string(),
            ));
        }
        let row = RefreshTokenRow {
            id: token.id,
            account_id: token.account_id,
            token_hash: token.token_hash,
            revoked: false,
            created_at: Utc::now(),
            expires_at: token.expires_at,
        };
        self.tables.refresh_tokens.insert(row.id, row.clone());
        Ok(row)
    }

    fn id_for_hash(&self, token_hash: &str) -> Option<Uuid> {
        self.tables
            .refresh_tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .map(|t| t.id)
    }
}

#[async_trait]
impl RefreshTokenRepository for MockRefreshTokenRepository {
    async fn find_by_token_hash(&self, token_hash: &str) -> DbResult<Option<RefreshTokenRow>> {
        Ok(self
            .tables
            .refresh_tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .map(|t| t.value().clone()))
    }

    async fn find_by_account_id(&self, account_id: Uuid) -> DbResult<Vec<RefreshTokenRow>> {
        let mut rows: Vec<RefreshTokenRow> = self
            .tables
            .refresh_tokens
            .iter()
            .filter(|t| t.account_id == account_id)
            .map(|t| t.value().clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn create(
        &self,
        token: CreateRefreshToken,
        revoke_existing: bool,
    ) -> DbResult<RefreshTokenRow> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        if revoke_existing {
            for mut row in self.tables.refresh_tokens.iter_mut() {
                if row.account_id == token.account_id {
                    row.revoked = true;
                }
            }
        }
        self.insert(token)
    }

    async fn revoke(&self, token_hash: &str) -> DbResult<bool> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        let Some(id) = self.id_for_hash(token_hash) else {
            return Ok(false);
        };
        if let Some(mut row) = self.tables.refresh_tokens.get_mut(&id) {
            row.revoked = true;
        }
        Ok(true)
    }

    async fn revoke_all_for_account(&self, account_id: Uuid) -> DbResult<u64> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        let mut flipped = 0;
        for mut row in self.tables.refresh_tokens.iter_mut() {
            if row.account_id == account_id && !row.revoked {
                row.revoked = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn rotate(
        &self,
        presented_hash: &str,
        successor: CreateRefreshToken,
        now: DateTime<Utc>,
    ) -> DbResult<Option<RefreshTokenRow>> {
        self.tables.check_writable()?;
        let _tx = self.tables.lock();

        let Some(id) = self.id_for_hash(presented_hash) else {
            return Ok(None);
        };
        if self.tables.racing_rotation.swap(false, Ordering::SeqCst) {
            if let Some(mut row) = self.tables.refresh_tokens.get_mut(&id) {
                row.revoked = true;
            }
        }
        {
            let Some(mut row) = self.tables.refresh_tokens.get_mut(&id) else {
                return Ok(None);
            };
            if row.revoked || row.account_id != successor.account_id || row.expires_at <= now {
                return Ok(None);
            }
            row.revoked = true;
        }
        self.insert(successor).map(Some)
    }
}
