//! PostgreSQL role repository implementation

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{PermissionRow, RoleRow, RoleWithPermissions};
use crate::repo::{CreateRole, RoleRepository};

/// PostgreSQL role repository
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    /// Create a new role repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// One role/permission edge of an account, flattened by the join
#[derive(Debug, FromRow)]
struct AccountGrantRow {
    role_id: Uuid,
    role_name: String,
    permission_id: Option<Uuid>,
    permission_module: Option<String>,
    permission_name: Option<String>,
}

/// Fold join rows (ordered by role) into one entry per role
fn group_grants(rows: Vec<AccountGrantRow>) -> Vec<RoleWithPermissions> {
    let mut roles: Vec<RoleWithPermissions> = Vec::new();
    for row in rows {
        let same_role = roles.last().is_some_and(|r| r.role.id == row.role_id);
        if !same_role {
            roles.push(RoleWithPermissions {
                role: RoleRow {
                    id: row.role_id,
                    name: row.role_name,
                },
                permissions: Vec::new(),
            });
        }
        if let (Some(id), Some(module), Some(name), Some(entry)) = (
            row.permission_id,
            row.permission_module,
            row.permission_name,
            roles.last_mut(),
        ) {
            entry.permissions.push(PermissionRow { id, module, name });
        }
    }
    roles
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<RoleRow>> {
        let role = sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    async fn find_by_name(&self, name: &str) -> DbResult<Option<RoleRow>> {
        let role = sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    async fn list(&self) -> DbResult<Vec<RoleRow>> {
        let roles = sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(roles)
    }

    async fn create(&self, role: CreateRole) -> DbResult<RoleRow> {
        let row = sqlx::query_as::<_, RoleRow>(
            "INSERT INTO roles (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(role.id)
        .bind(&role.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn rename(&self, id: Uuid, name: &str) -> DbResult<Option<RoleRow>> {
        let row = sqlx::query_as::<_, RoleRow>(
            "UPDATE roles SET name = $1 WHERE id = $2 RETURNING id, name",
        )
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn permissions(&self, id: Uuid) -> DbResult<Vec<PermissionRow>> {
        let permissions = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT p.id, p.module, p.name
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY p.module, p.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    async fn set_permissions(&self, id: Uuid, permission_ids: &[Uuid]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        // Lock the role row so concurrent replacements serialize
        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM roles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::NotFound);
        }

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, p.id FROM permissions p WHERE p.id = ANY($2)
            "#,
        )
        .bind(id)
        .bind(permission_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_for_account(&self, account_id: Uuid) -> DbResult<Vec<RoleWithPermissions>> {
        let rows = sqlx::query_as::<_, AccountGrantRow>(
            r#"
            SELECT r.id AS role_id, r.name AS role_name,
                   p.id AS permission_id, p.module AS permission_module, p.name AS permission_name
            FROM account_roles ar
            JOIN roles r ON r.id = ar.role_id
            LEFT JOIN role_permissions rp ON rp.role_id = r.id
            LEFT JOIN permissions p ON p.id = rp.permission_id
            WHERE ar.account_id = $1
            ORDER BY r.name, p.module, p.name
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(group_grants(rows))
    }
}
