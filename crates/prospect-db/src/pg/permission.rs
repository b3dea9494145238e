//! PostgreSQL permission repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::PermissionRow;
use crate::repo::{CreatePermission, PermissionRepository};

/// PostgreSQL permission repository
#[derive(Clone)]
pub struct PgPermissionRepository {
    pool: PgPool,
}

impl PgPermissionRepository {
    /// Create a new permission repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<PermissionRow>> {
        let permission = sqlx::query_as::<_, PermissionRow>(
            "SELECT id, module, name FROM permissions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(permission)
    }

    async fn find_by_code(&self, module: &str, name: &str) -> DbResult<Option<PermissionRow>> {
        let permission = sqlx::query_as::<_, PermissionRow>(
            "SELECT id, module, name FROM permissions WHERE module = $1 AND name = $2",
        )
        .bind(module)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(permission)
    }

    async fn list(&self) -> DbResult<Vec<PermissionRow>> {
        let permissions = sqlx::query_as::<_, PermissionRow>(
            "SELECT id, module, name FROM permissions ORDER BY module, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    async fn create(&self, permission: CreatePermission) -> DbResult<PermissionRow> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            INSERT INTO permissions (id, module, name)
            VALUES ($1, $2, $3)
            RETURNING id, module, name
            "#,
        )
        .bind(permission.id)
        .bind(&permission.module)
        .bind(&permission.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn rename(&self, id: Uuid, name: &str) -> DbResult<Option<PermissionRow>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            "UPDATE permissions SET name = $1 WHERE id = $2 RETURNING id, module, name",
        )
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
