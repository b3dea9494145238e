//! PostgreSQL account repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::AccountRow;
use crate::repo::{AccountRepository, CreateAccount, UpdateAccount};

/// PostgreSQL account repository
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AccountRow>> {
        let account = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, username, email, password_hash, federated_id, profile_pic,
                   is_active, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<AccountRow>> {
        let account = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, username, email, password_hash, federated_id, profile_pic,
                   is_active, created_at, updated_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_username(&self, username: &str) -> DbResult<Option<AccountRow>> {
        let account = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, username, email, password_hash, federated_id, profile_pic,
                   is_active, created_at, updated_at
            FROM accounts
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_federated_id(&self, federated_id: &str) -> DbResult<Option<AccountRow>> {
        let account = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, username, email, password_hash, federated_id, profile_pic,
                   is_active, created_at, updated_at
            FROM accounts
            WHERE federated_id = $1
            "#,
        )
        .bind(federated_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn list(&self) -> DbResult<Vec<AccountRow>> {
        let accounts = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, username, email, password_hash, federated_id, profile_pic,
                   is_active, created_at, updated_at
            FROM accounts
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn create(&self, account: CreateAccount) -> DbResult<AccountRow> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (id, username, email, password_hash, federated_id, profile_pic)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, password_hash, federated_id, profile_pic,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.federated_id)
        .bind(&account.profile_pic)
        .fetch_one(&mut *tx)
        .await?;

        if !account.role_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO account_roles (account_id, role_id)
                SELECT $1, r.id FROM roles r WHERE r.id = ANY($2)
                "#,
            )
            .bind(account.id)
            .bind(&account.role_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, update: UpdateAccount) -> DbResult<AccountRow> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, password_hash, federated_id, profile_pic,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.password_hash)
        .bind(update.is_active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if let Some(role_ids) = &update.role_ids {
            sqlx::query("DELETE FROM account_roles WHERE account_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO account_roles (account_id, role_id)
                SELECT $1, r.id FROM roles r WHERE r.id = ANY($2)
                "#,
            )
            .bind(id)
            .bind(role_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    async fn link_federated_identity(
        &self,
        id: Uuid,
        federated_id: &str,
        profile_pic: Option<&str>,
    ) -> DbResult<AccountRow> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts
            SET federated_id = $2,
                profile_pic = COALESCE($3, profile_pic),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, password_hash, federated_id, profile_pic,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(federated_id)
        .bind(profile_pic)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(row)
    }

    async fn update_profile_pic(&self, id: Uuid, profile_pic: &str) -> DbResult<()> {
        sqlx::query("UPDATE accounts SET profile_pic = $1, updated_at = NOW() WHERE id = $2")
            .bind(profile_pic)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn role_names(&self, id: Uuid) -> DbResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.name
            FROM account_roles ar
            JOIN roles r ON r.id = ar.role_id
            WHERE ar.account_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
