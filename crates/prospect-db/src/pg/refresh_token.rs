//! PostgreSQL refresh token repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::RefreshTokenRow;
use crate::repo::{CreateRefreshToken, RefreshTokenRepository};

/// PostgreSQL refresh token repository
#[derive(Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    /// Create a new refresh token repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn find_by_token_hash(&self, token_hash: &str) -> DbResult<Option<RefreshTokenRow>> {
        let token = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, account_id, token_hash, revoked, created_at, expires_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn find_by_account_id(&self, account_id: Uuid) -> DbResult<Vec<RefreshTokenRow>> {
        let tokens = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, account_id, token_hash, revoked, created_at, expires_at
            FROM refresh_tokens
            WHERE account_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }

    async fn create(
        &self,
        token: CreateRefreshToken,
        revoke_existing: bool,
    ) -> DbResult<RefreshTokenRow> {
        let mut tx = self.pool.begin().await?;

        if revoke_existing {
            sqlx::query(
                "UPDATE refresh_tokens SET revoked = TRUE WHERE account_id = $1 AND NOT revoked",
            )
            .bind(token.account_id)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            INSERT INTO refresh_tokens (id, account_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, account_id, token_hash, revoked, created_at, expires_at
            "#,
        )
        .bind(token.id)
        .bind(token.account_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn revoke(&self, token_hash: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_account(&self, account_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE account_id = $1 AND NOT revoked",
        )
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn rotate(
        &self,
        presented_hash: &str,
        successor: CreateRefreshToken,
        now: DateTime<Utc>,
    ) -> DbResult<Option<RefreshTokenRow>> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken here makes a concurrent second presentation
        // re-check `NOT revoked` after this transaction commits.
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE token_hash = $1 AND account_id = $2 AND NOT revoked AND expires_at > $3
            "#,
        )
        .bind(presented_hash)
        .bind(successor.account_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if revoked.rows_affected() == 0 {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            INSERT INTO refresh_tokens (id, account_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, account_id, token_hash, revoked, created_at, expires_at
            "#,
        )
        .bind(successor.id)
        .bind(successor.account_id)
        .bind(&successor.token_hash)
        .bind(successor.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row))
    }
}
