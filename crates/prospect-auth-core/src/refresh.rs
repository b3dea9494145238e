//! Refresh token persistence
//!
//! Tokens are stored as SHA-256 digests; callers pass the token string and
//! the store hashes before every lookup.

use chrono::{DateTime, Utc};
use prospect_db::{CreateRefreshToken, RefreshTokenRepository, RefreshTokenRow};
use prospect_types::AccountId;
use std::sync::Arc;
use uuid::Uuid;

use crate::crypto::hash_token;
use crate::AuthError;

/// Refresh token store over a repository
pub struct RefreshTokenStore<R: RefreshTokenRepository> {
    repo: Arc<R>,
}

impl<R: RefreshTokenRepository> Clone for RefreshTokenStore<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: RefreshTokenRepository> RefreshTokenStore<R> {
    /// Create a new store
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Persist a new unrevoked record.
    ///
    /// With `revoke_existing`, every unrevoked token of the account is
    /// revoked in the same transaction.
    pub async fn store(
        &self,
        account_id: AccountId,
        token: &str,
        expires_at: DateTime<Utc>,
        revoke_existing: bool,
    ) -> Result<RefreshTokenRow, AuthError> {
        let record = self
            .repo
            .create(new_record(account_id, token, expires_at), revoke_existing)
            .await?;
        Ok(record)
    }

    /// Look up the record for a token string
    pub async fn find(&self, token: &str) -> Result<Option<RefreshTokenRow>, AuthError> {
        Ok(self.repo.find_by_token_hash(&hash_token(token)).await?)
    }

    /// Mark a token revoked.
    ///
    /// Returns false when no record matches; an already revoked record
    /// still returns true.
    pub async fn revoke(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.repo.revoke(&hash_token(token)).await?)
    }

    /// Revoke every currently unrevoked token of an account
    pub async fn revoke_all_unrevoked_for(&self, account_id: AccountId) -> Result<u64, AuthError> {
        Ok(self.repo.revoke_all_for_account(account_id.0).await?)
    }

    /// All records of an account, newest first
    pub async fn list_for(&self, account_id: AccountId) -> Result<Vec<RefreshTokenRow>, AuthError> {
        Ok(self.repo.find_by_account_id(account_id.0).await?)
    }

    /// `not revoked and now < expires_at`
    pub fn is_usable(record: &RefreshTokenRow) -> bool {
        record.is_usable()
    }

    /// Revoke `presented` and persist `successor` as one unit.
    ///
    /// Returns `None` when `presented` was no longer usable at `now`, which
    /// includes losing a race against a concurrent presentation.
    pub async fn rotate(
        &self,
        presented: &str,
        account_id: AccountId,
        successor: &str,
        successor_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRow>, AuthError> {
        let record = self
            .repo
            .rotate(
                &hash_token(presented),
                new_record(account_id, successor, successor_expires_at),
                now,
            )
            .await?;
        Ok(record)
    }
}

fn new_record(account_id: AccountId, token: &str, expires_at: DateTime<Utc>) -> CreateRefreshToken {
    CreateRefreshToken {
        id: Uuid::new_v4(),
        account_id: account_id.0,
        token_hash: hash_token(token),
        expires_at,
    }
}

impl<R: RefreshTokenRepository> std::fmt::Debug for RefreshTokenStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenStore").finish_non_exhaustive()
    }
}
