//! Account lifecycle: registration, login, token rotation and logout

use chrono::Utc;
use prospect_db::{
    AccountRepository, AccountRow, CreateAccount, DbError, RefreshTokenRepository, RoleRepository,
};
use prospect_types::{AccountId, AccountView, FederatedProfile, LoginMode, TokenPair};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AuthConfig, AuthError, IssuedToken, PasswordHasher, PermissionResolver, Principal,
    RefreshTokenStore, TokenCodec, TokenKind,
};

/// Username collisions retried before giving up
const USERNAME_ATTEMPTS: usize = 5;

/// Local registration input
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// How a federated login matched an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederatedMatch {
    /// Found by external subject id
    Existing,
    /// Found by email; the external id was attached to it
    Linked,
    /// A new account was created
    Created,
}

/// Result of a federated login
#[derive(Debug, Clone)]
pub struct FederatedLogin {
    pub account: AccountView,
    pub tokens: TokenPair,
    pub matched: FederatedMatch,
}

/// Orchestrates registration, authentication, token issuance and rotation
pub struct AccountManager<A, R, T>
where
    A: AccountRepository,
    R: RoleRepository,
    T: RefreshTokenRepository,
{
    accounts: Arc<A>,
    roles: Arc<R>,
    tokens: RefreshTokenStore<T>,
    codec: TokenCodec,
    hasher: PasswordHasher,
    default_role: String,
}

impl<A, R, T> Clone for AccountManager<A, R, T>
where
    A: AccountRepository,
    R: RoleRepository,
    T: RefreshTokenRepository,
{
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
            roles: Arc::clone(&self.roles),
            tokens: self.tokens.clone(),
            codec: self.codec.clone(),
            hasher: self.hasher,
            default_role: self.default_role.clone(),
        }
    }
}

impl<A, R, T> AccountManager<A, R, T>
where
    A: AccountRepository,
    R: RoleRepository,
    T: RefreshTokenRepository,
{
    /// Create a new account manager
    pub fn new(config: &AuthConfig, accounts: Arc<A>, roles: Arc<R>, tokens: Arc<T>) -> Self {
        Self {
            accounts,
            roles,
            tokens: RefreshTokenStore::new(tokens),
            codec: TokenCodec::new(config),
            hasher: PasswordHasher::new(config.password_hash_cost),
            default_role: config.default_role.clone(),
        }
    }

    /// The codec used for issuing and verifying tokens
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// The refresh token store
    pub fn token_store(&self) -> &RefreshTokenStore<T> {
        &self.tokens
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a local account with the default role
    pub async fn register(&self, new: NewAccount) -> Result<AccountView, AuthError> {
        let username = new.username.trim().to_string();
        let email = new.email.trim().to_string();
        validate_identity(&username, &email)?;
        PasswordHasher::validate(&new.password)?;

        // Friendly pre-check; the unique constraints stay authoritative
        if self.accounts.find_by_username(&username).await?.is_some() {
            return Err(AuthError::Conflict("username already registered".to_string()));
        }
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict("email already registered".to_string()));
        }

        let role = self.default_role_id().await?;
        let password_hash = self.hasher.hash_blocking(&new.password).await?;

        let account = self
            .accounts
            .create(CreateAccount {
                id: Uuid::new_v4(),
                username,
                email,
                password_hash: Some(password_hash),
                federated_id: None,
                profile_pic: None,
                role_ids: vec![role],
            })
            .await?;

        tracing::info!(account_id = %account.id, username = %account.username, "Account registered");
        Ok(account.into_view(vec![self.default_role.clone()]))
    }

    /// Log in (or sign up) with a profile from a federated identity provider.
    ///
    /// Lookup is by external id, then by email. An email match gets the
    /// external id and picture attached without re-authentication. Tokens
    /// are issued in multi-device mode.
    pub async fn login_federated(
        &self,
        profile: &FederatedProfile,
    ) -> Result<FederatedLogin, AuthError> {
        let email = profile
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                AuthError::FederatedIdentity("identity provider returned no email".to_string())
            })?;

        // Inactive accounts are rejected before anything is written to them
        let (account, matched) = match self
            .accounts
            .find_by_federated_id(&profile.external_id)
            .await?
        {
            Some(account) => {
                ensure_active_for_federated(&account)?;
                (
                    self.refresh_picture(account, profile).await?,
                    FederatedMatch::Existing,
                )
            }
            None => match self.accounts.find_by_email(email).await? {
                Some(account) => {
                    ensure_active_for_federated(&account)?;
                    let linked = self
                        .accounts
                        .link_federated_identity(
                            account.id,
                            &profile.external_id,
                            profile.picture.as_deref(),
                        )
                        .await?;
                    tracing::info!(account_id = %linked.id, "Federated identity linked by email");
                    (linked, FederatedMatch::Linked)
                }
                None => self.create_federated(profile, email).await?,
            },
        };
        ensure_active_for_federated(&account)?;

        let account_id = account.account_id();
        let tokens = self.issue_tokens(account_id, LoginMode::MultiDevice).await?;
        let roles = self.accounts.role_names(account.id).await?;

        tracing::info!(account_id = %account_id, matched = ?matched, "Federated login");
        Ok(FederatedLogin {
            account: account.into_view(roles),
            tokens,
            matched,
        })
    }

    async fn refresh_picture(
        &self,
        account: AccountRow,
        profile: &FederatedProfile,
    ) -> Result<AccountRow, AuthError> {
        match profile.picture.as_deref() {
            Some(picture) if account.profile_pic.as_deref() != Some(picture) => {
                self.accounts.update_profile_pic(account.id, picture).await?;
                Ok(AccountRow {
                    profile_pic: Some(picture.to_string()),
                    ..account
                })
            }
            _ => Ok(account),
        }
    }

    async fn create_federated(
        &self,
        profile: &FederatedProfile,
        email: &str,
    ) -> Result<(AccountRow, FederatedMatch), AuthError> {
        if email.chars().count() > EMAIL_MAX_LENGTH {
            return Err(AuthError::FederatedIdentity(
                "identity provider returned an over-long email".to_string(),
            ));
        }
        let role = self.default_role_id().await?;
        let base = profile
            .preferred_username()
            .unwrap_or_else(|| self.default_role.clone());
        let username = self.unique_username(&base).await?;

        let created = self
            .accounts
            .create(CreateAccount {
                id: Uuid::new_v4(),
                username,
                email: email.to_string(),
                password_hash: None,
                federated_id: Some(profile.external_id.clone()),
                profile_pic: profile.picture.clone(),
                role_ids: vec![role],
            })
            .await;

        match created {
            Ok(account) => {
                tracing::info!(account_id = %account.id, "Account registered via federated identity");
                Ok((account, FederatedMatch::Created))
            }
            // A concurrent first login for the same identity won
            Err(DbError::UniqueViolation(constraint)) if constraint == "accounts_federated_id_key" => {
                let account = self
                    .accounts
                    .find_by_federated_id(&profile.external_id)
                    .await?
                    .ok_or_else(|| {
                        AuthError::Conflict("federated identity already linked".to_string())
                    })?;
                Ok((account, FederatedMatch::Existing))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn unique_username(&self, base: &str) -> Result<String, AuthError> {
        let base = truncate_chars(base, USERNAME_MAX_LENGTH);
        if self.accounts.find_by_username(base).await?.is_none() {
            return Ok(base.to_string());
        }

        // `_` plus six hex characters
        let stem = truncate_chars(base, USERNAME_MAX_LENGTH - 7);
        for _ in 0..USERNAME_ATTEMPTS {
            let suffix = Uuid::new_v4().simple().to_string();
            let candidate = format!("{stem}_{}", &suffix[..6]);
            if self.accounts.find_by_username(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(AuthError::Conflict("username already registered".to_string()))
    }

    async fn default_role_id(&self) -> Result<Uuid, AuthError> {
        let role = self.roles.find_by_name(&self.default_role).await?.ok_or_else(|| {
            tracing::error!(role = %self.default_role, "Default role is missing");
            AuthError::Configuration(format!(
                "default role {} is missing, run the bootstrap seed",
                self.default_role
            ))
        })?;
        Ok(role.id)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Check an email/password pair.
    ///
    /// Unknown email, missing password hash, wrong password and inactive
    /// account all fail the same way.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AccountRow, AuthError> {
        let account = self
            .accounts
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let Some(hash) = account.password_hash.as_deref() else {
            tracing::debug!(account_id = %account.id, "Password login for account without password");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify_blocking(password, hash).await {
            return Err(AuthError::InvalidCredentials);
        }

        if !account.is_active {
            tracing::debug!(account_id = %account.id, "Password login for inactive account");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(account)
    }

    /// Password login; `mode` decides whether other sessions survive
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        mode: LoginMode,
    ) -> Result<TokenPair, AuthError> {
        let account = self.authenticate(email, password).await?;
        let tokens = self.issue_tokens(account.account_id(), mode).await?;
        tracing::info!(account_id = %account.id, mode = ?mode, "Password login");
        Ok(tokens)
    }

    /// Issue an access/refresh pair and persist the refresh token
    pub async fn issue_tokens(
        &self,
        account_id: AccountId,
        mode: LoginMode,
    ) -> Result<TokenPair, AuthError> {
        let access = self.codec.issue_access(account_id)?;
        let refresh = self.codec.issue_refresh(account_id)?;

        self.tokens
            .store(
                account_id,
                &refresh.token,
                refresh.expires_at,
                mode.revokes_existing(),
            )
            .await?;

        Ok(self.pair(access, refresh))
    }

    /// Load the principal behind an account id.
    ///
    /// Fails with [`AuthError::Unauthorized`] when the account is gone or inactive.
    pub async fn principal(&self, account_id: AccountId) -> Result<Principal, AuthError> {
        let account = self.active_account(account_id).await?;
        let roles = self.roles.find_for_account(account.id).await?;

        Ok(Principal {
            account_id,
            username: account.username,
            email: account.email,
            roles: PermissionResolver::role_names(&roles),
            permissions: PermissionResolver::resolve(&roles),
        })
    }

    async fn active_account(&self, account_id: AccountId) -> Result<AccountRow, AuthError> {
        match self.accounts.find_by_id(account_id.0).await? {
            Some(account) if account.is_active => Ok(account),
            Some(_) => {
                tracing::debug!(account_id = %account_id, "Token for inactive account");
                Err(AuthError::Unauthorized)
            }
            None => {
                tracing::debug!(account_id = %account_id, "Token for unknown account");
                Err(AuthError::Unauthorized)
            }
        }
    }

    // =========================================================================
    // Rotation and logout
    // =========================================================================

    /// Exchange a refresh token for a new pair.
    ///
    /// The presented token is single-use: it is revoked as the successor is
    /// stored, and every failure is [`AuthError::Unauthorized`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let subject = self
            .codec
            .verify_kind(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                tracing::debug!("Refresh token rejected: {}", e);
                AuthError::Unauthorized
            })?;

        let now = Utc::now();
        let record = self.tokens.find(refresh_token).await?.ok_or_else(|| {
            tracing::warn!(account_id = %subject, "Unknown refresh token presented");
            AuthError::Unauthorized
        })?;

        if record.account_id != subject.0 {
            tracing::warn!(account_id = %subject, "Refresh token record belongs to another account");
            return Err(AuthError::Unauthorized);
        }
        if record.revoked {
            tracing::warn!(account_id = %subject, "Revoked refresh token presented, possible replay");
            return Err(AuthError::Unauthorized);
        }
        if record.is_expired_at(now) {
            tracing::debug!(account_id = %subject, "Expired refresh token presented");
            return Err(AuthError::Unauthorized);
        }

        self.active_account(subject).await?;

        let access = self.codec.issue_access(subject)?;
        let successor = self.codec.issue_refresh(subject)?;
        let rotated = self
            .tokens
            .rotate(
                refresh_token,
                subject,
                &successor.token,
                successor.expires_at,
                now,
            )
            .await?;

        if rotated.is_none() {
            tracing::warn!(account_id = %subject, "Refresh token was rotated concurrently");
            return Err(AuthError::Unauthorized);
        }

        tracing::info!(account_id = %subject, "Refresh token rotated");
        Ok(self.pair(access, successor))
    }

    /// Revoke exactly the presented refresh token
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        if !self.tokens.revoke(refresh_token).await? {
            return Err(AuthError::NotFound("refresh token".to_string()));
        }
        tracing::info!("Logged out");
        Ok(())
    }

    /// Revoke every session of an account
    pub async fn logout_all(&self, account_id: AccountId) -> Result<u64, AuthError> {
        let revoked = self.tokens.revoke_all_unrevoked_for(account_id).await?;
        tracing::info!(account_id = %account_id, revoked, "Logged out everywhere");
        Ok(revoked)
    }

    fn pair(&self, access: IssuedToken, refresh: IssuedToken) -> TokenPair {
        let expires_in = u64::try_from(self.codec.access_ttl().num_seconds()).unwrap_or(0);
        TokenPair::bearer(access.token, refresh.token, expires_in)
    }
}

/// Longest username the accounts table stores
pub const USERNAME_MAX_LENGTH: usize = 50;

/// Longest email the accounts table stores
pub const EMAIL_MAX_LENGTH: usize = 100;

/// Shape and length checks for a username/email pair
pub(crate) fn validate_identity(username: &str, email: &str) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(AuthError::InvalidInput("username is required".to_string()));
    }
    if username.chars().count() > USERNAME_MAX_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "username must be at most {USERNAME_MAX_LENGTH} characters"
        )));
    }
    if email.chars().count() > EMAIL_MAX_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "email must be at most {EMAIL_MAX_LENGTH} characters"
        )));
    }
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid_email {
        return Err(AuthError::InvalidInput("email is not valid".to_string()));
    }
    Ok(())
}

fn ensure_active_for_federated(account: &AccountRow) -> Result<(), AuthError> {
    if account.is_active {
        return Ok(());
    }
    tracing::debug!(account_id = %account.id, "Federated login for inactive account");
    Err(AuthError::InvalidCredentials)
}

/// Longest prefix of `s` with at most `max` characters
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

impl<A, R, T> std::fmt::Debug for AccountManager<A, R, T>
where
    A: AccountRepository,
    R: RoleRepository,
    T: RefreshTokenRepository,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountManager")
            .field("codec", &self.codec)
            .field("default_role", &self.default_role)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identity() {
        assert!(validate_identity("alice", "alice@x.com").is_ok());
        assert!(validate_identity("", "alice@x.com").is_err());
        assert!(validate_identity("alice", "alice").is_err());
        assert!(validate_identity("alice", "@x.com").is_err());
        assert!(validate_identity("alice", "alice@").is_err());
    }

    #[test]
    fn test_validate_identity_length_limits() {
        let username = "u".repeat(USERNAME_MAX_LENGTH);
        let email = format!("{}@x.com", "e".repeat(EMAIL_MAX_LENGTH - 6));
        assert!(validate_identity(&username, &email).is_ok());

        let long_username = "u".repeat(USERNAME_MAX_LENGTH + 1);
        assert!(matches!(
            validate_identity(&long_username, "alice@x.com"),
            Err(AuthError::InvalidInput(_))
        ));

        let long_email = format!("{}@x.com", "e".repeat(EMAIL_MAX_LENGTH));
        assert!(matches!(
            validate_identity("alice", &long_email),
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("alice", 10), "alice");
        assert_eq!(truncate_chars("alice", 3), "ali");
        assert_eq!(truncate_chars("zoë-ü", 3), "zoë");
    }
}
