//! Auth service - ties together the account lifecycle, directory and providers

use async_trait::async_trait;
use prospect_db::{AccountRepository, PermissionRepository, RefreshTokenRepository, RoleRepository};
use prospect_types::{AccountId, AccountView, LoginMode, TokenPair};
use std::sync::Arc;

use crate::{
    AccountManager, AuthConfig, AuthError, AuthorizationGate, Bootstrapper, DirectoryService,
    FederatedLogin, IdentityProvider, NewAccount, PasswordHasher, Principal, TokenKind,
};

/// Resolves a bearer access token to a principal.
///
/// HTTP adapters depend on this trait rather than on a concrete service.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify an access token and load the caller
    async fn authenticate(&self, bearer: &str) -> Result<Principal, AuthError>;
}

/// Authentication service
///
/// Provides a unified interface for:
/// - Registration and login (local and federated)
/// - Refresh rotation and logout
/// - Bearer authentication and permission checks
/// - User, role and permission administration
pub struct AuthService<A, R, P, T>
where
    A: AccountRepository,
    R: RoleRepository,
    P: PermissionRepository,
    T: RefreshTokenRepository,
{
    config: AuthConfig,
    manager: AccountManager<A, R, T>,
    directory: DirectoryService<A, R, P>,
    bootstrap: Bootstrapper<A, R, P>,
    identity_provider: Option<Arc<dyn IdentityProvider>>,
}

impl<A, R, P, T> AuthService<A, R, P, T>
where
    A: AccountRepository,
    R: RoleRepository,
    P: PermissionRepository,
    T: RefreshTokenRepository,
{
    /// Create a new auth service
    pub fn new(
        config: AuthConfig,
        accounts: Arc<A>,
        roles: Arc<R>,
        permissions: Arc<P>,
        refresh_tokens: Arc<T>,
    ) -> Self {
        let hasher = PasswordHasher::new(config.password_hash_cost);

        Self {
            manager: AccountManager::new(
                &config,
                Arc::clone(&accounts),
                Arc::clone(&roles),
                refresh_tokens,
            ),
            directory: DirectoryService::new(
                Arc::clone(&accounts),
                Arc::clone(&roles),
                Arc::clone(&permissions),
                hasher,
            ),
            bootstrap: Bootstrapper::new(accounts, roles, permissions, hasher),
            identity_provider: None,
            config,
        }
    }

    /// Enable federated login through `provider`
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity_provider = Some(provider);
        self
    }

    /// The account lifecycle manager
    pub fn accounts(&self) -> &AccountManager<A, R, T> {
        &self.manager
    }

    /// The administrative directory
    pub fn directory(&self) -> &DirectoryService<A, R, P> {
        &self.directory
    }

    /// The startup seeder
    pub fn bootstrap(&self) -> &Bootstrapper<A, R, P> {
        &self.bootstrap
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Register a local account
    pub async fn register(&self, new: NewAccount) -> Result<AccountView, AuthError> {
        self.manager.register(new).await
    }

    /// Password login
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        mode: LoginMode,
    ) -> Result<TokenPair, AuthError> {
        self.manager.login(email, password, mode).await
    }

    /// Complete a federated login from an authorization code
    pub async fn login_with_code(&self, code: &str) -> Result<FederatedLogin, AuthError> {
        let provider = self.identity_provider.as_ref().ok_or_else(|| {
            AuthError::FederatedIdentity("federated login is not enabled".to_string())
        })?;
        let profile = provider.exchange_code(code).await?;
        tracing::debug!(provider = %provider.provider(), "Authorization code exchanged");
        self.manager.login_federated(&profile).await
    }

    /// Rotate a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.manager.refresh(refresh_token).await
    }

    /// Revoke a refresh token
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.manager.logout(refresh_token).await
    }

    /// Revoke every refresh token of an account
    pub async fn logout_all(&self, account_id: AccountId) -> Result<u64, AuthError> {
        self.manager.logout_all(account_id).await
    }

    // =========================================================================
    // Authorization
    // =========================================================================

    /// Verify an access token and load the caller with roles and permissions
    pub async fn authenticate_bearer(&self, bearer: &str) -> Result<Principal, AuthError> {
        let account_id = self
            .manager
            .codec()
            .verify_kind(bearer, TokenKind::Access)?;
        self.manager.principal(account_id).await
    }

    /// Authenticate a bearer token and check `module:action` in one step
    pub async fn authorize(
        &self,
        bearer: &str,
        module: &str,
        action: &str,
    ) -> Result<Principal, AuthError> {
        let principal = self.authenticate_bearer(bearer).await?;
        AuthorizationGate::new(module, action).check(&principal)?;
        Ok(principal)
    }
}

#[async_trait]
impl<A, R, P, T> Authenticator for AuthService<A, R, P, T>
where
    A: AccountRepository + 'static,
    R: RoleRepository + 'static,
    P: PermissionRepository + 'static,
    T: RefreshTokenRepository + 'static,
{
    async fn authenticate(&self, bearer: &str) -> Result<Principal, AuthError> {
        self.authenticate_bearer(bearer).await
    }
}

impl<A, R, P, T> std::fmt::Debug for AuthService<A, R, P, T>
where
    A: AccountRepository,
    R: RoleRepository,
    P: PermissionRepository,
    T: RefreshTokenRepository,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("config", &self.config)
            .field("federated_login", &self.identity_provider.is_some())
            .finish()
    }
}
