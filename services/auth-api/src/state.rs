//! Application state

use std::sync::Arc;

use axum::extract::FromRef;
use prospect_auth_core::AuthService;
use prospect_axum::SharedAuthenticator;
use prospect_db::pg::{
    PgAccountRepository, PgPermissionRepository, PgRefreshTokenRepository, PgRoleRepository,
};
use prospect_db::{DbPool, Repositories};

use crate::config::Config;

/// Type alias for the auth service with concrete repository types
pub type AuthServiceImpl = AuthService<
    PgAccountRepository,
    PgRoleRepository,
    PgPermissionRepository,
    PgRefreshTokenRepository,
>;

/// Build the auth service over the PostgreSQL repositories
pub fn build_auth_service(config: &Config, repos: Repositories) -> AuthServiceImpl {
    AuthService::new(
        config.auth.clone(),
        Arc::new(repos.accounts),
        Arc::new(repos.roles),
        Arc::new(repos.permissions),
        Arc::new(repos.refresh_tokens),
    )
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Auth service for sessions, administration and bearer checks
    pub auth: Arc<AuthServiceImpl>,
    /// Database connection pool (readiness checks)
    pub pool: DbPool,
}

impl AppState {
    /// Create new application state
    pub fn new(auth: AuthServiceImpl, pool: DbPool) -> Self {
        Self {
            auth: Arc::new(auth),
            pool,
        }
    }
}

impl FromRef<AppState> for SharedAuthenticator {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
