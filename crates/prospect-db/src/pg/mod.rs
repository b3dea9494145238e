//! PostgreSQL repository implementations

mod account;
mod permission;
mod refresh_token;
mod role;

pub use account::PgAccountRepository;
pub use permission::PgPermissionRepository;
pub use refresh_token::PgRefreshTokenRepository;
pub use role::PgRoleRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub accounts: PgAccountRepository,
    pub roles: PgRoleRepository,
    pub permissions: PgPermissionRepository,
    pub refresh_tokens: PgRefreshTokenRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            accounts: PgAccountRepository::new(pool.clone()),
            roles: PgRoleRepository::new(pool.clone()),
            permissions: PgPermissionRepository::new(pool.clone()),
            refresh_tokens: PgRefreshTokenRepository::new(pool),
        }
    }
}
