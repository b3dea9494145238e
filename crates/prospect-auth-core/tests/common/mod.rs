//! Common test utilities for prospect-auth-core integration tests

pub mod mock_repos;

#[allow(unused_imports)]
pub use mock_repos::{
    MockAccountRepository, MockPermissionRepository, MockRefreshTokenRepository, MockRepos,
    MockRoleRepository,
};

use jsonwebtoken::Algorithm;
use prospect_auth_core::{AuthConfig, AuthService};

/// bcrypt cost used in tests (minimum allowed)
#[allow(dead_code)]
pub const TEST_HASH_COST: u32 = 4;

/// Service type wired to the mock repositories
#[allow(dead_code)]
pub type TestAuthService = AuthService<
    MockAccountRepository,
    MockRoleRepository,
    MockPermissionRepository,
    MockRefreshTokenRepository,
>;

/// Config with a fixed test secret and a cheap hash cost
#[allow(dead_code)]
pub fn test_config() -> AuthConfig {
    AuthConfig::try_new("test-secret-key-that-is-long-enough!!", Algorithm::HS256)
        .expect("test secret is long enough")
        .with_password_hash_cost(TEST_HASH_COST)
}

/// Build a service over fresh mock repositories
#[allow(dead_code)]
pub fn test_service(repos: &MockRepos) -> TestAuthService {
    AuthService::new(
        test_config(),
        repos.accounts.clone(),
        repos.roles.clone(),
        repos.permissions.clone(),
        repos.refresh_tokens.clone(),
    )
}

/// Service with roles and permissions already seeded
#[allow(dead_code)]
pub async fn seeded_service(repos: &MockRepos) -> TestAuthService {
    let service = test_service(repos);
    service
        .bootstrap()
        .seed_roles_permissions()
        .await
        .expect("seeding succeeds");
    service
}
