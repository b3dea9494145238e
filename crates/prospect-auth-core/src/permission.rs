//! Effective permission resolution

use prospect_db::RoleWithPermissions;
use prospect_types::PermissionSet;

/// Computes the permission set reachable through an account's roles.
///
/// A code granted by several roles counts once, and the result does not
/// depend on role or permission order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionResolver;

impl PermissionResolver {
    /// Resolve the union of all role permissions
    pub fn resolve(roles: &[RoleWithPermissions]) -> PermissionSet {
        roles
            .iter()
            .flat_map(|r| r.permissions.iter())
            .map(|p| p.code())
            .collect()
    }

    /// Role names in a stable order
    pub fn role_names(roles: &[RoleWithPermissions]) -> Vec<String> {
        let mut names: Vec<String> = roles.iter().map(|r| r.role.name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }
}
