//! The authenticated caller

use prospect_types::{AccountId, PermissionCode, PermissionSet};

/// An authenticated account with its roles and permissions loaded
#[derive(Debug, Clone)]
pub struct Principal {
    pub account_id: AccountId,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
    pub permissions: PermissionSet,
}

impl Principal {
    /// Check if the principal holds a role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the principal holds a permission code
    pub fn has_permission(&self, code: &PermissionCode) -> bool {
        self.permissions.contains(code)
    }
}
