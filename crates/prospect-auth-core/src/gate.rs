//! Per-endpoint authorization gate

use prospect_types::{PermissionCode, PermissionSet};

use crate::{AuthError, Principal};

/// A permission requirement checked against an already loaded principal.
///
/// The gate does no I/O; build one per endpoint with the `(module, action)`
/// it protects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGate {
    required: PermissionCode,
}

impl AuthorizationGate {
    /// Require `module:action`
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            required: PermissionCode::new(module, action),
        }
    }

    /// The code this gate requires
    pub fn required(&self) -> &PermissionCode {
        &self.required
    }

    /// Whether a resolved permission set satisfies the gate
    pub fn allows(&self, permissions: &PermissionSet) -> bool {
        permissions.contains(&self.required)
    }

    /// Allow or deny with [`AuthError::Forbidden`]
    pub fn check(&self, principal: &Principal) -> Result<(), AuthError> {
        if self.allows(&principal.permissions) {
            Ok(())
        } else {
            tracing::debug!(
                account_id = %principal.account_id,
                required = %self.required,
                "Permission denied"
            );
            Err(AuthError::Forbidden(self.required.clone()))
        }
    }
}

impl From<PermissionCode> for AuthorizationGate {
    fn from(required: PermissionCode) -> Self {
        Self { required }
    }
}

/// One-off check of `module:action` for a principal
pub fn authorize(principal: &Principal, module: &str, action: &str) -> Result<(), AuthError> {
    AuthorizationGate::new(module, action).check(principal)
}
