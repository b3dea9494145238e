//! Property-based tests for permission resolution and token round trips
//!
//! These tests verify:
//! - Resolution is independent of role and permission order
//! - A code granted through several roles counts once
//! - Permission codes survive Display -> FromStr
//! - Access tokens verify back to their subject

use jsonwebtoken::Algorithm;
use prospect_auth_core::{AuthConfig, AuthorizationGate, PermissionResolver, TokenCodec, TokenKind};
use prospect_db::{PermissionRow, RoleRow, RoleWithPermissions};
use prospect_types::{AccountId, PermissionCode};
use proptest::prelude::*;
use std::collections::BTreeSet;
use uuid::Uuid;

// ============================================================================
// Strategies
// ============================================================================

fn arb_code_part() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,11}"
}

fn arb_code() -> impl Strategy<Value = (String, String)> {
    (arb_code_part(), arb_code_part())
}

fn arb_role() -> impl Strategy<Value = RoleWithPermissions> {
    ("[a-z]{3,10}", prop::collection::vec(arb_code(), 0..6)).prop_map(|(name, codes)| {
        RoleWithPermissions {
            role: RoleRow {
                id: Uuid::new_v4(),
                name,
            },
            permissions: codes
                .into_iter()
                .map(|(module, name)| PermissionRow {
                    id: Uuid::new_v4(),
                    module,
                    name,
                })
                .collect(),
        }
    })
}

fn codec() -> TokenCodec {
    TokenCodec::new(&AuthConfig::try_new("p".repeat(48), Algorithm::HS256).unwrap())
}

// ============================================================================
// Resolution properties
// ============================================================================

proptest! {
    /// Property: reversing role order (and each role's permissions) changes nothing
    #[test]
    fn resolution_is_order_independent(roles in prop::collection::vec(arb_role(), 0..5)) {
        let forward = PermissionResolver::resolve(&roles);

        let reversed: Vec<RoleWithPermissions> = roles
            .iter()
            .rev()
            .cloned()
            .map(|mut r| {
                r.permissions.reverse();
                r
            })
            .collect();
        let backward = PermissionResolver::resolve(&reversed);

        prop_assert_eq!(forward, backward);
    }

    /// Property: the result is exactly the set of distinct codes across roles
    #[test]
    fn resolution_is_the_union(roles in prop::collection::vec(arb_role(), 0..5)) {
        let resolved = PermissionResolver::resolve(&roles);

        let expected: BTreeSet<String> = roles
            .iter()
            .flat_map(|r| r.permissions.iter())
            .map(|p| format!("{}:{}", p.module, p.name))
            .collect();
        let actual: BTreeSet<String> = resolved.iter().map(|c| c.to_string()).collect();

        prop_assert_eq!(actual, expected);
    }

    /// Property: duplicating a role never grows the set
    #[test]
    fn duplicate_roles_count_once(role in arb_role()) {
        let once = PermissionResolver::resolve(std::slice::from_ref(&role));
        let twice = PermissionResolver::resolve(&[role.clone(), role]);
        prop_assert_eq!(once, twice);
    }

    /// Property: a gate allows exactly the codes in the resolved set
    #[test]
    fn gate_matches_resolution(roles in prop::collection::vec(arb_role(), 0..4), (module, action) in arb_code()) {
        let resolved = PermissionResolver::resolve(&roles);
        let gate = AuthorizationGate::new(module.clone(), action.clone());
        let granted = roles
            .iter()
            .flat_map(|r| r.permissions.iter())
            .any(|p| p.module == module && p.name == action);
        prop_assert_eq!(gate.allows(&resolved), granted);
    }
}

// ============================================================================
// Permission code properties
// ============================================================================

proptest! {
    /// Property: Display then FromStr gives back the same code
    #[test]
    fn permission_code_roundtrip((module, action) in arb_code()) {
        let code = PermissionCode::new(module, action);
        let parsed: PermissionCode = code.to_string().parse().unwrap();
        prop_assert_eq!(parsed, code);
    }

    /// Property: arbitrary strings never panic the parser
    #[test]
    fn permission_code_parse_never_panics(s in ".{0,40}") {
        let _ = s.parse::<PermissionCode>();
    }
}

// ============================================================================
// Token properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: an access token verifies to its subject
    #[test]
    fn access_token_roundtrip(bytes in any::<[u8; 16]>()) {
        let codec = codec();
        let subject = AccountId(Uuid::from_bytes(bytes));
        let issued = codec.issue_access(subject).unwrap();
        prop_assert_eq!(codec.verify_kind(&issued.token, TokenKind::Access).unwrap(), subject);
    }

    /// Property: garbage never verifies and never panics
    #[test]
    fn garbage_never_verifies(s in "[A-Za-z0-9._-]{0,200}") {
        prop_assert!(codec().verify(&s).is_err());
    }
}
