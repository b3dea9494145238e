//! Role and permission types

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique role identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub Uuid);

impl RoleId {
    /// Create a new random role ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RoleId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Unique permission identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(pub Uuid);

impl PermissionId {
    /// Create a new random permission ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PermissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PermissionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A grantable capability, identified by module and action.
///
/// The wire form is `"{module}:{action}"`. Equality is structural, so a code
/// built at a check site always matches the code produced from stored
/// permissions without any string formatting in between.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionCode {
    module: String,
    action: String,
}

impl PermissionCode {
    /// Separator between module and action in the wire form
    pub const SEPARATOR: char = ':';

    /// Create a permission code from its parts
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
        }
    }

    /// The module part, e.g. `lead`
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The action part, e.g. `view`
    pub fn action(&self) -> &str {
        &self.action
    }
}

impl std::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.module, Self::SEPARATOR, self.action)
    }
}

impl std::str::FromStr for PermissionCode {
    type Err = PermissionCodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(Self::SEPARATOR) {
            Some((module, action))
                if !module.is_empty() && !action.is_empty() && !action.contains(Self::SEPARATOR) =>
            {
                Ok(Self::new(module, action))
            }
            _ => Err(PermissionCodeParseError(s.to_string())),
        }
    }
}

impl Serialize for PermissionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PermissionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error parsing a permission code string
#[derive(Debug, Clone)]
pub struct PermissionCodeParseError(pub String);

impl std::fmt::Display for PermissionCodeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid permission code: {}", self.0)
    }
}

impl std::error::Error for PermissionCodeParseError {}

/// Effective permission set of an account.
///
/// Ordered, so iteration and serialization are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<PermissionCode>);

impl PermissionSet {
    /// Create an empty permission set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a code; returns false if it was already present
    pub fn insert(&mut self, code: PermissionCode) -> bool {
        self.0.insert(code)
    }

    /// Check membership
    pub fn contains(&self, code: &PermissionCode) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionCode> {
        self.0.iter()
    }
}

impl FromIterator<PermissionCode> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionCode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<PermissionCode> for PermissionSet {
    fn extend<I: IntoIterator<Item = PermissionCode>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_code_display() {
        assert_eq!(PermissionCode::new("lead", "view").to_string(), "lead:view");
    }

    #[test]
    fn test_permission_code_parse() {
        let code: PermissionCode = "user:create".parse().unwrap();
        assert_eq!(code.module(), "user");
        assert_eq!(code.action(), "create");
        assert_eq!(code, PermissionCode::new("user", "create"));
    }

    #[test]
    fn test_permission_code_parse_rejects_malformed() {
        for bad in ["", "user", ":create", "user:", "a:b:c"] {
            assert!(bad.parse::<PermissionCode>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_permission_code_serde_uses_wire_form() {
        let code = PermissionCode::new("lead", "delete");
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"lead:delete\"");
        let back: PermissionCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn test_permission_set_counts_duplicates_once() {
        let set: PermissionSet = [
            PermissionCode::new("lead", "view"),
            PermissionCode::new("lead", "view"),
            PermissionCode::new("user", "view"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&PermissionCode::new("lead", "view")));
        assert!(!set.contains(&PermissionCode::new("lead", "delete")));
    }
}
