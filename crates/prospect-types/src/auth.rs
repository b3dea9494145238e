//! Authentication types

use serde::{Deserialize, Serialize};

/// External identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Local username/password
    Local,
    /// Google OAuth
    Google,
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Google => write!(f, "google"),
        }
    }
}

/// Identity data returned by a federated identity provider after a code exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedProfile {
    /// Provider-scoped subject id
    pub external_id: String,
    /// Verified email, required for account linking
    pub email: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Profile picture URL
    pub picture: Option<String>,
}

impl FederatedProfile {
    /// Username to use when creating a fresh account for this profile.
    ///
    /// Falls back to the local part of the email when the provider sent no name.
    pub fn preferred_username(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|local| !local.is_empty())
            .map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: Option<&str>, email: Option<&str>) -> FederatedProfile {
        FederatedProfile {
            external_id: "g-123".to_string(),
            email: email.map(String::from),
            name: name.map(String::from),
            picture: None,
        }
    }

    #[test]
    fn test_preferred_username() {
        assert_eq!(
            profile(Some("Alice Doe"), Some("alice@x.com")).preferred_username(),
            Some("Alice Doe".to_string())
        );
        assert_eq!(
            profile(None, Some("alice@x.com")).preferred_username(),
            Some("alice".to_string())
        );
        assert_eq!(
            profile(Some("   "), Some("bob@x.com")).preferred_username(),
            Some("bob".to_string())
        );
        assert_eq!(profile(None, None).preferred_username(), None);
    }
}
