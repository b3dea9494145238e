//! Credential hashing (bcrypt)

use crate::AuthError;

/// Salted adaptive password hasher
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Minimum accepted password length
    pub const MIN_LENGTH: usize = 8;
    /// Maximum accepted password length
    pub const MAX_LENGTH: usize = 128;

    /// Create a hasher with the given bcrypt cost (4..=31)
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// The configured cost
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Check the password length policy
    pub fn validate(plaintext: &str) -> Result<(), AuthError> {
        let len = plaintext.chars().count();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&len) {
            return Err(AuthError::InvalidInput(format!(
                "password must be between {} and {} characters",
                Self::MIN_LENGTH,
                Self::MAX_LENGTH
            )));
        }
        Ok(())
    }

    /// Hash a plaintext password; the salt is embedded in the output
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            AuthError::Internal("failed to hash password".to_string())
        })
    }

    /// Verify a plaintext against a stored hash.
    ///
    /// A malformed stored hash verifies as `false`.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        match bcrypt::verify(plaintext, hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Stored password hash is unreadable: {}", e);
                false
            }
        }
    }

    /// [`hash`](Self::hash) on the blocking pool
    pub async fn hash_blocking(&self, plaintext: &str) -> Result<String, AuthError> {
        let hasher = *self;
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
    }

    /// [`verify`](Self::verify) on the blocking pool
    pub async fn verify_blocking(&self, plaintext: &str, hash: &str) -> bool {
        let hasher = *self;
        let plaintext = plaintext.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash))
            .await
            .unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
