//! Authentication configuration.

/// Configuration for actor verification and PIN policy.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Optional pepper prepended to PINs before Argon2id hashing and
    /// verification. Must match the pepper the member repository uses.
    pub pepper: Option<String>,
    /// Minimum PIN length (default: 4).
    pub min_pin_length: usize,
    /// Maximum PIN length (default: 32).
    pub max_pin_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pepper: None,
            min_pin_length: 4,
            max_pin_length: 32,
        }
    }
}
