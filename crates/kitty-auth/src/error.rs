//! Authentication error types.

use kitty_core::error::KittyError;
use kitty_core::models::member::{Role, RoleRequirement};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("actor not found")]
    ActorNotFound,

    #[error("actor is inactive")]
    ActorInactive,

    #[error("secret does not match")]
    SecretMismatch,

    #[error("role {actual} is not permitted (requires {required})")]
    RoleNotPermitted {
        required: RoleRequirement,
        actual: Role,
    },

    #[error("PIN policy violated: {0}")]
    WeakPin(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl AuthError {
    /// Short label used in log events.
    pub fn label(&self) -> &'static str {
        match self {
            AuthError::ActorNotFound => "actor_not_found",
            AuthError::ActorInactive => "actor_inactive",
            AuthError::SecretMismatch => "secret_mismatch",
            AuthError::RoleNotPermitted { .. } => "role_not_permitted",
            AuthError::WeakPin(_) => "weak_pin",
            AuthError::Crypto(_) => "crypto",
        }
    }
}

impl From<AuthError> for KittyError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::ActorNotFound => KittyError::ActorNotFound,
            AuthError::ActorInactive => KittyError::ActorInactive,
            AuthError::SecretMismatch => KittyError::SecretMismatch,
            AuthError::RoleNotPermitted { required, actual } => {
                KittyError::RoleNotPermitted { required, actual }
            }
            AuthError::WeakPin(message) => KittyError::Validation { message },
            AuthError::Crypto(msg) => KittyError::Crypto(msg),
        }
    }
}
