//! Kitty Auth: per-action actor verification.
//!
//! There are no sessions: every privileged call presents the actor id
//! and PIN, which are checked against the stored Argon2id hash together
//! with the role the operation requires.

pub mod config;
pub mod error;
pub mod pin;
pub mod verifier;

pub use config::AuthConfig;
pub use error::AuthError;
pub use pin::PinPolicy;
pub use verifier::{ActorCredentials, ActorVerifier, VerifiedActor};
