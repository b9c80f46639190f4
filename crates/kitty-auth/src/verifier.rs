//! Actor verification: identity, activity, PIN and role in one call.

use std::fmt;

use kitty_core::error::{KittyError, KittyResult};
use kitty_core::models::member::{Role, RoleRequirement};
use kitty_core::repository::MemberRepository;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::pin::PinPolicy;

/// Identity and secret presented with a single call.
#[derive(Clone)]
pub struct ActorCredentials {
    pub actor_id: Uuid,
    pub pin: String,
}

impl ActorCredentials {
    pub fn new(actor_id: Uuid, pin: impl Into<String>) -> Self {
        Self {
            actor_id,
            pin: pin.into(),
        }
    }
}

impl fmt::Debug for ActorCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorCredentials")
            .field("actor_id", &self.actor_id)
            .finish_non_exhaustive()
    }
}

/// Proof that an actor passed verification for the current call.
///
/// Passed explicitly into downstream operations; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedActor {
    pub id: Uuid,
    pub role: Role,
    pub display_name: String,
}

impl VerifiedActor {
    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }
}

/// Verifies actors against the member store.
///
/// Generic over the member repository so that the auth layer has no
/// dependency on the database crate.
#[derive(Clone)]
pub struct ActorVerifier<M: MemberRepository> {
    members: M,
    config: AuthConfig,
}

impl<M: MemberRepository> ActorVerifier<M> {
    pub fn new(members: M, config: AuthConfig) -> Self {
        Self { members, config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Verify `actor_id` with `pin`, optionally demanding a role.
    ///
    /// Checks run in a fixed order: existence, active flag, PIN, role.
    /// The active check precedes the PIN comparison so that a
    /// deactivated member is refused even with the right PIN.
    pub async fn verify(
        &self,
        actor_id: Uuid,
        pin: &str,
        required: Option<RoleRequirement>,
    ) -> KittyResult<VerifiedActor> {
        let member = match self.members.get_by_id(actor_id).await {
            Ok(member) => member,
            Err(KittyError::NotFound { .. }) => {
                return Err(self.refuse(actor_id, AuthError::ActorNotFound));
            }
            Err(e) => return Err(e),
        };

        if !member.is_active {
            return Err(self.refuse(actor_id, AuthError::ActorInactive));
        }

        if !self.policy().matches(pin, &member.pin_hash)? {
            return Err(self.refuse(actor_id, AuthError::SecretMismatch));
        }

        if let Some(required) = required {
            if !required.permits(member.role) {
                return Err(self.refuse(
                    actor_id,
                    AuthError::RoleNotPermitted {
                        required,
                        actual: member.role,
                    },
                ));
            }
        }

        debug!(actor_id = %actor_id, role = %member.role, "actor verified");
        Ok(VerifiedActor {
            id: member.id,
            role: member.role,
            display_name: member.display_name,
        })
    }

    /// [`verify`](Self::verify) taking bundled credentials.
    pub async fn verify_credentials(
        &self,
        credentials: &ActorCredentials,
        required: Option<RoleRequirement>,
    ) -> KittyResult<VerifiedActor> {
        self.verify(credentials.actor_id, &credentials.pin, required)
            .await
    }

    /// Whether `pin` is the member's current PIN.
    ///
    /// Unknown and inactive members are errors, a wrong PIN is
    /// `Ok(false)`.
    pub async fn check_pin(&self, actor_id: Uuid, pin: &str) -> KittyResult<bool> {
        let member = match self.members.get_by_id(actor_id).await {
            Ok(member) => member,
            Err(KittyError::NotFound { .. }) => {
                return Err(self.refuse(actor_id, AuthError::ActorNotFound));
            }
            Err(e) => return Err(e),
        };
        if !member.is_active {
            return Err(self.refuse(actor_id, AuthError::ActorInactive));
        }
        Ok(self.policy().matches(pin, &member.pin_hash)?)
    }

    /// Check a PIN about to be stored against the configured policy.
    pub fn validate_new_pin(&self, new_pin: &str) -> KittyResult<()> {
        Ok(self.policy().check_new(new_pin)?)
    }

    fn policy(&self) -> PinPolicy<'_> {
        PinPolicy::new(&self.config)
    }

    fn refuse(&self, actor_id: Uuid, err: AuthError) -> KittyError {
        warn!(actor_id = %actor_id, reason = err.label(), "actor verification failed");
        err.into()
    }
}
