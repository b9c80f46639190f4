//! Member administration.

use kitty_auth::{ActorCredentials, ActorVerifier};
use kitty_core::error::{KittyError, KittyResult};
use kitty_core::models::audit::{AuditAction, EntityType};
use kitty_core::models::member::{CreateMember, Member, Role, RoleRequirement, UpdateMember};
use kitty_core::repository::{MemberRepository, PaginatedResult, Pagination};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit;
use crate::locks::RosterLock;

pub struct MemberService<M: MemberRepository> {
    verifier: ActorVerifier<M>,
    members: M,
    roster: RosterLock,
}

impl<M: MemberRepository> MemberService<M> {
    /// `roster` must be the lock shared with the lifecycle guard.
    pub fn new(verifier: ActorVerifier<M>, members: M, roster: RosterLock) -> Self {
        Self {
            verifier,
            members,
            roster,
        }
    }

    pub async fn create_member(
        &self,
        credentials: &ActorCredentials,
        input: CreateMember,
    ) -> KittyResult<Member> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::Administrator))
            .await?;
        self.insert(actor.id, input).await
    }

    /// Create the first administrator of an empty roster.
    ///
    /// Refused once any active administrator exists. The new member is
    /// recorded as the actor of its own creation.
    pub async fn bootstrap_administrator(
        &self,
        display_name: &str,
        pin: &str,
    ) -> KittyResult<Member> {
        let _roster = self.roster.acquire().await;
        if self.members.count_active_administrators().await? > 0 {
            return Err(KittyError::Validation {
                message: "an active administrator already exists".into(),
            });
        }
        let id = Uuid::new_v4();
        let member = self
            .insert_with_id(
                id,
                id,
                CreateMember {
                    display_name: display_name.into(),
                    role: Role::Administrator,
                    pin: pin.into(),
                },
            )
            .await?;
        info!(member_id = %member.id, "bootstrap administrator created");
        Ok(member)
    }

    pub async fn update_member(
        &self,
        credentials: &ActorCredentials,
        target: Uuid,
        input: UpdateMember,
    ) -> KittyResult<Member> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::Administrator))
            .await?;

        if input.is_empty() {
            return Err(KittyError::Validation {
                message: "no changes given".into(),
            });
        }
        let display_name = match &input.display_name {
            Some(name) => Some(normalize_name(name)?),
            None => None,
        };

        let _roster = self.roster.acquire().await;

        let current = self.members.get_by_id(target).await?;
        if input.is_active == Some(true) && current.removed_at.is_some() {
            return Err(KittyError::Validation {
                message: "removed members cannot be reactivated".into(),
            });
        }
        if let Some(name) = &display_name {
            if *name != current.display_name {
                self.ensure_name_free(name).await?;
            }
        }

        let guard_last_admin = input.demotes_administrator(&current);
        if guard_last_admin && self.members.count_active_administrators().await? <= 1 {
            warn!(actor_id = %actor.id, target = %target, "demotion of last administrator refused");
            return Err(KittyError::LastAdministratorProtection);
        }

        let entry = audit::entry(
            actor.id,
            AuditAction::Update,
            EntityType::Member,
            target,
            serde_json::json!({
                "display_name": display_name,
                "role": input.role.map(|r| r.as_str()),
                "is_active": input.is_active,
                "previous_role": current.role.as_str(),
                "previous_active": current.is_active,
            }),
        );
        let updated = self
            .members
            .update(
                target,
                UpdateMember {
                    display_name,
                    ..input
                },
                guard_last_admin,
                entry,
            )
            .await?;
        debug!(actor_id = %actor.id, target = %target, "member updated");
        Ok(updated)
    }

    /// Administrator resets another member's PIN.
    pub async fn set_pin(
        &self,
        credentials: &ActorCredentials,
        target: Uuid,
        new_pin: &str,
    ) -> KittyResult<()> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::Administrator))
            .await?;
        self.verifier.validate_new_pin(new_pin)?;
        self.members.get_by_id(target).await?;

        let entry = audit::entry(
            actor.id,
            AuditAction::SetPin,
            EntityType::Member,
            target,
            serde_json::json!({}),
        );
        self.members.set_pin(target, new_pin, entry).await?;
        debug!(actor_id = %actor.id, target = %target, "member PIN reset");
        Ok(())
    }

    /// Any active member changes their own PIN, authenticated with the
    /// current one.
    pub async fn change_own_pin(
        &self,
        credentials: &ActorCredentials,
        new_pin: &str,
    ) -> KittyResult<()> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::AnyMember))
            .await?;
        self.verifier.validate_new_pin(new_pin)?;

        let entry = audit::entry(
            actor.id,
            AuditAction::ChangePin,
            EntityType::Member,
            actor.id,
            serde_json::json!({}),
        );
        self.members.set_pin(actor.id, new_pin, entry).await?;
        debug!(actor_id = %actor.id, "own PIN changed");
        Ok(())
    }

    /// Operator PIN recovery from the host, without credentials.
    pub async fn recover_pin(&self, target: Uuid, new_pin: &str) -> KittyResult<()> {
        self.verifier.validate_new_pin(new_pin)?;
        self.members.get_by_id(target).await?;
        let entry = audit::entry(
            target,
            AuditAction::SetPin,
            EntityType::Member,
            target,
            serde_json::json!({ "recovery": true }),
        );
        self.members.set_pin(target, new_pin, entry).await?;
        info!(target = %target, "member PIN recovered by operator");
        Ok(())
    }

    /// Whether `pin` is the member's current PIN.
    pub async fn check_pin(&self, member_id: Uuid, pin: &str) -> KittyResult<bool> {
        self.verifier.check_pin(member_id, pin).await
    }

    pub async fn get(&self, id: Uuid) -> KittyResult<Member> {
        self.members.get_by_id(id).await
    }

    pub async fn get_by_display_name(&self, display_name: &str) -> KittyResult<Member> {
        self.members.get_by_display_name(display_name).await
    }

    pub async fn list(
        &self,
        active_only: bool,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<Member>> {
        self.members.list(active_only, pagination).await
    }

    async fn insert(&self, actor_id: Uuid, input: CreateMember) -> KittyResult<Member> {
        self.insert_with_id(actor_id, Uuid::new_v4(), input).await
    }

    async fn insert_with_id(
        &self,
        actor_id: Uuid,
        id: Uuid,
        input: CreateMember,
    ) -> KittyResult<Member> {
        let display_name = normalize_name(&input.display_name)?;
        self.verifier.validate_new_pin(&input.pin)?;
        self.ensure_name_free(&display_name).await?;

        let entry = audit::entry(
            actor_id,
            AuditAction::Create,
            EntityType::Member,
            id,
            serde_json::json!({
                "display_name": display_name,
                "role": input.role.as_str(),
            }),
        );
        let member = self
            .members
            .create(
                id,
                CreateMember {
                    display_name,
                    ..input
                },
                entry,
            )
            .await?;
        debug!(actor_id = %actor_id, member_id = %member.id, role = %member.role, "member created");
        Ok(member)
    }

    async fn ensure_name_free(&self, display_name: &str) -> KittyResult<()> {
        match self.members.get_by_display_name(display_name).await {
            Ok(_) => Err(KittyError::AlreadyExists {
                entity: "member".into(),
            }),
            Err(KittyError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn normalize_name(name: &str) -> KittyResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(KittyError::Validation {
            message: "display name must not be empty".into(),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed() {
        assert_eq!(normalize_name("  Ada ").unwrap(), "Ada");
        assert!(matches!(
            normalize_name("   "),
            Err(KittyError::Validation { .. })
        ));
    }
}
