//! Member lifecycle guard.
//!
//! Removal is a two-step protocol. A member without history is deleted
//! outright. A member with history is only removed when the caller
//! repeats the request with `force`, and then only deactivated so the
//! historical records keep a valid reference. The last active
//! administrator can never be removed.

use kitty_auth::{ActorCredentials, ActorVerifier};
use kitty_core::error::{KittyError, KittyResult};
use kitty_core::models::audit::{AuditAction, EntityType};
use kitty_core::models::member::{RelatedRecordCategory, RelatedRecords, RoleRequirement};
use kitty_core::repository::MemberRepository;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::audit;
use crate::locks::RosterLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RemovalOutcome {
    /// The member had no history and was deleted.
    Removed,
    /// The member had history and is now permanently inactive.
    Deactivated { related: Vec<RelatedRecordCategory> },
}

pub struct MemberLifecycleGuard<M: MemberRepository> {
    verifier: ActorVerifier<M>,
    members: M,
    roster: RosterLock,
}

impl<M: MemberRepository> MemberLifecycleGuard<M> {
    pub fn new(verifier: ActorVerifier<M>, members: M, roster: RosterLock) -> Self {
        Self {
            verifier,
            members,
            roster,
        }
    }

    /// Read-only pre-flight: which historical records reference `target`.
    pub async fn inspect(&self, target: Uuid) -> KittyResult<RelatedRecords> {
        self.members.get_by_id(target).await?;
        self.members.related_records(target).await
    }

    /// Remove `target`, or deactivate it when `force` is set and it has
    /// related records.
    pub async fn remove_member(
        &self,
        credentials: &ActorCredentials,
        target: Uuid,
        force: bool,
    ) -> KittyResult<RemovalOutcome> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::Administrator))
            .await?;

        let _roster = self.roster.acquire().await;

        let member = self.members.get_by_id(target).await?;
        if member.is_active_administrator()
            && self.members.count_active_administrators().await? <= 1
        {
            warn!(actor_id = %actor.id, target = %target, "removal of last administrator refused");
            return Err(KittyError::LastAdministratorProtection);
        }

        let related = self.members.related_records(target).await?;
        if related.is_empty() {
            let entry = audit::entry(
                actor.id,
                AuditAction::Delete,
                EntityType::Member,
                target,
                serde_json::json!({
                    "hard_delete": true,
                    "display_name": member.display_name,
                    "role": member.role.as_str(),
                }),
            );
            self.members.remove(target, entry).await?;
            debug!(actor_id = %actor.id, target = %target, "member removed");
            return Ok(RemovalOutcome::Removed);
        }

        let categories = related.categories();
        if !force {
            warn!(
                actor_id = %actor.id,
                target = %target,
                consumptions = related.consumptions,
                money_moves = related.money_moves,
                audit_entries = related.audit_entries,
                "removal of member with history needs force"
            );
            return Err(KittyError::RelatedRecordsConflict { categories });
        }

        if !member.is_active {
            debug!(target = %target, "member already inactive");
            return Ok(RemovalOutcome::Deactivated {
                related: categories,
            });
        }

        let names: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
        let entry = audit::entry(
            actor.id,
            AuditAction::Deactivate,
            EntityType::Member,
            target,
            serde_json::json!({
                "soft_delete": true,
                "related": names,
            }),
        );
        self.members.deactivate(target, entry).await?;
        debug!(actor_id = %actor.id, target = %target, "member deactivated");
        Ok(RemovalOutcome::Deactivated {
            related: categories,
        })
    }
}
