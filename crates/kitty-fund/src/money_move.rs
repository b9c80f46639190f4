//! Money move state machine.
//!
//! ```text
//! Pending ──confirm──▶ Confirmed
//!    │
//!    └────reject────▶ Rejected
//! ```
//!
//! Both decided states are terminal. Confirmation requires a second
//! person: the confirmer must be a treasurer or administrator other than
//! the creator.

use kitty_auth::{ActorCredentials, ActorVerifier, VerifiedActor};
use kitty_core::error::{KittyError, KittyResult};
use kitty_core::models::MAX_AMOUNT;
use kitty_core::models::audit::{AuditAction, EntityType};
use kitty_core::models::member::RoleRequirement;
use kitty_core::models::money_move::{
    CreateMoneyMove, Decision, MoneyMove, MoneyMoveFilter, MoneyMoveStatus, NewMoneyMove,
};
use kitty_core::repository::{MemberRepository, MoneyMoveRepository, PaginatedResult, Pagination};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::audit;
use crate::config::FundConfig;
use crate::locks::KeyedLocks;

pub struct MoneyMoveService<M: MemberRepository, R: MoneyMoveRepository> {
    verifier: ActorVerifier<M>,
    members: M,
    moves: R,
    config: FundConfig,
    locks: KeyedLocks,
}

impl<M: MemberRepository, R: MoneyMoveRepository> MoneyMoveService<M, R> {
    pub fn new(verifier: ActorVerifier<M>, members: M, moves: R, config: FundConfig) -> Self {
        Self {
            verifier,
            members,
            moves,
            config,
            locks: KeyedLocks::new(),
        }
    }

    /// A treasurer or administrator opens a move for any active member.
    pub async fn create_by_operator(
        &self,
        credentials: &ActorCredentials,
        input: NewMoneyMove,
    ) -> KittyResult<MoneyMove> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::Privileged))
            .await?;
        self.open(&actor, input).await
    }

    /// A member opens a move for themselves.
    pub async fn create_by_self(
        &self,
        credentials: &ActorCredentials,
        input: NewMoneyMove,
    ) -> KittyResult<MoneyMove> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::AnyMember))
            .await?;
        if input.member_id != actor.id {
            warn!(actor_id = %actor.id, target = %input.member_id, "money move for another member refused");
            return Err(KittyError::ForbiddenTarget);
        }
        self.open(&actor, input).await
    }

    /// Open a move, choosing the operator or self path from the verified
    /// role.
    pub async fn create(
        &self,
        credentials: &ActorCredentials,
        input: NewMoneyMove,
    ) -> KittyResult<MoneyMove> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::AnyMember))
            .await?;
        if !actor.is_privileged() && input.member_id != actor.id {
            warn!(actor_id = %actor.id, target = %input.member_id, "money move for another member refused");
            return Err(KittyError::ForbiddenTarget);
        }
        self.open(&actor, input).await
    }

    pub async fn confirm(
        &self,
        credentials: &ActorCredentials,
        move_id: Uuid,
    ) -> KittyResult<MoneyMove> {
        self.decide(credentials, move_id, Decision::Confirm).await
    }

    /// Reject a pending move. The creator may reject their own request.
    pub async fn reject(
        &self,
        credentials: &ActorCredentials,
        move_id: Uuid,
    ) -> KittyResult<MoneyMove> {
        self.decide(credentials, move_id, Decision::Reject).await
    }

    pub async fn get(&self, id: Uuid) -> KittyResult<MoneyMove> {
        self.moves.get_by_id(id).await
    }

    /// Newest first.
    pub async fn list(
        &self,
        filter: MoneyMoveFilter,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<MoneyMove>> {
        self.moves.list(filter, pagination).await
    }

    pub async fn list_pending(
        &self,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<MoneyMove>> {
        self.moves
            .list(
                MoneyMoveFilter {
                    member_id: None,
                    status: Some(MoneyMoveStatus::Pending),
                },
                pagination,
            )
            .await
    }

    fn validate(&self, input: &NewMoneyMove) -> KittyResult<()> {
        if input.amount <= 0 || input.amount > MAX_AMOUNT {
            return Err(KittyError::InvalidAmount {
                amount: input.amount,
            });
        }
        if let Some(note) = &input.note {
            if note.chars().count() > self.config.max_note_length {
                return Err(KittyError::Validation {
                    message: format!(
                        "note must be at most {} characters",
                        self.config.max_note_length
                    ),
                });
            }
        }
        Ok(())
    }

    async fn open(&self, actor: &VerifiedActor, input: NewMoneyMove) -> KittyResult<MoneyMove> {
        self.validate(&input)?;

        let target = self.members.get_by_id(input.member_id).await?;
        if !target.is_active {
            warn!(target = %target.id, "money move for inactive member refused");
            return Err(KittyError::ActorInactive);
        }

        let note = input
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let id = Uuid::new_v4();
        let entry = audit::entry(
            actor.id,
            AuditAction::Create,
            EntityType::MoneyMove,
            id,
            serde_json::json!({
                "kind": input.kind.as_str(),
                "member_id": input.member_id.to_string(),
                "amount": input.amount,
                "note": note,
                "new_status": MoneyMoveStatus::Pending.as_str(),
            }),
        );

        let created = self
            .moves
            .create(
                id,
                CreateMoneyMove {
                    kind: input.kind,
                    member_id: input.member_id,
                    amount: input.amount,
                    note,
                    created_by: actor.id,
                },
                entry,
            )
            .await?;

        debug!(
            money_move_id = %created.id,
            kind = created.kind.as_str(),
            amount = created.amount,
            "money move created"
        );
        Ok(created)
    }

    async fn decide(
        &self,
        credentials: &ActorCredentials,
        move_id: Uuid,
        decision: Decision,
    ) -> KittyResult<MoneyMove> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::Privileged))
            .await?;

        let _guard = self.locks.lock(move_id).await;

        let current = self.moves.get_by_id(move_id).await?;
        if current.status.is_terminal() {
            return Err(KittyError::AlreadyFinalized {
                status: current.status,
            });
        }
        if decision.requires_second_person() && current.created_by == actor.id {
            warn!(actor_id = %actor.id, money_move_id = %move_id, "self-confirmation refused");
            return Err(KittyError::SelfConfirmationViolation);
        }

        let new_status = decision.target_status();
        let action = match decision {
            Decision::Confirm => AuditAction::Confirm,
            Decision::Reject => AuditAction::Reject,
        };
        let entry = audit::entry(
            actor.id,
            action,
            EntityType::MoneyMove,
            move_id,
            audit::transition(current.status, new_status),
        );

        let decided = self.moves.decide(move_id, decision, actor.id, entry).await?;
        debug!(
            money_move_id = %move_id,
            status = %decided.status,
            decided_by = %actor.id,
            "money move decided"
        );
        Ok(decided)
    }
}
