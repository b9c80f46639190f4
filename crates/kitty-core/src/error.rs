//! Error types for the kitty fund ledger.
//!
//! Every variant except [`KittyError::Database`], [`KittyError::Crypto`]
//! and [`KittyError::Internal`] is an expected, recoverable outcome that
//! the caller can act on.

use thiserror::Error;
use uuid::Uuid;

use crate::models::member::{RelatedRecordCategory, Role, RoleRequirement};
use crate::models::money_move::MoneyMoveStatus;

#[derive(Debug, Error)]
pub enum KittyError {
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

    #[error("members may only act on their own behalf")]
    ForbiddenTarget,

    #[error("a money move cannot be confirmed by its creator")]
    SelfConfirmationViolation,

    #[error("money move is already {status}")]
    AlreadyFinalized { status: MoneyMoveStatus },

    #[error("invalid amount {amount}: out of range for this field")]
    InvalidAmount { amount: i64 },

    #[error("stock purchase cash-out was already processed")]
    AlreadyCashedOut,

    #[error("balance of member {member_id} does not fit in 64 bits")]
    BalanceOverflow { member_id: Uuid },

    #[error("member has related records: {}", join_categories(.categories))]
    RelatedRecordsConflict {
        categories: Vec<RelatedRecordCategory>,
    },

    #[error("the last active administrator cannot be removed or demoted")]
    LastAdministratorProtection,

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KittyError {
    /// Stable snake_case identifier for the boundary layer.
    pub fn kind(&self) -> &'static str {
        match self {
            KittyError::ActorNotFound => "actor_not_found",
            KittyError::ActorInactive => "actor_inactive",
            KittyError::SecretMismatch => "secret_mismatch",
            KittyError::RoleNotPermitted { .. } => "role_not_permitted",
            KittyError::ForbiddenTarget => "forbidden_target",
            KittyError::SelfConfirmationViolation => "self_confirmation_violation",
            KittyError::AlreadyFinalized { .. } => "already_finalized",
            KittyError::InvalidAmount { .. } => "invalid_amount",
            KittyError::AlreadyCashedOut => "already_cashed_out",
            KittyError::BalanceOverflow { .. } => "balance_overflow",
            KittyError::RelatedRecordsConflict { .. } => "related_records_conflict",
            KittyError::LastAdministratorProtection => "last_administrator_protection",
            KittyError::NotFound { .. } => "not_found",
            KittyError::AlreadyExists { .. } => "already_exists",
            KittyError::Validation { .. } => "validation",
            KittyError::Database(_) => "database",
            KittyError::Crypto(_) => "crypto",
            KittyError::Internal(_) => "internal",
        }
    }

    /// True for authentication failures (unknown actor, inactive actor,
    /// wrong secret). The boundary maps these to "unauthorized".
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            KittyError::ActorNotFound | KittyError::ActorInactive | KittyError::SecretMismatch
        )
    }

    /// True only for storage or crypto backend failures.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            KittyError::Database(_) | KittyError::Crypto(_) | KittyError::Internal(_)
        )
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        KittyError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

fn join_categories(categories: &[RelatedRecordCategory]) -> String {
    categories
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type KittyResult<T> = Result<T, KittyError>;
