//! Money move (deposit / payout request) domain model.
//!
//! A money move is created `Pending` and decided exactly once, either
//! `Confirmed` (affects the member's balance) or `Rejected`. Both
//! decided states are terminal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notes longer than this are refused.
pub const MAX_NOTE_LENGTH: usize = 500;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MoneyMoveKind {
    Deposit,
    Payout,
}

impl MoneyMoveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoneyMoveKind::Deposit => "Deposit",
            MoneyMoveKind::Payout => "Payout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Deposit" => Some(MoneyMoveKind::Deposit),
            "Payout" => Some(MoneyMoveKind::Payout),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MoneyMoveStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl MoneyMoveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoneyMoveStatus::Pending => "Pending",
            MoneyMoveStatus::Confirmed => "Confirmed",
            MoneyMoveStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(MoneyMoveStatus::Pending),
            "Confirmed" => Some(MoneyMoveStatus::Confirmed),
            "Rejected" => Some(MoneyMoveStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, MoneyMoveStatus::Pending)
    }
}

impl fmt::Display for MoneyMoveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two ways a pending money move can be decided.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> MoneyMoveStatus {
        match self {
            Decision::Confirm => MoneyMoveStatus::Confirmed,
            Decision::Reject => MoneyMoveStatus::Rejected,
        }
    }

    /// Only confirmation is subject to the two-person rule.
    pub fn requires_second_person(&self) -> bool {
        matches!(self, Decision::Confirm)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoneyMove {
    pub id: Uuid,
    pub kind: MoneyMoveKind,
    /// Member whose balance the move affects.
    pub member_id: Uuid,
    /// Minor currency units, always positive.
    pub amount: i64,
    pub note: Option<String>,
    pub created_by: Uuid,
    pub status: MoneyMoveStatus,
    /// Confirmer or rejector.
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    /// Audit entry written together with the decision.
    pub decision_audit_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl MoneyMove {
    /// Signed effect on the member's balance once confirmed.
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            MoneyMoveKind::Deposit => self.amount,
            MoneyMoveKind::Payout => -self.amount,
        }
    }
}

/// Caller-supplied request for a new money move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMoneyMove {
    pub kind: MoneyMoveKind,
    pub member_id: Uuid,
    pub amount: i64,
    pub note: Option<String>,
}

/// Fully validated row to insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMoneyMove {
    pub kind: MoneyMoveKind,
    pub member_id: Uuid,
    pub amount: i64,
    pub note: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct MoneyMoveFilter {
    pub member_id: Option<Uuid>,
    pub status: Option<MoneyMoveStatus>,
}
