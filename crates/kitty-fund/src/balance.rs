//! Balance calculator.
//!
//! A member's balance is derived, never stored:
//!
//! ```text
//! balance = Σ confirmed deposits − Σ confirmed payouts − Σ consumptions
//! ```
//!
//! The folding functions are pure so the arithmetic can be checked
//! without storage. [`BalanceCalculator`] feeds them from the
//! repositories.

use std::collections::HashMap;

use kitty_core::error::{KittyError, KittyResult};
use kitty_core::models::consumption::Consumption;
use kitty_core::models::money_move::{MoneyMove, MoneyMoveStatus};
use kitty_core::repository::{ConsumptionRepository, MemberRepository, MoneyMoveRepository};
use serde::Serialize;
use uuid::Uuid;

use crate::config::FundConfig;

/// Balance of one member in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberBalance {
    pub member_id: Uuid,
    pub display_name: String,
    pub balance: i64,
}

/// Balance of `member_id` over the given ledger rows. Rows for other
/// members and unconfirmed moves are ignored.
///
/// Amounts are capped per row, but a long enough ledger can still leave
/// the `i64` range; that is reported as `BalanceOverflow`.
pub fn member_balance(
    member_id: Uuid,
    moves: &[MoneyMove],
    consumptions: &[Consumption],
) -> KittyResult<i64> {
    let mut balance = 0i64;
    for mv in moves {
        if mv.member_id == member_id && mv.status == MoneyMoveStatus::Confirmed {
            balance = apply(balance, mv.signed_amount(), member_id)?;
        }
    }
    for consumption in consumptions {
        if consumption.member_id == member_id {
            balance = charge(balance, consumption.amount, member_id)?;
        }
    }
    Ok(balance)
}

/// Balances of every member in `member_ids`, in a single pass over the
/// ledger. Members without any rows get zero.
pub fn fold_balances(
    member_ids: impl IntoIterator<Item = Uuid>,
    moves: &[MoneyMove],
    consumptions: &[Consumption],
) -> KittyResult<HashMap<Uuid, i64>> {
    let mut balances: HashMap<Uuid, i64> = member_ids.into_iter().map(|id| (id, 0)).collect();

    for mv in moves {
        if mv.status != MoneyMoveStatus::Confirmed {
            continue;
        }
        if let Some(balance) = balances.get_mut(&mv.member_id) {
            *balance = apply(*balance, mv.signed_amount(), mv.member_id)?;
        }
    }
    for consumption in consumptions {
        if let Some(balance) = balances.get_mut(&consumption.member_id) {
            *balance = charge(*balance, consumption.amount, consumption.member_id)?;
        }
    }

    Ok(balances)
}

fn apply(balance: i64, delta: i64, member_id: Uuid) -> KittyResult<i64> {
    balance
        .checked_add(delta)
        .ok_or(KittyError::BalanceOverflow { member_id })
}

fn charge(balance: i64, amount: i64, member_id: Uuid) -> KittyResult<i64> {
    balance
        .checked_sub(amount)
        .ok_or(KittyError::BalanceOverflow { member_id })
}

pub struct BalanceCalculator<M, R, C>
where
    M: MemberRepository,
    R: MoneyMoveRepository,
    C: ConsumptionRepository,
{
    members: M,
    moves: R,
    consumptions: C,
    config: FundConfig,
}

impl<M, R, C> BalanceCalculator<M, R, C>
where
    M: MemberRepository,
    R: MoneyMoveRepository,
    C: ConsumptionRepository,
{
    pub fn new(members: M, moves: R, consumptions: C, config: FundConfig) -> Self {
        Self {
            members,
            moves,
            consumptions,
            config,
        }
    }

    /// Current balance of one member. Unknown members are `NotFound`.
    pub async fn balance(&self, member_id: Uuid) -> KittyResult<i64> {
        self.members.get_by_id(member_id).await?;
        let moves = self.moves.list_confirmed(Some(member_id)).await?;
        let consumptions = self.consumptions.list_all(Some(member_id)).await?;
        member_balance(member_id, &moves, &consumptions)
    }

    /// Balances of all active members, ordered by display name.
    pub async fn all_balances(&self) -> KittyResult<Vec<MemberBalance>> {
        let members = self.members.list_active().await?;
        let moves = self.moves.list_confirmed(None).await?;
        let consumptions = self.consumptions.list_all(None).await?;

        let balances = fold_balances(members.iter().map(|m| m.id), &moves, &consumptions)?;

        let mut out: Vec<MemberBalance> = members
            .into_iter()
            .map(|m| MemberBalance {
                balance: balances.get(&m.id).copied().unwrap_or(0),
                member_id: m.id,
                display_name: m.display_name,
            })
            .collect();
        out.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(out)
    }

    /// Active members whose balance is strictly below `threshold`
    /// (configured default when `None`).
    pub async fn below_threshold(&self, threshold: Option<i64>) -> KittyResult<Vec<MemberBalance>> {
        let threshold = threshold.unwrap_or(self.config.balance_threshold);
        let mut all = self.all_balances().await?;
        all.retain(|b| b.balance < threshold);
        Ok(all)
    }

    /// Active members whose balance is at least `threshold`.
    pub async fn at_or_above_threshold(
        &self,
        threshold: Option<i64>,
    ) -> KittyResult<Vec<MemberBalance>> {
        let threshold = threshold.unwrap_or(self.config.balance_threshold);
        let mut all = self.all_balances().await?;
        all.retain(|b| b.balance >= threshold);
        Ok(all)
    }
}
