//! Stock purchases paid out of a privileged member's pocket and later
//! reimbursed from the kitty.
//!
//! Purchases are bookkeeping only: they never enter a member balance.
//! Every operation, reads included, needs a treasurer or administrator.

use kitty_auth::{ActorCredentials, ActorVerifier, VerifiedActor};
use kitty_core::error::{KittyError, KittyResult};
use kitty_core::models::MAX_AMOUNT;
use kitty_core::models::audit::{AuditAction, EntityType};
use kitty_core::models::member::RoleRequirement;
use kitty_core::models::stock::{
    NewStockPurchase, StockPurchase, StockPurchaseFields, StockPurchaseFilter,
    UpdateStockPurchase,
};
use kitty_core::repository::{
    MemberRepository, PaginatedResult, Pagination, StockPurchaseRepository,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit;

pub struct StockPurchaseService<M: MemberRepository, S: StockPurchaseRepository> {
    verifier: ActorVerifier<M>,
    purchases: S,
}

impl<M: MemberRepository, S: StockPurchaseRepository> StockPurchaseService<M, S> {
    pub fn new(verifier: ActorVerifier<M>, purchases: S) -> Self {
        Self {
            verifier,
            purchases,
        }
    }

    pub async fn create(
        &self,
        credentials: &ActorCredentials,
        input: NewStockPurchase,
    ) -> KittyResult<StockPurchase> {
        let actor = self.privileged(credentials).await?;
        let fields = validate(StockPurchaseFields {
            item_name: input.item_name,
            supplier: input.supplier,
            quantity: input.quantity,
            unit_price: input.unit_price,
            total_amount: 0,
            purchase_date: input.purchase_date,
            receipt_number: input.receipt_number,
            notes: input.notes,
        })?;

        let id = Uuid::new_v4();
        let entry = audit::entry(
            actor.id,
            AuditAction::Create,
            EntityType::StockPurchase,
            id,
            serde_json::json!({
                "item_name": fields.item_name,
                "quantity": fields.quantity,
                "total_amount": fields.total_amount,
                "supplier": fields.supplier,
            }),
        );
        let purchase = self.purchases.create(id, fields, actor.id, entry).await?;
        debug!(actor_id = %actor.id, stock_purchase_id = %id, "stock purchase created");
        Ok(purchase)
    }

    /// Partial edit. Refused with `AlreadyCashedOut` once reimbursed.
    pub async fn update(
        &self,
        credentials: &ActorCredentials,
        id: Uuid,
        input: UpdateStockPurchase,
    ) -> KittyResult<StockPurchase> {
        let actor = self.privileged(credentials).await?;
        if input.is_empty() {
            return Err(KittyError::Validation {
                message: "no changes given".into(),
            });
        }

        let current = self.purchases.get_by_id(id).await?;
        if current.is_cash_out_processed {
            return Err(KittyError::AlreadyCashedOut);
        }

        let changes = serde_json::to_value(&input)
            .map_err(|e| KittyError::Internal(format!("encoding audit metadata: {e}")))?;
        let changes = strip_nulls(changes);
        let fields = validate(input.merge_into(&current))?;
        let mut metadata = changes;
        if fields.total_amount != current.total_amount {
            metadata["total_amount"] = fields.total_amount.into();
            metadata["previous_total_amount"] = current.total_amount.into();
        }

        let entry = audit::entry(
            actor.id,
            AuditAction::Update,
            EntityType::StockPurchase,
            id,
            metadata,
        );
        let purchase = self.purchases.update(id, fields, entry).await?;
        debug!(actor_id = %actor.id, stock_purchase_id = %id, "stock purchase updated");
        Ok(purchase)
    }

    /// Mark the purchase as reimbursed. Succeeds exactly once.
    pub async fn cash_out(
        &self,
        credentials: &ActorCredentials,
        id: Uuid,
    ) -> KittyResult<StockPurchase> {
        let actor = self.privileged(credentials).await?;
        let current = self.purchases.get_by_id(id).await?;
        if current.is_cash_out_processed {
            return Err(KittyError::AlreadyCashedOut);
        }

        let entry = audit::entry(
            actor.id,
            AuditAction::CashOut,
            EntityType::StockPurchase,
            id,
            serde_json::json!({
                "item_name": current.item_name,
                "total_amount": current.total_amount,
            }),
        );
        let purchase = self.purchases.cash_out(id, actor.id, entry).await?;
        info!(
            actor_id = %actor.id,
            stock_purchase_id = %id,
            total_amount = purchase.total_amount,
            "stock purchase cashed out"
        );
        Ok(purchase)
    }

    /// Delete a purchase that has not been reimbursed.
    pub async fn delete(&self, credentials: &ActorCredentials, id: Uuid) -> KittyResult<()> {
        let actor = self.privileged(credentials).await?;
        let current = self.purchases.get_by_id(id).await?;
        if current.is_cash_out_processed {
            return Err(KittyError::AlreadyCashedOut);
        }

        let entry = audit::entry(
            actor.id,
            AuditAction::Delete,
            EntityType::StockPurchase,
            id,
            serde_json::json!({
                "item_name": current.item_name,
                "total_amount": current.total_amount,
            }),
        );
        self.purchases.delete(id, entry).await?;
        debug!(actor_id = %actor.id, stock_purchase_id = %id, "stock purchase deleted");
        Ok(())
    }

    pub async fn get(&self, credentials: &ActorCredentials, id: Uuid) -> KittyResult<StockPurchase> {
        self.privileged(credentials).await?;
        self.purchases.get_by_id(id).await
    }

    /// Newest first, optionally only processed or only open purchases.
    pub async fn list(
        &self,
        credentials: &ActorCredentials,
        filter: StockPurchaseFilter,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<StockPurchase>> {
        self.privileged(credentials).await?;
        self.purchases.list(filter, pagination).await
    }

    async fn privileged(&self, credentials: &ActorCredentials) -> KittyResult<VerifiedActor> {
        self.verifier
            .verify_credentials(credentials, Some(RoleRequirement::Privileged))
            .await
    }
}

/// Normalise text fields and recompute the total.
fn validate(mut fields: StockPurchaseFields) -> KittyResult<StockPurchaseFields> {
    let item_name = fields.item_name.trim();
    if item_name.is_empty() {
        return Err(KittyError::Validation {
            message: "item name must not be empty".into(),
        });
    }
    fields.item_name = item_name.to_string();
    if fields.quantity <= 0 {
        return Err(KittyError::Validation {
            message: format!("quantity must be positive, got {}", fields.quantity),
        });
    }
    if !(0..=MAX_AMOUNT).contains(&fields.unit_price) {
        return Err(KittyError::InvalidAmount {
            amount: fields.unit_price,
        });
    }
    fields.total_amount = fields
        .unit_price
        .checked_mul(fields.quantity)
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or(KittyError::InvalidAmount {
            amount: fields.unit_price.saturating_mul(fields.quantity),
        })?;

    fields.supplier = blank_to_none(fields.supplier);
    fields.receipt_number = blank_to_none(fields.receipt_number);
    fields.notes = blank_to_none(fields.notes);
    Ok(fields)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn strip_nulls(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            serde_json::Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn fields(quantity: i64, unit_price: i64) -> StockPurchaseFields {
        StockPurchaseFields {
            item_name: "  Club Mate ".into(),
            supplier: Some("  ".into()),
            quantity,
            unit_price,
            total_amount: 0,
            purchase_date: Utc::now(),
            receipt_number: None,
            notes: Some(" crate deposit included ".into()),
        }
    }

    #[test]
    fn total_is_recomputed_and_text_trimmed() {
        let valid = validate(fields(24, 95)).unwrap();
        assert_eq!(valid.total_amount, 2280);
        assert_eq!(valid.item_name, "Club Mate");
        assert_eq!(valid.supplier, None);
        assert_eq!(valid.notes.as_deref(), Some("crate deposit included"));
    }

    #[test]
    fn total_above_the_cap_is_refused() {
        let err = validate(fields(2, MAX_AMOUNT)).unwrap_err();
        assert!(matches!(err, KittyError::InvalidAmount { .. }));
        let err = validate(fields(i64::MAX, 2)).unwrap_err();
        assert!(matches!(err, KittyError::InvalidAmount { .. }));
        assert!(validate(fields(1, MAX_AMOUNT)).is_ok());
    }

    #[test]
    fn quantity_and_price_are_checked() {
        assert!(matches!(
            validate(fields(0, 95)),
            Err(KittyError::Validation { .. })
        ));
        assert!(matches!(
            validate(fields(1, -1)),
            Err(KittyError::InvalidAmount { amount: -1 })
        ));
    }

    #[test]
    fn update_metadata_lists_only_changed_fields() {
        let input = UpdateStockPurchase {
            quantity: Some(3),
            ..Default::default()
        };
        let metadata = strip_nulls(serde_json::to_value(&input).unwrap());
        let keys: Vec<_> = metadata.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["quantity".to_string()]);
    }
}
