//! Stock purchases: goods bought for the kitty out of a treasurer's
//! pocket. A purchase is reimbursed ("cashed out") exactly once and is
//! frozen from then on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPurchase {
    pub id: Uuid,
    pub item_name: String,
    pub supplier: Option<String>,
    pub quantity: i64,
    /// Minor currency units.
    pub unit_price: i64,
    /// `unit_price * quantity`.
    pub total_amount: i64,
    pub purchase_date: DateTime<Utc>,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
    pub is_cash_out_processed: bool,
    pub cashed_out_by: Option<Uuid>,
    pub cashed_out_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied request for a new purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockPurchase {
    pub item_name: String,
    pub supplier: Option<String>,
    pub quantity: i64,
    pub unit_price: i64,
    pub purchase_date: DateTime<Utc>,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
}

/// Partial edit of a purchase that has not been cashed out yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStockPurchase {
    pub item_name: Option<String>,
    pub supplier: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<i64>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
}

impl UpdateStockPurchase {
    pub fn is_empty(&self) -> bool {
        self.item_name.is_none()
            && self.supplier.is_none()
            && self.quantity.is_none()
            && self.unit_price.is_none()
            && self.purchase_date.is_none()
            && self.receipt_number.is_none()
            && self.notes.is_none()
    }

    /// Apply the edit on top of `current`, leaving the total to be
    /// recomputed by the caller.
    pub fn merge_into(self, current: &StockPurchase) -> StockPurchaseFields {
        StockPurchaseFields {
            item_name: self.item_name.unwrap_or_else(|| current.item_name.clone()),
            supplier: self.supplier.or_else(|| current.supplier.clone()),
            quantity: self.quantity.unwrap_or(current.quantity),
            unit_price: self.unit_price.unwrap_or(current.unit_price),
            total_amount: current.total_amount,
            purchase_date: self.purchase_date.unwrap_or(current.purchase_date),
            receipt_number: self.receipt_number.or_else(|| current.receipt_number.clone()),
            notes: self.notes.or_else(|| current.notes.clone()),
        }
    }
}

/// Complete, validated column set written on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPurchaseFields {
    pub item_name: String,
    pub supplier: Option<String>,
    pub quantity: i64,
    pub unit_price: i64,
    pub total_amount: i64,
    pub purchase_date: DateTime<Utc>,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StockPurchaseFilter {
    pub cash_out_processed: Option<bool>,
}
