//! Consumption domain model. Consumptions are immutable once booked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consumption {
    pub id: Uuid,
    /// Member who consumed.
    pub member_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    /// Product price captured at booking time.
    pub unit_price: i64,
    /// `unit_price * quantity`.
    pub amount: i64,
    /// Actor who booked it (the member or a kiosk operator).
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConsumption {
    pub member_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price: i64,
    pub amount: i64,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct ConsumptionFilter {
    pub member_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}
