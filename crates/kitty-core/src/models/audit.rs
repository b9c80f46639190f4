//! Audit log domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Deactivate,
    Confirm,
    Reject,
    SetPin,
    ChangePin,
    CashOut,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Deactivate => "deactivate",
            AuditAction::Confirm => "confirm",
            AuditAction::Reject => "reject",
            AuditAction::SetPin => "set_pin",
            AuditAction::ChangePin => "change_pin",
            AuditAction::CashOut => "cash_out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(AuditAction::Create),
            "update" => Some(AuditAction::Update),
            "delete" => Some(AuditAction::Delete),
            "deactivate" => Some(AuditAction::Deactivate),
            "confirm" => Some(AuditAction::Confirm),
            "reject" => Some(AuditAction::Reject),
            "set_pin" => Some(AuditAction::SetPin),
            "change_pin" => Some(AuditAction::ChangePin),
            "cash_out" => Some(AuditAction::CashOut),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Member,
    MoneyMove,
    Consumption,
    Product,
    StockPurchase,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Member => "member",
            EntityType::MoneyMove => "money_move",
            EntityType::Consumption => "consumption",
            EntityType::Product => "product",
            EntityType::StockPurchase => "stock_purchase",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(EntityType::Member),
            "money_move" => Some(EntityType::MoneyMove),
            "consumption" => Some(EntityType::Consumption),
            "product" => Some(EntityType::Product),
            "stock_purchase" => Some(EntityType::StockPurchase),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// An audit entry ready to be written. The id is assigned up front so
/// the writer can tell afterwards whether its own entry was committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub metadata: serde_json::Value,
}

impl CreateAuditEntry {
    pub fn new(
        actor_id: Uuid,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: Uuid,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            actor_id,
            action,
            entity_type,
            entity_id,
            metadata,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor_id: Option<Uuid>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
}
