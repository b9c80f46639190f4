//! SurrealDB repository implementations.
//!
//! Mutations run as a single SurrealQL transaction that also creates the
//! audit entry. Guarded mutations wrap both statements in an `IF` so that
//! a refused guard writes nothing. Whether a guarded write was applied is
//! read back through the pre-assigned audit entry id.

mod audit;
mod consumption;
mod member;
mod money_move;
mod product;
mod stock;

pub use audit::SurrealAuditLogRepository;
pub use consumption::SurrealConsumptionRepository;
pub use member::SurrealMemberRepository;
pub use money_move::SurrealMoneyMoveRepository;
pub use product::SurrealProductRepository;
pub use stock::SurrealStockPurchaseRepository;

use kitty_core::models::audit::CreateAuditEntry;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Statement appended to every mutation. Expects `$audit_id` and `$audit`.
pub(crate) const CREATE_AUDIT: &str =
    "CREATE type::record('audit_log', $audit_id) CONTENT $audit;";

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

#[derive(Debug, SurrealValue)]
struct IdRow {
    #[allow(dead_code)]
    record_id: String,
}

pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn parse_opt_uuid(value: Option<&str>, field: &str) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(v, field)).transpose()
}

/// Record body for an audit entry. The timestamp is filled in by the
/// field default so that it reflects commit time.
pub(crate) fn audit_content(entry: &CreateAuditEntry) -> serde_json::Value {
    let metadata = match &entry.metadata {
        serde_json::Value::Object(_) => entry.metadata.clone(),
        serde_json::Value::Null => serde_json::json!({}),
        other => serde_json::json!({ "value": other }),
    };
    serde_json::json!({
        "actor_id": entry.actor_id.to_string(),
        "action": entry.action.as_str(),
        "entity_type": entry.entity_type.as_str(),
        "entity_id": entry.entity_id.to_string(),
        "metadata": metadata,
    })
}

/// Whether the audit entry with the given id was committed.
pub(crate) async fn audit_committed<C: Connection>(
    db: &Surreal<C>,
    audit_id: Uuid,
) -> Result<bool, DbError> {
    let mut result = db
        .query("SELECT meta::id(id) AS record_id FROM type::record('audit_log', $id)")
        .bind(("id", audit_id.to_string()))
        .await?;
    let rows: Vec<IdRow> = result.take(0)?;
    Ok(!rows.is_empty())
}
