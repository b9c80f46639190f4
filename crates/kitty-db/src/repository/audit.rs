//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! The audit log is append-only: this repository never issues UPDATE or
//! DELETE against `audit_log`, and the table permissions forbid both.

use chrono::{DateTime, Utc};
use kitty_core::error::KittyResult;
use kitty_core::models::audit::{AuditAction, AuditEntry, AuditFilter, CreateAuditEntry, EntityType};
use kitty_core::repository::{AuditLogRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CREATE_AUDIT, CountRow, audit_content, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditRow {
    record_id: String,
    actor_id: String,
    action: String,
    entity_type: String,
    entity_id: String,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl AuditRow {
    fn try_into_entry(self) -> Result<AuditEntry, DbError> {
        let action = AuditAction::parse(&self.action)
            .ok_or_else(|| DbError::Decode(format!("unknown audit action: {}", self.action)))?;
        let entity_type = EntityType::parse(&self.entity_type).ok_or_else(|| {
            DbError::Decode(format!("unknown entity type: {}", self.entity_type))
        })?;
        Ok(AuditEntry {
            id: parse_uuid(&self.record_id, "audit entry")?,
            actor_id: parse_uuid(&self.actor_id, "actor")?,
            action,
            entity_type,
            entity_id: parse_uuid(&self.entity_id, "entity")?,
            metadata: self.metadata,
            timestamp: self.timestamp,
        })
    }
}

/// SurrealDB implementation of the audit log repository.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, entry: CreateAuditEntry) -> KittyResult<AuditEntry> {
        self.db
            .query(CREATE_AUDIT)
            .bind(("audit_id", entry.id.to_string()))
            .bind(("audit", audit_content(&entry)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check(e, "audit_log"))?;

        self.get_by_id(entry.id).await
    }

    async fn get_by_id(&self, id: Uuid) -> KittyResult<AuditEntry> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('audit_log', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_log".into(),
            id: id_str,
        })?;

        Ok(row.try_into_entry()?)
    }

    async fn list(
        &self,
        filter: AuditFilter,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<AuditEntry>> {
        let mut conditions = Vec::new();
        if filter.actor_id.is_some() {
            conditions.push("actor_id = $actor_id");
        }
        if filter.entity_type.is_some() {
            conditions.push("entity_type = $entity_type");
        }
        if filter.entity_id.is_some() {
            conditions.push("entity_id = $entity_id");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT count() AS total FROM audit_log {where_clause} GROUP ALL;
             SELECT meta::id(id) AS record_id, * FROM audit_log {where_clause} \
             ORDER BY timestamp DESC LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(actor_id) = filter.actor_id {
            builder = builder.bind(("actor_id", actor_id.to_string()));
        }
        if let Some(entity_type) = filter.entity_type {
            builder = builder.bind(("entity_type", entity_type.as_str().to_string()));
        }
        if let Some(entity_id) = filter.entity_id {
            builder = builder.bind(("entity_id", entity_id.to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<AuditRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(AuditRow::try_into_entry)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
