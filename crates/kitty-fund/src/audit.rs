//! Audit logger: builds audit entries and reads the log back.
//!
//! Entries that describe a mutation are built here and handed to the
//! repository performing the mutation, which writes both in one
//! transaction. [`AuditLogger::record`] appends entries that have no
//! accompanying mutation.

use kitty_core::error::KittyResult;
use kitty_core::models::audit::{AuditAction, AuditEntry, AuditFilter, CreateAuditEntry, EntityType};
use kitty_core::models::money_move::MoneyMoveStatus;
use kitty_core::repository::{AuditLogRepository, PaginatedResult, Pagination};
use tracing::debug;
use uuid::Uuid;

/// Build an entry to be written together with the mutation it describes.
pub fn entry(
    actor_id: Uuid,
    action: AuditAction,
    entity_type: EntityType,
    entity_id: Uuid,
    metadata: serde_json::Value,
) -> CreateAuditEntry {
    CreateAuditEntry::new(actor_id, action, entity_type, entity_id, metadata)
}

/// Metadata for a status transition.
pub fn transition(previous: MoneyMoveStatus, new: MoneyMoveStatus) -> serde_json::Value {
    serde_json::json!({
        "previous_status": previous.as_str(),
        "new_status": new.as_str(),
    })
}

pub struct AuditLogger<A: AuditLogRepository> {
    repo: A,
}

impl<A: AuditLogRepository> AuditLogger<A> {
    pub fn new(repo: A) -> Self {
        Self { repo }
    }

    /// Append a standalone entry.
    pub async fn record(
        &self,
        actor_id: Uuid,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: Uuid,
        metadata: serde_json::Value,
    ) -> KittyResult<AuditEntry> {
        let written = self
            .repo
            .append(entry(actor_id, action, entity_type, entity_id, metadata))
            .await?;
        debug!(
            audit_id = %written.id,
            action = written.action.as_str(),
            entity_type = written.entity_type.as_str(),
            "audit entry recorded"
        );
        Ok(written)
    }

    pub async fn get(&self, id: Uuid) -> KittyResult<AuditEntry> {
        self.repo.get_by_id(id).await
    }

    /// Newest first.
    pub async fn list(
        &self,
        filter: AuditFilter,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<AuditEntry>> {
        self.repo.list(filter, pagination).await
    }
}
