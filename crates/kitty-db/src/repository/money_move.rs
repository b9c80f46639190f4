//! SurrealDB implementation of [`MoneyMoveRepository`].

use chrono::{DateTime, Utc};
use kitty_core::error::{KittyError, KittyResult};
use kitty_core::models::audit::CreateAuditEntry;
use kitty_core::models::money_move::{
    CreateMoneyMove, Decision, MoneyMove, MoneyMoveFilter, MoneyMoveKind, MoneyMoveStatus,
};
use kitty_core::repository::{MoneyMoveRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CREATE_AUDIT, CountRow, audit_committed, audit_content, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MoneyMoveRow {
    record_id: String,
    kind: String,
    member_id: String,
    amount: i64,
    note: Option<String>,
    created_by: String,
    status: String,
    decided_by: Option<String>,
    decided_at: Option<DateTime<Utc>>,
    decision_audit_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl MoneyMoveRow {
    fn try_into_money_move(self) -> Result<MoneyMove, DbError> {
        let kind = MoneyMoveKind::parse(&self.kind)
            .ok_or_else(|| DbError::Decode(format!("unknown money move kind: {}", self.kind)))?;
        let status = MoneyMoveStatus::parse(&self.status).ok_or_else(|| {
            DbError::Decode(format!("unknown money move status: {}", self.status))
        })?;
        Ok(MoneyMove {
            id: parse_uuid(&self.record_id, "money move")?,
            kind,
            member_id: parse_uuid(&self.member_id, "member")?,
            amount: self.amount,
            note: self.note,
            created_by: parse_uuid(&self.created_by, "creator")?,
            status,
            decided_by: parse_opt_uuid(self.decided_by.as_deref(), "decider")?,
            decided_at: self.decided_at,
            decision_audit_id: parse_opt_uuid(self.decision_audit_id.as_deref(), "audit")?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the money move repository.
#[derive(Clone)]
pub struct SurrealMoneyMoveRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMoneyMoveRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MoneyMoveRepository for SurrealMoneyMoveRepository<C> {
    async fn create(
        &self,
        id: Uuid,
        input: CreateMoneyMove,
        audit: CreateAuditEntry,
    ) -> KittyResult<MoneyMove> {
        // NULL is not a valid option<string>, so an absent note is written
        // as NONE rather than bound.
        let note = if input.note.is_some() { "$note" } else { "NONE" };
        let query = format!(
            "BEGIN TRANSACTION;
             CREATE type::record('money_move', $id) SET \
                 kind = $kind, member_id = $member_id, amount = $amount, \
                 note = {note}, created_by = $created_by, status = 'Pending', \
                 decided_by = NONE, decided_at = NONE, decision_audit_id = NONE;
             {CREATE_AUDIT}
             COMMIT TRANSACTION;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("kind", input.kind.as_str().to_string()))
            .bind(("member_id", input.member_id.to_string()))
            .bind(("amount", input.amount))
            .bind(("created_by", input.created_by.to_string()))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)));
        if let Some(note) = input.note {
            builder = builder.bind(("note", note));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check(e, "money_move"))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> KittyResult<MoneyMove> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('money_move', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MoneyMoveRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "money_move".into(),
            id: id_str,
        })?;

        Ok(row.try_into_money_move()?)
    }

    async fn list(
        &self,
        filter: MoneyMoveFilter,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<MoneyMove>> {
        let mut conditions = Vec::new();
        if filter.member_id.is_some() {
            conditions.push("member_id = $member_id");
        }
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT count() AS total FROM money_move {where_clause} GROUP ALL;
             SELECT meta::id(id) AS record_id, * FROM money_move {where_clause} \
             ORDER BY created_at DESC LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(member_id) = filter.member_id {
            builder = builder.bind(("member_id", member_id.to_string()));
        }
        if let Some(status) = filter.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<MoneyMoveRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(MoneyMoveRow::try_into_money_move)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_confirmed(&self, member_id: Option<Uuid>) -> KittyResult<Vec<MoneyMove>> {
        let query = if member_id.is_some() {
            "SELECT meta::id(id) AS record_id, * FROM money_move \
             WHERE status = 'Confirmed' AND member_id = $member_id"
        } else {
            "SELECT meta::id(id) AS record_id, * FROM money_move \
             WHERE status = 'Confirmed'"
        };

        let mut builder = self.db.query(query);
        if let Some(member_id) = member_id {
            builder = builder.bind(("member_id", member_id.to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<MoneyMoveRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(MoneyMoveRow::try_into_money_move)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn decide(
        &self,
        id: Uuid,
        decision: Decision,
        decided_by: Uuid,
        audit: CreateAuditEntry,
    ) -> KittyResult<MoneyMove> {
        // The status predicate makes the transition a compare-and-set: only
        // the first writer sees a pending row, every later one updates
        // nothing and therefore writes no audit entry.
        let query = format!(
            "BEGIN TRANSACTION;
             LET $moved = (UPDATE type::record('money_move', $id) SET \
                     status = $new_status, decided_by = $decided_by, \
                     decided_at = time::now(), decision_audit_id = $audit_id \
                 WHERE status = 'Pending' RETURN AFTER);
             IF array::len($moved) > 0 {{
                 {CREATE_AUDIT}
             }};
             COMMIT TRANSACTION;"
        );

        let outcome = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("new_status", decision.target_status().as_str().to_string()))
            .bind(("decided_by", decided_by.to_string()))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .check();

        let current = self.get_by_id(id).await?;
        if let Err(e) = outcome {
            // A write conflict with a concurrent decision surfaces as a
            // failed transaction; the winner is visible on the row.
            if current.status.is_terminal() && current.decision_audit_id != Some(audit.id) {
                return Err(KittyError::AlreadyFinalized {
                    status: current.status,
                });
            }
            return Err(DbError::Query(e.to_string()).into());
        }

        if current.decision_audit_id == Some(audit.id) || audit_committed(&self.db, audit.id).await? {
            debug!(money_move_id = %id, status = %current.status, "money move decided");
            return Ok(current);
        }
        if current.status.is_terminal() {
            return Err(KittyError::AlreadyFinalized {
                status: current.status,
            });
        }
        Err(KittyError::Internal(format!("decision on money move {id} was not applied")))
    }
}
