//! SurrealDB implementation of [`ConsumptionRepository`].

use chrono::{DateTime, Utc};
use kitty_core::error::KittyResult;
use kitty_core::models::audit::CreateAuditEntry;
use kitty_core::models::consumption::{Consumption, ConsumptionFilter, CreateConsumption};
use kitty_core::repository::{ConsumptionRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CREATE_AUDIT, CountRow, audit_content, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ConsumptionRow {
    record_id: String,
    member_id: String,
    product_id: String,
    quantity: i64,
    unit_price: i64,
    amount: i64,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl ConsumptionRow {
    fn try_into_consumption(self) -> Result<Consumption, DbError> {
        Ok(Consumption {
            id: parse_uuid(&self.record_id, "consumption")?,
            member_id: parse_uuid(&self.member_id, "member")?,
            product_id: parse_uuid(&self.product_id, "product")?,
            quantity: self.quantity,
            unit_price: self.unit_price,
            amount: self.amount,
            created_by: parse_uuid(&self.created_by, "creator")?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the consumption repository.
#[derive(Clone)]
pub struct SurrealConsumptionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealConsumptionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ConsumptionRepository for SurrealConsumptionRepository<C> {
    async fn create(
        &self,
        id: Uuid,
        input: CreateConsumption,
        audit: CreateAuditEntry,
    ) -> KittyResult<Consumption> {
        let query = format!(
            "BEGIN TRANSACTION;
             CREATE type::record('consumption', $id) SET \
                 member_id = $member_id, product_id = $product_id, \
                 quantity = $quantity, unit_price = $unit_price, \
                 amount = $amount, created_by = $created_by;
             {CREATE_AUDIT}
             COMMIT TRANSACTION;"
        );

        self.db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("member_id", input.member_id.to_string()))
            .bind(("product_id", input.product_id.to_string()))
            .bind(("quantity", input.quantity))
            .bind(("unit_price", input.unit_price))
            .bind(("amount", input.amount))
            .bind(("created_by", input.created_by.to_string()))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check(e, "consumption"))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> KittyResult<Consumption> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('consumption', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ConsumptionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "consumption".into(),
            id: id_str,
        })?;

        Ok(row.try_into_consumption()?)
    }

    async fn list(
        &self,
        filter: ConsumptionFilter,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<Consumption>> {
        let mut conditions = Vec::new();
        if filter.member_id.is_some() {
            conditions.push("member_id = $member_id");
        }
        if filter.product_id.is_some() {
            conditions.push("product_id = $product_id");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT count() AS total FROM consumption {where_clause} GROUP ALL;
             SELECT meta::id(id) AS record_id, * FROM consumption {where_clause} \
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
        if let Some(product_id) = filter.product_id {
            builder = builder.bind(("product_id", product_id.to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<ConsumptionRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(ConsumptionRow::try_into_consumption)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_all(&self, member_id: Option<Uuid>) -> KittyResult<Vec<Consumption>> {
        let query = if member_id.is_some() {
            "SELECT meta::id(id) AS record_id, * FROM consumption \
             WHERE member_id = $member_id"
        } else {
            "SELECT meta::id(id) AS record_id, * FROM consumption"
        };

        let mut builder = self.db.query(query);
        if let Some(member_id) = member_id {
            builder = builder.bind(("member_id", member_id.to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<ConsumptionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(ConsumptionRow::try_into_consumption)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
