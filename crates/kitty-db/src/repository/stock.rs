//! SurrealDB implementation of [`StockPurchaseRepository`].

use chrono::{DateTime, Utc};
use kitty_core::error::{KittyError, KittyResult};
use kitty_core::models::audit::CreateAuditEntry;
use kitty_core::models::stock::{StockPurchase, StockPurchaseFields, StockPurchaseFilter};
use kitty_core::repository::{PaginatedResult, Pagination, StockPurchaseRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CREATE_AUDIT, CountRow, audit_committed, audit_content, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct StockPurchaseRow {
    record_id: String,
    item_name: String,
    supplier: Option<String>,
    quantity: i64,
    unit_price: i64,
    total_amount: i64,
    purchase_date: DateTime<Utc>,
    receipt_number: Option<String>,
    notes: Option<String>,
    is_cash_out_processed: bool,
    cashed_out_by: Option<String>,
    cashed_out_at: Option<DateTime<Utc>>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl StockPurchaseRow {
    fn try_into_purchase(self) -> Result<StockPurchase, DbError> {
        Ok(StockPurchase {
            id: parse_uuid(&self.record_id, "stock purchase")?,
            item_name: self.item_name,
            supplier: self.supplier,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_amount: self.total_amount,
            purchase_date: self.purchase_date,
            receipt_number: self.receipt_number,
            notes: self.notes,
            is_cash_out_processed: self.is_cash_out_processed,
            cashed_out_by: parse_opt_uuid(self.cashed_out_by.as_deref(), "cashier")?,
            cashed_out_at: self.cashed_out_at,
            created_by: parse_uuid(&self.created_by, "creator")?,
            created_at: self.created_at,
        })
    }
}

/// `SET` clause for the editable columns, read from `$fields`.
const SET_FIELDS: &str = "item_name = $fields.item_name, supplier = $fields.supplier, \
     quantity = $fields.quantity, unit_price = $fields.unit_price, \
     total_amount = $fields.total_amount, \
     purchase_date = <datetime>$fields.purchase_date, \
     receipt_number = $fields.receipt_number, notes = $fields.notes";

/// Bound as `$fields`. Absent optionals are left out of the object so they
/// read as NONE; NULL is not a valid `option<string>`.
fn fields_content(fields: StockPurchaseFields) -> serde_json::Value {
    let mut content = serde_json::Map::new();
    content.insert("item_name".into(), fields.item_name.into());
    content.insert("quantity".into(), fields.quantity.into());
    content.insert("unit_price".into(), fields.unit_price.into());
    content.insert("total_amount".into(), fields.total_amount.into());
    content.insert("purchase_date".into(), fields.purchase_date.to_rfc3339().into());
    for (key, value) in [
        ("supplier", fields.supplier),
        ("receipt_number", fields.receipt_number),
        ("notes", fields.notes),
    ] {
        if let Some(value) = value {
            content.insert(key.into(), value.into());
        }
    }
    serde_json::Value::Object(content)
}

/// SurrealDB implementation of the stock purchase repository.
#[derive(Clone)]
pub struct SurrealStockPurchaseRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealStockPurchaseRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Explain why a guarded write on `id` was not applied.
    async fn refusal(&self, id: Uuid, operation: &str) -> KittyError {
        match self.get_by_id(id).await {
            Ok(current) if current.is_cash_out_processed => KittyError::AlreadyCashedOut,
            Ok(_) => KittyError::Internal(format!("{operation} of stock purchase {id} was not applied")),
            Err(e) => e,
        }
    }
}

impl<C: Connection> StockPurchaseRepository for SurrealStockPurchaseRepository<C> {
    async fn create(
        &self,
        id: Uuid,
        fields: StockPurchaseFields,
        created_by: Uuid,
        audit: CreateAuditEntry,
    ) -> KittyResult<StockPurchase> {
        let query = format!(
            "BEGIN TRANSACTION;
             CREATE type::record('stock_purchase', $id) SET {SET_FIELDS}, \
                 is_cash_out_processed = false, cashed_out_by = NONE, \
                 cashed_out_at = NONE, created_by = $created_by;
             {CREATE_AUDIT}
             COMMIT TRANSACTION;"
        );

        self.db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("fields", fields_content(fields)))
            .bind(("created_by", created_by.to_string()))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check(e, "stock_purchase"))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> KittyResult<StockPurchase> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('stock_purchase', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StockPurchaseRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "stock_purchase".into(),
            id: id_str,
        })?;

        Ok(row.try_into_purchase()?)
    }

    async fn list(
        &self,
        filter: StockPurchaseFilter,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<StockPurchase>> {
        let where_clause = if filter.cash_out_processed.is_some() {
            "WHERE is_cash_out_processed = $processed"
        } else {
            ""
        };
        let query = format!(
            "SELECT count() AS total FROM stock_purchase {where_clause} GROUP ALL;
             SELECT meta::id(id) AS record_id, * FROM stock_purchase {where_clause} \
             ORDER BY created_at DESC LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(processed) = filter.cash_out_processed {
            builder = builder.bind(("processed", processed));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<StockPurchaseRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(StockPurchaseRow::try_into_purchase)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn update(
        &self,
        id: Uuid,
        fields: StockPurchaseFields,
        audit: CreateAuditEntry,
    ) -> KittyResult<StockPurchase> {
        let query = format!(
            "BEGIN TRANSACTION;
             LET $updated = (UPDATE type::record('stock_purchase', $id) SET {SET_FIELDS} \
                 WHERE is_cash_out_processed = false RETURN AFTER);
             IF array::len($updated) > 0 {{
                 {CREATE_AUDIT}
             }};
             COMMIT TRANSACTION;"
        );

        let outcome = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("fields", fields_content(fields)))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .check();
        if let Err(e) = outcome {
            return Err(match self.refusal(id, "update").await {
                KittyError::AlreadyCashedOut => KittyError::AlreadyCashedOut,
                _ => DbError::Query(e.to_string()).into(),
            });
        }

        if audit_committed(&self.db, audit.id).await? {
            debug!(stock_purchase_id = %id, "stock purchase updated");
            return self.get_by_id(id).await;
        }
        Err(self.refusal(id, "update").await)
    }

    async fn cash_out(
        &self,
        id: Uuid,
        processed_by: Uuid,
        audit: CreateAuditEntry,
    ) -> KittyResult<StockPurchase> {
        // Compare-and-set on the flag: a second caller matches no row and
        // writes no audit entry.
        let query = format!(
            "BEGIN TRANSACTION;
             LET $processed = (UPDATE type::record('stock_purchase', $id) SET \
                     is_cash_out_processed = true, cashed_out_by = $processed_by, \
                     cashed_out_at = time::now() \
                 WHERE is_cash_out_processed = false RETURN AFTER);
             IF array::len($processed) > 0 {{
                 {CREATE_AUDIT}
             }};
             COMMIT TRANSACTION;"
        );

        let outcome = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("processed_by", processed_by.to_string()))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .check();

        let current = self.get_by_id(id).await?;
        if let Err(e) = outcome {
            // Write conflict with a concurrent cash-out that committed first.
            if current.is_cash_out_processed {
                return Err(KittyError::AlreadyCashedOut);
            }
            return Err(DbError::Query(e.to_string()).into());
        }

        if audit_committed(&self.db, audit.id).await? {
            debug!(stock_purchase_id = %id, "stock purchase cashed out");
            return Ok(current);
        }
        if current.is_cash_out_processed {
            return Err(KittyError::AlreadyCashedOut);
        }
        Err(KittyError::Internal(format!("cash-out of stock purchase {id} was not applied")))
    }

    async fn delete(&self, id: Uuid, audit: CreateAuditEntry) -> KittyResult<()> {
        let query = format!(
            "BEGIN TRANSACTION;
             LET $open = array::len((SELECT id FROM type::record('stock_purchase', $id) \
                 WHERE is_cash_out_processed = false)) > 0;
             IF $open {{
                 {CREATE_AUDIT}
                 DELETE type::record('stock_purchase', $id);
             }};
             COMMIT TRANSACTION;"
        );

        self.db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        if audit_committed(&self.db, audit.id).await? {
            debug!(stock_purchase_id = %id, "stock purchase deleted");
            return Ok(());
        }
        Err(self.refusal(id, "deletion").await)
    }
}
