//! SurrealDB implementation of [`ProductRepository`].

use chrono::{DateTime, Utc};
use kitty_core::error::KittyResult;
use kitty_core::models::audit::CreateAuditEntry;
use kitty_core::models::product::{CreateProduct, Product, UpdateProduct};
use kitty_core::repository::{PaginatedResult, Pagination, ProductRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CREATE_AUDIT, CountRow, audit_content, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ProductRow {
    record_id: String,
    name: String,
    price: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn try_into_product(self) -> Result<Product, DbError> {
        Ok(Product {
            id: parse_uuid(&self.record_id, "product")?,
            name: self.name,
            price: self.price,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the product repository.
#[derive(Clone)]
pub struct SurrealProductRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProductRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProductRepository for SurrealProductRepository<C> {
    async fn create(
        &self,
        id: Uuid,
        input: CreateProduct,
        audit: CreateAuditEntry,
    ) -> KittyResult<Product> {
        let query = format!(
            "BEGIN TRANSACTION;
             CREATE type::record('product', $id) SET \
                 name = $name, price = $price, is_active = true;
             {CREATE_AUDIT}
             COMMIT TRANSACTION;"
        );

        self.db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("name", input.name))
            .bind(("price", input.price))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check(e, "product"))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> KittyResult<Product> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('product', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "product".into(),
            id: id_str,
        })?;

        Ok(row.try_into_product()?)
    }

    async fn get_by_name(&self, name: &str) -> KittyResult<Product> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM product WHERE name = $name")
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "product".into(),
            id: format!("name={name}"),
        })?;

        Ok(row.try_into_product()?)
    }

    async fn list(
        &self,
        active_only: bool,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<Product>> {
        let filter = if active_only {
            "WHERE is_active = true"
        } else {
            ""
        };
        let query = format!(
            "SELECT count() AS total FROM product {filter} GROUP ALL;
             SELECT meta::id(id) AS record_id, * FROM product {filter} \
             ORDER BY name ASC LIMIT $limit START $offset;"
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<ProductRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(ProductRow::try_into_product)
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
        input: UpdateProduct,
        audit: CreateAuditEntry,
    ) -> KittyResult<Product> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.price.is_some() {
            sets.push("price = $price");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "BEGIN TRANSACTION;
             LET $exists = array::len((SELECT id FROM type::record('product', $id))) > 0;
             IF $exists {{
                 UPDATE type::record('product', $id) SET {};
                 {CREATE_AUDIT}
             }};
             COMMIT TRANSACTION;",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(price) = input.price {
            builder = builder.bind(("price", price));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check(e, "product"))?;

        self.get_by_id(id).await
    }
}
