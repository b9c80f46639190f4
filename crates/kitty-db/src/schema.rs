//! Ledger schema and its upgrade path.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings, enums as
//! strings with ASSERT constraints. Amounts are integers in minor
//! currency units, capped at `kitty_core::models::MAX_AMOUNT`.
//!
//! Each upgrade step runs in one transaction together with its
//! `_schema_step` record, so a half-applied step never becomes visible.

use std::collections::BTreeSet;

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

const STEP_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _schema_step SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _schema_step TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _schema_step TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _schema_step TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_schema_step_version ON TABLE _schema_step \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct StepRow {
    version: u32,
}

/// One forward-only schema change.
struct SchemaStep {
    version: u32,
    name: &'static str,
    ddl: &'static str,
}

static STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "ledger",
        ddl: LEDGER,
    },
    SchemaStep {
        version: 2,
        name: "stock_purchases",
        ddl: STOCK_PURCHASES,
    },
];

/// Schema version this build expects.
pub const SCHEMA_VERSION: u32 = 2;

// -----------------------------------------------------------------------
// v1: members, catalogue, money moves, audit log
// -----------------------------------------------------------------------

const LEDGER: &str = "\
-- =======================================================================
-- Members
-- =======================================================================
DEFINE TABLE member SCHEMAFULL;
DEFINE FIELD display_name ON TABLE member TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD role ON TABLE member TYPE string \
    ASSERT $value IN ['Member', 'Treasurer', 'Administrator'];
DEFINE FIELD is_active ON TABLE member TYPE bool DEFAULT true;
DEFINE FIELD pin_hash ON TABLE member TYPE string;
DEFINE FIELD removed_at ON TABLE member TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE member TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_member_display_name ON TABLE member \
    COLUMNS display_name UNIQUE;
DEFINE INDEX idx_member_role_active ON TABLE member \
    COLUMNS role, is_active;

-- =======================================================================
-- Products
-- =======================================================================
DEFINE TABLE product SCHEMAFULL;
DEFINE FIELD name ON TABLE product TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD price ON TABLE product TYPE int \
    ASSERT $value >= 0 AND $value <= 1000000000;
DEFINE FIELD is_active ON TABLE product TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE product TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE product TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_product_name ON TABLE product COLUMNS name UNIQUE;

-- =======================================================================
-- Consumptions
-- =======================================================================
DEFINE TABLE consumption SCHEMAFULL;
DEFINE FIELD member_id ON TABLE consumption TYPE string;
DEFINE FIELD product_id ON TABLE consumption TYPE string;
DEFINE FIELD quantity ON TABLE consumption TYPE int ASSERT $value > 0;
DEFINE FIELD unit_price ON TABLE consumption TYPE int \
    ASSERT $value >= 0 AND $value <= 1000000000;
DEFINE FIELD amount ON TABLE consumption TYPE int \
    ASSERT $value >= 0 AND $value <= 1000000000;
DEFINE FIELD created_by ON TABLE consumption TYPE string;
DEFINE FIELD created_at ON TABLE consumption TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_consumption_member ON TABLE consumption \
    COLUMNS member_id, created_at;
DEFINE INDEX idx_consumption_created_by ON TABLE consumption \
    COLUMNS created_by;

-- =======================================================================
-- Money moves
-- =======================================================================
DEFINE TABLE money_move SCHEMAFULL;
DEFINE FIELD kind ON TABLE money_move TYPE string \
    ASSERT $value IN ['Deposit', 'Payout'];
DEFINE FIELD member_id ON TABLE money_move TYPE string;
DEFINE FIELD amount ON TABLE money_move TYPE int \
    ASSERT $value > 0 AND $value <= 1000000000;
DEFINE FIELD note ON TABLE money_move TYPE option<string>;
DEFINE FIELD created_by ON TABLE money_move TYPE string;
DEFINE FIELD status ON TABLE money_move TYPE string \
    ASSERT $value IN ['Pending', 'Confirmed', 'Rejected'];
DEFINE FIELD decided_by ON TABLE money_move TYPE option<string>;
DEFINE FIELD decided_at ON TABLE money_move TYPE option<datetime>;
DEFINE FIELD decision_audit_id ON TABLE money_move TYPE option<string>;
DEFINE FIELD created_at ON TABLE money_move TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_money_move_member_status ON TABLE money_move \
    COLUMNS member_id, status;
DEFINE INDEX idx_money_move_status ON TABLE money_move COLUMNS status;

-- =======================================================================
-- Audit log (append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD actor_id ON TABLE audit_log TYPE string;
DEFINE FIELD action ON TABLE audit_log TYPE string \
    ASSERT $value IN ['create', 'update', 'delete', 'deactivate', \
    'confirm', 'reject', 'set_pin', 'change_pin'];
DEFINE FIELD entity_type ON TABLE audit_log TYPE string \
    ASSERT $value IN ['member', 'money_move', 'consumption', 'product'];
DEFINE FIELD entity_id ON TABLE audit_log TYPE string;
DEFINE FIELD metadata ON TABLE audit_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_time ON TABLE audit_log COLUMNS timestamp;
DEFINE INDEX idx_audit_actor ON TABLE audit_log COLUMNS actor_id;
DEFINE INDEX idx_audit_entity ON TABLE audit_log \
    COLUMNS entity_type, entity_id;
";

// -----------------------------------------------------------------------
// v2: stock purchases
// -----------------------------------------------------------------------

const STOCK_PURCHASES: &str = "\
DEFINE TABLE stock_purchase SCHEMAFULL;
DEFINE FIELD item_name ON TABLE stock_purchase TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD supplier ON TABLE stock_purchase TYPE option<string>;
DEFINE FIELD quantity ON TABLE stock_purchase TYPE int ASSERT $value > 0;
DEFINE FIELD unit_price ON TABLE stock_purchase TYPE int \
    ASSERT $value >= 0 AND $value <= 1000000000;
DEFINE FIELD total_amount ON TABLE stock_purchase TYPE int \
    ASSERT $value >= 0 AND $value <= 1000000000;
DEFINE FIELD purchase_date ON TABLE stock_purchase TYPE datetime;
DEFINE FIELD receipt_number ON TABLE stock_purchase TYPE option<string>;
DEFINE FIELD notes ON TABLE stock_purchase TYPE option<string>;
DEFINE FIELD is_cash_out_processed ON TABLE stock_purchase TYPE bool \
    DEFAULT false;
DEFINE FIELD cashed_out_by ON TABLE stock_purchase TYPE option<string>;
DEFINE FIELD cashed_out_at ON TABLE stock_purchase TYPE option<datetime>;
DEFINE FIELD created_by ON TABLE stock_purchase TYPE string;
DEFINE FIELD created_at ON TABLE stock_purchase TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_stock_purchase_processed ON TABLE stock_purchase \
    COLUMNS is_cash_out_processed, created_at;

DEFINE FIELD OVERWRITE action ON TABLE audit_log TYPE string \
    ASSERT $value IN ['create', 'update', 'delete', 'deactivate', \
    'confirm', 'reject', 'set_pin', 'change_pin', 'cash_out'];
DEFINE FIELD OVERWRITE entity_type ON TABLE audit_log TYPE string \
    ASSERT $value IN ['member', 'money_move', 'consumption', 'product', \
    'stock_purchase'];
";

// -----------------------------------------------------------------------
// Upgrade
// -----------------------------------------------------------------------

async fn applied_steps<C: Connection>(db: &Surreal<C>) -> Result<BTreeSet<u32>, DbError> {
    let mut result = db.query("SELECT version FROM _schema_step").await?;
    let rows: Vec<StepRow> = result.take(0)?;
    Ok(rows.into_iter().map(|r| r.version).collect())
}

/// Bring the ledger schema up to [`SCHEMA_VERSION`] and return it.
///
/// Steps already recorded in `_schema_step` are skipped, so this runs on
/// every start. A database written by a newer build is refused rather
/// than touched.
pub async fn migrate<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    db.query(STEP_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let applied = applied_steps(db).await?;
    if let Some(&newest) = applied.last() {
        if newest > SCHEMA_VERSION {
            return Err(DbError::Migration(format!(
                "database is at schema v{newest}, this build knows up to v{SCHEMA_VERSION}"
            )));
        }
    }

    for step in STEPS.iter().filter(|s| !applied.contains(&s.version)) {
        info!(version = step.version, name = step.name, "applying schema step");
        let query = format!(
            "BEGIN TRANSACTION;
             {ddl}
             CREATE _schema_step SET version = $version, name = $name;
             COMMIT TRANSACTION;",
            ddl = step.ddl,
        );
        db.query(&query)
            .bind(("version", step.version))
            .bind(("name", step.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!("schema step v{} '{}': {e}", step.version, step.name))
            })?;
    }

    debug!(version = SCHEMA_VERSION, "schema up to date");
    Ok(SCHEMA_VERSION)
}
