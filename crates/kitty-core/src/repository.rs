//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Every mutating operation takes
//! the [`CreateAuditEntry`] that documents it and must persist both in
//! one transaction: either the mutation and its audit entry are both
//! committed, or neither is.
//!
//! Ids of new records are allocated by the caller so that the audit
//! entry can reference the record before it exists.

use uuid::Uuid;

use crate::error::KittyResult;
use crate::models::{
    audit::{AuditEntry, AuditFilter, CreateAuditEntry},
    consumption::{Consumption, ConsumptionFilter, CreateConsumption},
    member::{CreateMember, Member, RelatedRecords, UpdateMember},
    money_move::{CreateMoneyMove, Decision, MoneyMove, MoneyMoveFilter},
    product::{CreateProduct, Product, UpdateProduct},
    stock::{StockPurchase, StockPurchaseFields, StockPurchaseFilter},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

pub trait MemberRepository: Send + Sync {
    /// Create a member. The raw PIN in `input` is hashed before storage.
    fn create(
        &self,
        id: Uuid,
        input: CreateMember,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<Member>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = KittyResult<Member>> + Send;
    fn get_by_display_name(
        &self,
        display_name: &str,
    ) -> impl Future<Output = KittyResult<Member>> + Send;
    fn list(
        &self,
        active_only: bool,
        pagination: Pagination,
    ) -> impl Future<Output = KittyResult<PaginatedResult<Member>>> + Send;
    /// Every active member, unpaginated. Used for fund-wide reporting.
    fn list_active(&self) -> impl Future<Output = KittyResult<Vec<Member>>> + Send;
    /// Apply an update.
    ///
    /// With `guard_last_admin` set, the write is refused with
    /// `LastAdministratorProtection` unless another active administrator
    /// exists at commit time.
    fn update(
        &self,
        id: Uuid,
        input: UpdateMember,
        guard_last_admin: bool,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<Member>> + Send;
    /// Replace the member's PIN. The raw PIN is hashed before storage.
    fn set_pin(
        &self,
        id: Uuid,
        pin: &str,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<()>> + Send;
    fn count_active_administrators(&self) -> impl Future<Output = KittyResult<u64>> + Send;
    /// Read-only pre-flight: historical records referencing the member.
    fn related_records(&self, id: Uuid) -> impl Future<Output = KittyResult<RelatedRecords>> + Send;
    /// Hard-delete a member that has no related records and is not the
    /// last active administrator. Both conditions are re-checked inside
    /// the transaction.
    fn remove(
        &self,
        id: Uuid,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<()>> + Send;
    /// Permanently deactivate a member, keeping the row for the
    /// historical records that reference it.
    fn deactivate(
        &self,
        id: Uuid,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<Member>> + Send;
}

// ---------------------------------------------------------------------------
// Money moves
// ---------------------------------------------------------------------------

pub trait MoneyMoveRepository: Send + Sync {
    fn create(
        &self,
        id: Uuid,
        input: CreateMoneyMove,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<MoneyMove>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = KittyResult<MoneyMove>> + Send;
    /// Newest first.
    fn list(
        &self,
        filter: MoneyMoveFilter,
        pagination: Pagination,
    ) -> impl Future<Output = KittyResult<PaginatedResult<MoneyMove>>> + Send;
    /// Every confirmed move, optionally restricted to one member.
    fn list_confirmed(
        &self,
        member_id: Option<Uuid>,
    ) -> impl Future<Output = KittyResult<Vec<MoneyMove>>> + Send;
    /// Atomically move a pending money move to the decision's target
    /// status, stamping the decider. Only one caller can ever win; every
    /// other caller gets `AlreadyFinalized`.
    fn decide(
        &self,
        id: Uuid,
        decision: Decision,
        decided_by: Uuid,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<MoneyMove>> + Send;
}

// ---------------------------------------------------------------------------
// Consumptions
// ---------------------------------------------------------------------------

pub trait ConsumptionRepository: Send + Sync {
    fn create(
        &self,
        id: Uuid,
        input: CreateConsumption,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<Consumption>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = KittyResult<Consumption>> + Send;
    /// Newest first.
    fn list(
        &self,
        filter: ConsumptionFilter,
        pagination: Pagination,
    ) -> impl Future<Output = KittyResult<PaginatedResult<Consumption>>> + Send;
    /// Every consumption, optionally restricted to the consuming member.
    fn list_all(
        &self,
        member_id: Option<Uuid>,
    ) -> impl Future<Output = KittyResult<Vec<Consumption>>> + Send;
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub trait ProductRepository: Send + Sync {
    fn create(
        &self,
        id: Uuid,
        input: CreateProduct,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<Product>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = KittyResult<Product>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = KittyResult<Product>> + Send;
    fn list(
        &self,
        active_only: bool,
        pagination: Pagination,
    ) -> impl Future<Output = KittyResult<PaginatedResult<Product>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateProduct,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<Product>> + Send;
}

// ---------------------------------------------------------------------------
// Stock purchases
// ---------------------------------------------------------------------------

pub trait StockPurchaseRepository: Send + Sync {
    fn create(
        &self,
        id: Uuid,
        fields: StockPurchaseFields,
        created_by: Uuid,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<StockPurchase>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = KittyResult<StockPurchase>> + Send;
    /// Newest first.
    fn list(
        &self,
        filter: StockPurchaseFilter,
        pagination: Pagination,
    ) -> impl Future<Output = KittyResult<PaginatedResult<StockPurchase>>> + Send;
    /// Overwrite the columns of a purchase that is not cashed out.
    /// `AlreadyCashedOut` otherwise.
    fn update(
        &self,
        id: Uuid,
        fields: StockPurchaseFields,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<StockPurchase>> + Send;
    /// Flip `is_cash_out_processed` from false to true. Exactly one caller
    /// wins; every other gets `AlreadyCashedOut`.
    fn cash_out(
        &self,
        id: Uuid,
        processed_by: Uuid,
        audit: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<StockPurchase>> + Send;
    /// Delete a purchase that is not cashed out.
    fn delete(&self, id: Uuid, audit: CreateAuditEntry)
    -> impl Future<Output = KittyResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Audit log (append-only)
// ---------------------------------------------------------------------------

pub trait AuditLogRepository: Send + Sync {
    /// Append a standalone entry.
    fn append(
        &self,
        entry: CreateAuditEntry,
    ) -> impl Future<Output = KittyResult<AuditEntry>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = KittyResult<AuditEntry>> + Send;
    /// Newest first.
    fn list(
        &self,
        filter: AuditFilter,
        pagination: Pagination,
    ) -> impl Future<Output = KittyResult<PaginatedResult<AuditEntry>>> + Send;
}
