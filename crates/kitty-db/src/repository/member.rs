//! SurrealDB implementation of [`MemberRepository`].
//!
//! PIN hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). Salt is randomly
//! generated per hash. An optional pepper (server-side secret) can be
//! provided at construction time.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Utc};
use kitty_core::error::{KittyError, KittyResult};
use kitty_core::models::audit::CreateAuditEntry;
use kitty_core::models::member::{CreateMember, Member, RelatedRecords, Role, UpdateMember};
use kitty_core::repository::{MemberRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CREATE_AUDIT, CountRow, audit_committed, audit_content, parse_uuid};
use crate::error::DbError;

/// Other active administrators, excluding the member at `$id`.
const OTHER_ADMINS: &str = "LET $others = array::len((SELECT id FROM member \
     WHERE role = 'Administrator' AND is_active = true \
     AND id != type::record('member', $id)));";

#[derive(Debug, SurrealValue)]
struct MemberRow {
    record_id: String,
    display_name: String,
    role: String,
    is_active: bool,
    pin_hash: String,
    removed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MemberRow {
    fn try_into_member(self) -> Result<Member, DbError> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| DbError::Decode(format!("unknown role: {}", self.role)))?;
        Ok(Member {
            id: parse_uuid(&self.record_id, "member")?,
            display_name: self.display_name,
            role,
            is_active: self.is_active,
            pin_hash: self.pin_hash,
            removed_at: self.removed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Hash a PIN with Argon2id using OWASP-recommended parameters.
///
/// If a pepper is provided, it is prepended to the PIN before hashing.
fn hash_pin(pin: &str, pepper: Option<&str>) -> Result<String, DbError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::Hash(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{pin}");
            peppered.as_bytes()
        }
        None => pin.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::Hash(format!("pin hash error: {e}")))?;

    Ok(hash.to_string())
}

/// SurrealDB implementation of the member repository.
#[derive(Clone)]
pub struct SurrealMemberRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for PIN hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealMemberRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Member>, DbError> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('member', $id)")
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<MemberRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(MemberRow::try_into_member)
            .transpose()
    }

    async fn require(&self, id: Uuid) -> KittyResult<Member> {
        self.fetch(id)
            .await?
            .ok_or_else(|| KittyError::not_found("member", id))
    }
}

impl<C: Connection> MemberRepository for SurrealMemberRepository<C> {
    async fn create(
        &self,
        id: Uuid,
        input: CreateMember,
        audit: CreateAuditEntry,
    ) -> KittyResult<Member> {
        match self.get_by_display_name(&input.display_name).await {
            Ok(_) => {
                return Err(DbError::Duplicate {
                    entity: "member".into(),
                }
                .into());
            }
            Err(KittyError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        let pin_hash = hash_pin(&input.pin, self.pepper.as_deref())?;

        // The unique index still catches a concurrent insert of the same name.
        let query = format!(
            "BEGIN TRANSACTION;
             CREATE type::record('member', $id) SET \
                 display_name = $display_name, role = $role, \
                 is_active = true, pin_hash = $pin_hash, removed_at = NONE;
             {CREATE_AUDIT}
             COMMIT TRANSACTION;"
        );

        self.db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("display_name", input.display_name))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("pin_hash", pin_hash))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check(e, "member"))?;

        debug!(member_id = %id, "member created");
        self.require(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> KittyResult<Member> {
        self.require(id).await
    }

    async fn get_by_display_name(&self, display_name: &str) -> KittyResult<Member> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM member \
                 WHERE display_name = $display_name",
            )
            .bind(("display_name", display_name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "member".into(),
            id: format!("display_name={display_name}"),
        })?;

        Ok(row.try_into_member()?)
    }

    async fn list(
        &self,
        active_only: bool,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<Member>> {
        let filter = if active_only {
            "WHERE is_active = true"
        } else {
            ""
        };

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM member {filter} GROUP ALL"
            ))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM member {filter} \
                 ORDER BY display_name ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(MemberRow::try_into_member)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_active(&self) -> KittyResult<Vec<Member>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM member \
                 WHERE is_active = true ORDER BY display_name ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(MemberRow::try_into_member)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn update(
        &self,
        id: Uuid,
        input: UpdateMember,
        guard_last_admin: bool,
        audit: CreateAuditEntry,
    ) -> KittyResult<Member> {
        let mut sets = Vec::new();
        if input.display_name.is_some() {
            sets.push("display_name = $display_name");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "BEGIN TRANSACTION;
             LET $exists = array::len((SELECT id FROM type::record('member', $id))) > 0;
             {OTHER_ADMINS}
             IF $exists AND ($guard = false OR $others > 0) {{
                 UPDATE type::record('member', $id) SET {};
                 {CREATE_AUDIT}
             }};
             COMMIT TRANSACTION;",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("guard", guard_last_admin))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)));

        if let Some(display_name) = input.display_name {
            builder = builder.bind(("display_name", display_name));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check(e, "member"))?;

        if audit_committed(&self.db, audit.id).await? {
            return self.require(id).await;
        }

        // Not applied: either the member vanished or the guard refused.
        self.require(id).await?;
        if guard_last_admin {
            Err(KittyError::LastAdministratorProtection)
        } else {
            Err(KittyError::Internal(format!("update of member {id} was not applied")))
        }
    }

    async fn set_pin(&self, id: Uuid, pin: &str, audit: CreateAuditEntry) -> KittyResult<()> {
        let pin_hash = hash_pin(pin, self.pepper.as_deref())?;

        let query = format!(
            "BEGIN TRANSACTION;
             LET $exists = array::len((SELECT id FROM type::record('member', $id))) > 0;
             IF $exists {{
                 UPDATE type::record('member', $id) SET \
                     pin_hash = $pin_hash, updated_at = time::now();
                 {CREATE_AUDIT}
             }};
             COMMIT TRANSACTION;"
        );

        self.db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("pin_hash", pin_hash))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        if audit_committed(&self.db, audit.id).await? {
            Ok(())
        } else {
            Err(KittyError::not_found("member", id))
        }
    }

    async fn count_active_administrators(&self) -> KittyResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM member \
                 WHERE role = 'Administrator' AND is_active = true GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn related_records(&self, id: Uuid) -> KittyResult<RelatedRecords> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM consumption \
                     WHERE member_id = $id OR created_by = $id GROUP ALL;
                 SELECT count() AS total FROM money_move \
                     WHERE member_id = $id OR created_by = $id \
                     OR decided_by = $id GROUP ALL;
                 SELECT count() AS total FROM audit_log \
                     WHERE actor_id = $id GROUP ALL;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let consumptions: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let money_moves: Vec<CountRow> = result.take(1).map_err(DbError::from)?;
        let audit_entries: Vec<CountRow> = result.take(2).map_err(DbError::from)?;

        Ok(RelatedRecords {
            consumptions: consumptions.first().map(|r| r.total).unwrap_or(0),
            money_moves: money_moves.first().map(|r| r.total).unwrap_or(0),
            audit_entries: audit_entries.first().map(|r| r.total).unwrap_or(0),
        })
    }

    async fn remove(&self, id: Uuid, audit: CreateAuditEntry) -> KittyResult<()> {
        let query = format!(
            "BEGIN TRANSACTION;
             LET $refs = array::len((SELECT id FROM consumption \
                     WHERE member_id = $id OR created_by = $id)) \
                 + array::len((SELECT id FROM money_move \
                     WHERE member_id = $id OR created_by = $id OR decided_by = $id)) \
                 + array::len((SELECT id FROM audit_log WHERE actor_id = $id));
             LET $target = array::first((SELECT role, is_active \
                 FROM type::record('member', $id)));
             {OTHER_ADMINS}
             IF $target != NONE AND $refs = 0 AND ($target.role != 'Administrator' \
                 OR $target.is_active = false OR $others > 0) {{
                 DELETE type::record('member', $id);
                 {CREATE_AUDIT}
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
            debug!(member_id = %id, "member deleted");
            return Ok(());
        }

        let member = self.require(id).await?;
        if member.is_active_administrator() && self.count_active_administrators().await? <= 1 {
            return Err(KittyError::LastAdministratorProtection);
        }
        let related = self.related_records(id).await?;
        if !related.is_empty() {
            return Err(KittyError::RelatedRecordsConflict {
                categories: related.categories(),
            });
        }
        Err(KittyError::Internal(format!("removal of member {id} was not applied")))
    }

    async fn deactivate(&self, id: Uuid, audit: CreateAuditEntry) -> KittyResult<Member> {
        let query = format!(
            "BEGIN TRANSACTION;
             LET $target = array::first((SELECT role, is_active \
                 FROM type::record('member', $id)));
             {OTHER_ADMINS}
             IF $target != NONE AND $target.is_active = true \
                 AND ($target.role != 'Administrator' OR $others > 0) {{
                 UPDATE type::record('member', $id) SET \
                     is_active = false, removed_at = time::now(), \
                     updated_at = time::now();
                 {CREATE_AUDIT}
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

        let member = self.require(id).await?;
        if audit_committed(&self.db, audit.id).await? {
            debug!(member_id = %id, "member deactivated");
            return Ok(member);
        }
        // Already inactive, possibly by a concurrent caller.
        if !member.is_active {
            return Ok(member);
        }
        Err(KittyError::LastAdministratorProtection)
    }
}
