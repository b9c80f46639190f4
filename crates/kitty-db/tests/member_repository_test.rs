//! Integration tests for the member repository using in-memory SurrealDB.

use kitty_core::error::KittyError;
use kitty_core::models::audit::{AuditAction, AuditFilter, CreateAuditEntry, EntityType};
use kitty_core::models::consumption::CreateConsumption;
use kitty_core::models::member::{CreateMember, RelatedRecordCategory, Role, UpdateMember};
use kitty_core::models::product::CreateProduct;
use kitty_core::repository::{
    AuditLogRepository, ConsumptionRepository, MemberRepository, Pagination, ProductRepository,
};
use kitty_db::repository::{
    SurrealAuditLogRepository, SurrealConsumptionRepository, SurrealMemberRepository,
    SurrealProductRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    kitty_db::migrate(&db).await.unwrap();
    db
}

fn audit(actor: Uuid, action: AuditAction, entity: Uuid) -> CreateAuditEntry {
    CreateAuditEntry::new(actor, action, EntityType::Member, entity, serde_json::json!({}))
}

async fn create(
    repo: &SurrealMemberRepository<Db>,
    actor: Uuid,
    name: &str,
    role: Role,
) -> kitty_core::models::member::Member {
    let id = Uuid::new_v4();
    repo.create(
        id,
        CreateMember {
            display_name: name.into(),
            role,
            pin: "1234".into(),
        },
        audit(actor, AuditAction::Create, id),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn create_and_get_member() {
    let db = setup().await;
    let repo = SurrealMemberRepository::new(db.clone());
    let system = Uuid::new_v4();

    let alice = create(&repo, system, "alice", Role::Member).await;
    assert_eq!(alice.display_name, "alice");
    assert_eq!(alice.role, Role::Member);
    assert!(alice.is_active);
    assert!(alice.removed_at.is_none());
    assert_ne!(alice.pin_hash, "1234");
    assert!(alice.pin_hash.starts_with("$argon2id$"));

    let fetched = repo.get_by_id(alice.id).await.unwrap();
    assert_eq!(fetched.id, alice.id);
    let by_name = repo.get_by_display_name("alice").await.unwrap();
    assert_eq!(by_name.id, alice.id);

    let audit_repo = SurrealAuditLogRepository::new(db);
    let entries = audit_repo
        .list(
            AuditFilter {
                entity_id: Some(alice.id),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(entries.total, 1, "creation writes exactly one audit entry");
    assert_eq!(entries.items[0].action, AuditAction::Create);
}

#[tokio::test]
async fn duplicate_display_name_is_rejected() {
    let db = setup().await;
    let repo = SurrealMemberRepository::new(db);
    let system = Uuid::new_v4();

    create(&repo, system, "bob", Role::Member).await;
    let id = Uuid::new_v4();
    let err = repo
        .create(
            id,
            CreateMember {
                display_name: "bob".into(),
                role: Role::Treasurer,
                pin: "9999".into(),
            },
            audit(system, AuditAction::Create, id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::AlreadyExists { .. }), "got {err:?}");
}

#[tokio::test]
async fn get_missing_member_is_not_found() {
    let db = setup().await;
    let repo = SurrealMemberRepository::new(db);
    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, KittyError::NotFound { .. }));
}

#[tokio::test]
async fn list_filters_inactive_members() {
    let db = setup().await;
    let repo = SurrealMemberRepository::new(db);
    let system = Uuid::new_v4();

    let a = create(&repo, system, "a", Role::Member).await;
    create(&repo, system, "b", Role::Member).await;
    repo.update(
        a.id,
        UpdateMember {
            is_active: Some(false),
            ..Default::default()
        },
        false,
        audit(system, AuditAction::Update, a.id),
    )
    .await
    .unwrap();

    let all = repo.list(false, Pagination::default()).await.unwrap();
    assert_eq!(all.total, 2);
    let active = repo.list(true, Pagination::default()).await.unwrap();
    assert_eq!(active.total, 1);
    assert_eq!(active.items[0].display_name, "b");
    assert_eq!(repo.list_active().await.unwrap().len(), 1);
}

#[tokio::test]
async fn guarded_update_protects_last_administrator() {
    let db = setup().await;
    let repo = SurrealMemberRepository::new(db);
    let system = Uuid::new_v4();

    let admin = create(&repo, system, "admin", Role::Administrator).await;
    let demote = UpdateMember {
        role: Some(Role::Member),
        ..Default::default()
    };
    let err = repo
        .update(admin.id, demote.clone(), true, audit(system, AuditAction::Update, admin.id))
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::LastAdministratorProtection), "got {err:?}");
    assert_eq!(repo.get_by_id(admin.id).await.unwrap().role, Role::Administrator);

    create(&repo, system, "admin2", Role::Administrator).await;
    let demoted = repo
        .update(admin.id, demote, true, audit(system, AuditAction::Update, admin.id))
        .await
        .unwrap();
    assert_eq!(demoted.role, Role::Member);
    assert_eq!(repo.count_active_administrators().await.unwrap(), 1);
}

#[tokio::test]
async fn set_pin_replaces_hash() {
    let db = setup().await;
    let repo = SurrealMemberRepository::new(db);
    let system = Uuid::new_v4();

    let m = create(&repo, system, "m", Role::Member).await;
    repo.set_pin(m.id, "5678", audit(system, AuditAction::SetPin, m.id))
        .await
        .unwrap();
    let after = repo.get_by_id(m.id).await.unwrap();
    assert_ne!(after.pin_hash, m.pin_hash);

    let err = repo
        .set_pin(Uuid::new_v4(), "5678", audit(system, AuditAction::SetPin, m.id))
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::NotFound { .. }));
}

#[tokio::test]
async fn remove_refuses_members_with_history() {
    let db = setup().await;
    let members = SurrealMemberRepository::new(db.clone());
    let products = SurrealProductRepository::new(db.clone());
    let consumptions = SurrealConsumptionRepository::new(db.clone());
    let system = Uuid::new_v4();

    let m = create(&members, system, "drinker", Role::Member).await;
    let product_id = Uuid::new_v4();
    products
        .create(
            product_id,
            CreateProduct {
                name: "Cola".into(),
                price: 150,
            },
            CreateAuditEntry::new(
                system,
                AuditAction::Create,
                EntityType::Product,
                product_id,
                serde_json::json!({}),
            ),
        )
        .await
        .unwrap();
    let consumption_id = Uuid::new_v4();
    consumptions
        .create(
            consumption_id,
            CreateConsumption {
                member_id: m.id,
                product_id,
                quantity: 2,
                unit_price: 150,
                amount: 300,
                created_by: m.id,
            },
            CreateAuditEntry::new(
                m.id,
                AuditAction::Create,
                EntityType::Consumption,
                consumption_id,
                serde_json::json!({}),
            ),
        )
        .await
        .unwrap();

    let related = members.related_records(m.id).await.unwrap();
    assert_eq!(related.consumptions, 1);
    assert_eq!(related.money_moves, 0);
    assert_eq!(related.audit_entries, 1, "the booking was performed by the member");

    let err = members
        .remove(m.id, audit(system, AuditAction::Delete, m.id))
        .await
        .unwrap_err();
    match err {
        KittyError::RelatedRecordsConflict { categories } => {
            assert!(categories.contains(&RelatedRecordCategory::Consumptions));
        }
        other => panic!("expected RelatedRecordsConflict, got {other:?}"),
    }
    assert!(members.get_by_id(m.id).await.is_ok(), "member must survive");

    let deactivated = members
        .deactivate(m.id, audit(system, AuditAction::Deactivate, m.id))
        .await
        .unwrap();
    assert!(!deactivated.is_active);
    assert!(deactivated.removed_at.is_some());
}

#[tokio::test]
async fn remove_deletes_member_without_history() {
    let db = setup().await;
    let repo = SurrealMemberRepository::new(db.clone());
    let system = Uuid::new_v4();

    let m = create(&repo, system, "fresh", Role::Member).await;
    let entry = audit(system, AuditAction::Delete, m.id);
    let entry_id = entry.id;
    repo.remove(m.id, entry).await.unwrap();

    let err = repo.get_by_id(m.id).await.unwrap_err();
    assert!(matches!(err, KittyError::NotFound { .. }));
    let audit_repo = SurrealAuditLogRepository::new(db);
    let written = audit_repo.get_by_id(entry_id).await.unwrap();
    assert_eq!(written.action, AuditAction::Delete);
}

#[tokio::test]
async fn remove_and_deactivate_protect_last_administrator() {
    let db = setup().await;
    let repo = SurrealMemberRepository::new(db);
    let system = Uuid::new_v4();

    let admin = create(&repo, system, "only-admin", Role::Administrator).await;
    let err = repo
        .remove(admin.id, audit(system, AuditAction::Delete, admin.id))
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::LastAdministratorProtection), "got {err:?}");

    let err = repo
        .deactivate(admin.id, audit(system, AuditAction::Deactivate, admin.id))
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::LastAdministratorProtection), "got {err:?}");
    assert!(repo.get_by_id(admin.id).await.unwrap().is_active);
}
