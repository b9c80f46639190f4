//! Shared harness: every fund service wired over one in-memory SurrealDB.

#![allow(dead_code)]

use kitty_auth::{ActorCredentials, ActorVerifier, AuthConfig};
use kitty_core::models::audit::{AuditAction, AuditEntry, AuditFilter};
use kitty_core::models::member::{CreateMember, Role};
use kitty_core::repository::Pagination;
use kitty_db::repository::{
    SurrealAuditLogRepository, SurrealConsumptionRepository, SurrealMemberRepository,
    SurrealMoneyMoveRepository, SurrealProductRepository, SurrealStockPurchaseRepository,
};
use kitty_fund::{
    AuditLogger, BalanceCalculator, ConsumptionService, FundConfig, MemberLifecycleGuard,
    MemberService, MoneyMoveService, ProductService, RosterLock, StockPurchaseService,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

pub type Members = SurrealMemberRepository<Db>;
pub type Moves = SurrealMoneyMoveRepository<Db>;
pub type Products = SurrealProductRepository<Db>;
pub type Consumptions = SurrealConsumptionRepository<Db>;
pub type Purchases = SurrealStockPurchaseRepository<Db>;

pub const ADMIN_PIN: &str = "0000";

pub struct Fund {
    pub members: MemberService<Members>,
    pub lifecycle: MemberLifecycleGuard<Members>,
    pub moves: MoneyMoveService<Members, Moves>,
    pub balances: BalanceCalculator<Members, Moves, Consumptions>,
    pub products: ProductService<Members, Products>,
    pub consumptions: ConsumptionService<Members, Products, Consumptions>,
    pub stock: StockPurchaseService<Members, Purchases>,
    pub audit: AuditLogger<SurrealAuditLogRepository<Db>>,
    pub admin: ActorCredentials,
    pub db: Surreal<Db>,
}

pub async fn setup() -> Fund {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    kitty_db::migrate(&db).await.unwrap();

    let member_repo = SurrealMemberRepository::new(db.clone());
    let move_repo = SurrealMoneyMoveRepository::new(db.clone());
    let product_repo = SurrealProductRepository::new(db.clone());
    let consumption_repo = SurrealConsumptionRepository::new(db.clone());
    let verifier = ActorVerifier::new(member_repo.clone(), AuthConfig::default());
    let config = FundConfig::default();
    let roster = RosterLock::new();

    let fund = Fund {
        members: MemberService::new(verifier.clone(), member_repo.clone(), roster.clone()),
        lifecycle: MemberLifecycleGuard::new(verifier.clone(), member_repo.clone(), roster),
        moves: MoneyMoveService::new(
            verifier.clone(),
            member_repo.clone(),
            move_repo.clone(),
            config.clone(),
        ),
        balances: BalanceCalculator::new(
            member_repo.clone(),
            move_repo,
            consumption_repo.clone(),
            config.clone(),
        ),
        products: ProductService::new(verifier.clone(), product_repo.clone()),
        stock: StockPurchaseService::new(
            verifier.clone(),
            SurrealStockPurchaseRepository::new(db.clone()),
        ),
        consumptions: ConsumptionService::new(
            verifier,
            member_repo,
            product_repo,
            consumption_repo,
            config,
        ),
        audit: AuditLogger::new(SurrealAuditLogRepository::new(db.clone())),
        admin: ActorCredentials::new(Uuid::nil(), ADMIN_PIN),
        db,
    };

    let admin = fund
        .members
        .bootstrap_administrator("admin", ADMIN_PIN)
        .await
        .unwrap();
    Fund {
        admin: ActorCredentials::new(admin.id, ADMIN_PIN),
        ..fund
    }
}

impl Fund {
    /// Create a member through the administrator and return its
    /// credentials.
    pub async fn add(&self, name: &str, role: Role, pin: &str) -> ActorCredentials {
        let member = self
            .members
            .create_member(
                &self.admin,
                CreateMember {
                    display_name: name.into(),
                    role,
                    pin: pin.into(),
                },
            )
            .await
            .unwrap();
        ActorCredentials::new(member.id, pin)
    }

    /// Audit entries about one entity, newest first.
    pub async fn audit_for(&self, entity_id: Uuid) -> Vec<AuditEntry> {
        self.audit
            .list(
                AuditFilter {
                    entity_id: Some(entity_id),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap()
            .items
    }

    pub async fn audit_count(&self, entity_id: Uuid, action: AuditAction) -> usize {
        self.audit_for(entity_id)
            .await
            .iter()
            .filter(|e| e.action == action)
            .count()
    }
}
