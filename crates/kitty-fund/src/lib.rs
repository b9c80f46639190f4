//! Kitty Fund: money moves, balances, audit logging, member lifecycle
//! and the catalogue, consumption and stock purchase services built on
//! them.
//!
//! Every mutating operation takes [`ActorCredentials`] and verifies the
//! actor itself before doing anything else.
//!
//! [`ActorCredentials`]: kitty_auth::ActorCredentials

pub mod audit;
pub mod balance;
pub mod catalog;
pub mod config;
pub mod consumption;
pub mod lifecycle;
pub mod locks;
pub mod members;
pub mod money_move;
pub mod stock;

pub use audit::AuditLogger;
pub use balance::{BalanceCalculator, MemberBalance};
pub use catalog::ProductService;
pub use config::FundConfig;
pub use consumption::ConsumptionService;
pub use lifecycle::{MemberLifecycleGuard, RemovalOutcome};
pub use locks::{KeyedLocks, RosterLock};
pub use members::MemberService;
pub use money_move::MoneyMoveService;
pub use stock::StockPurchaseService;
