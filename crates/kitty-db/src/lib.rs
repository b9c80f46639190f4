//! Kitty Database: opening the ledger, schema upgrades and repository
//! implementations.
//!
//! Every mutating repository call writes its audit entry in the same
//! SurrealDB transaction as the mutation itself.

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, LedgerDb};
pub use error::DbError;
pub use schema::{SCHEMA_VERSION, migrate};
