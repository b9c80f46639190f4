//! Kitty Core: domain models, error types and repository traits for
//! the shared-fund ledger.

pub mod error;
pub mod models;
pub mod repository;
