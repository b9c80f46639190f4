//! Domain models shared by every kitty crate.

pub mod audit;
pub mod consumption;
pub mod member;
pub mod money_move;
pub mod product;
pub mod stock;

/// Upper bound for any single amount, price or total in minor units.
/// Ten million in major units.
pub const MAX_AMOUNT: i64 = 1_000_000_000;
