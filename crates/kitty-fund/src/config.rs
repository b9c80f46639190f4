//! Fund service configuration.

use kitty_core::models::money_move::MAX_NOTE_LENGTH;

/// Configuration for the fund services.
#[derive(Debug, Clone)]
pub struct FundConfig {
    /// Balances below this many minor units are reported as low
    /// (default: 1000).
    pub balance_threshold: i64,
    /// Maximum money move note length in characters (default: 500).
    pub max_note_length: usize,
    /// Upper bound for "recent consumptions" listings (default: 100).
    pub recent_consumption_limit: u64,
}

impl Default for FundConfig {
    fn default() -> Self {
        Self {
            balance_threshold: 1000,
            max_note_length: MAX_NOTE_LENGTH,
            recent_consumption_limit: 100,
        }
    }
}
