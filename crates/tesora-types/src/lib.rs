//! # tesora-types
//!
//! Shared domain types used across the Tesora workspace.

pub mod events;
pub mod roles;

/// Common type aliases.
pub type AccountId = [u8; 32];
pub type SaleId = u64;
pub type TokenId = u64;
pub type DayIndex = u64;
pub type Round = u64;

/// Seconds per accounting day.
pub const SECS_PER_DAY: u64 = 86400;

/// Denominator for cut rates: rates are expressed in parts-per-100000.
pub const RATE_DENOMINATOR: u64 = 100_000;

/// Minimum refund window length in days.
pub const MIN_REFUND_WINDOW_DAYS: u64 = 2;

/// Maximum refund window length in days.
pub const MAX_REFUND_WINDOW_DAYS: u64 = 60;

/// Convert a unix timestamp (seconds) to a day index.
pub fn day_of(now_secs: u64) -> DayIndex {
    now_secs / SECS_PER_DAY
}
