//! # tesora-ledger
//!
//! The circular time-bucketed locked-balance ledger.
//!
//! Instructor residuals and pooled platform cuts from every sale are held
//! here for one refund window before they become withdrawable. The store is
//! a fixed-size circular array indexed by `day % window_length`, so storage
//! is bounded regardless of history length, deposits are O(1), and refunds
//! reverse exactly the amount the original sale deferred.
//!
//! ## Modules
//!
//! - [`locked`] — The [`locked::LockedLedger`] itself: deposit, reverse,
//!   maturity sweep, and refund-window resize with its precaution period

pub mod locked;

pub use locked::{LockedLedger, PoolTotals};

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Requested refund window is below the minimum.
    #[error("refund window too short: {requested} days (minimum {min})")]
    WindowTooShort {
        /// Requested length in days.
        requested: u64,
        /// Minimum permitted length.
        min: u64,
    },

    /// Requested refund window is above the maximum.
    #[error("refund window too long: {requested} days (maximum {max})")]
    WindowTooLong {
        /// Requested length in days.
        requested: u64,
        /// Maximum permitted length.
        max: u64,
    },

    /// Requested refund window equals the current one.
    #[error("refund window already {length_days} days")]
    WindowUnchanged {
        /// The current window length.
        length_days: u64,
    },

    /// Withdrawals are blocked until one old-length period has elapsed
    /// after a window change. Transient: retry after the deadline.
    #[error("precaution period active until day {deadline_day}, today is day {today}")]
    PrecautionPeriodActive {
        /// First day on which withdrawals are permitted again.
        deadline_day: u64,
        /// The caller's current day index.
        today: u64,
    },

    /// A reversal asked for more than the bucket holds. This signals a
    /// double refund or a bookkeeping bug and must never be reachable in
    /// correct operation.
    #[error("bucket underflow: bucket holds {available}, reversal needs {needed}")]
    Underflow {
        /// Amount the bucket currently holds.
        available: u64,
        /// Amount the reversal tried to remove.
        needed: u64,
    },

    /// Arithmetic overflow in a balance update.
    #[error("arithmetic overflow in ledger balance")]
    Overflow,
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
