//! # tesora-cuts
//!
//! Multi-party cut computation for sale prices.
//!
//! Each sale price is split among four platform parties (foundation,
//! governance treasury, jurors, validators) with the instructor keeping the
//! residual. Rates are fixed-point parts-per-100000.
//!
//! ## Modules
//!
//! - [`policy`] — Cut rates, validation, and the pure split function

pub mod policy;

pub use policy::{CutRates, CutSplit, DEFAULT_RATES};

/// Error types for cut computation.
#[derive(Debug, thiserror::Error)]
pub enum CutError {
    /// The four platform rates sum to the full price or more, leaving no
    /// non-negative instructor residual. A configuration this broken is a
    /// deployment bug, not a user error.
    #[error("cut rates must sum to less than {denominator}, got {total}")]
    InvalidRateSum {
        /// The actual rate total.
        total: u64,
        /// The rate denominator (parts-per-100000).
        denominator: u64,
    },

    /// Arithmetic overflow in cut calculation.
    #[error("arithmetic overflow in cut calculation")]
    Overflow,
}

/// Convenience result type for cut operations.
pub type Result<T> = std::result::Result<T, CutError>;
