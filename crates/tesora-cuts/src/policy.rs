//! Cut rates and the pure split function.
//!
//! Rates are parts-per-100000 ([`RATE_DENOMINATOR`]), so 1% = 1000 parts.
//! Each party's cut is `floor(price * rate / 100000)` and the instructor
//! keeps `price - sum(cuts)`, which absorbs all rounding loss: the five
//! amounts always sum exactly to the price.

use serde::{Deserialize, Serialize};
use tesora_types::RATE_DENOMINATOR;

use crate::{CutError, Result};

/// Default foundation rate (4%).
pub const DEFAULT_FOUNDATION_RATE: u64 = 4_000;

/// Default governance treasury rate (10%).
pub const DEFAULT_GOVERNANCE_RATE: u64 = 10_000;

/// Default juror pool rate (1%).
pub const DEFAULT_JUROR_RATE: u64 = 1_000;

/// Default validator pool rate (1%).
pub const DEFAULT_VALIDATOR_RATE: u64 = 1_000;

/// Cut rates for the four platform parties, in parts-per-100000.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutRates {
    /// Platform foundation rate.
    pub foundation: u64,
    /// Governance treasury rate.
    pub governance: u64,
    /// Juror reward pool rate.
    pub juror: u64,
    /// Validator reward pool rate.
    pub validator: u64,
}

/// Default cut rates: foundation 4%, governance 10%, juror 1%, validator 1%.
pub const DEFAULT_RATES: CutRates = CutRates {
    foundation: DEFAULT_FOUNDATION_RATE,
    governance: DEFAULT_GOVERNANCE_RATE,
    juror: DEFAULT_JUROR_RATE,
    validator: DEFAULT_VALIDATOR_RATE,
};

/// The result of splitting one sale price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutSplit {
    /// Foundation cut.
    pub foundation: u64,
    /// Governance treasury cut.
    pub governance: u64,
    /// Juror pool cut.
    pub juror: u64,
    /// Validator pool cut.
    pub validator: u64,
    /// Instructor residual (price minus the four cuts).
    pub instructor: u64,
}

impl CutRates {
    /// Sum of the four rates.
    pub fn total(&self) -> u64 {
        self.foundation + self.governance + self.juror + self.validator
    }
}

impl CutSplit {
    /// Sum of the four platform cuts (everything except the instructor
    /// residual). This is the amount that lands in the pooled bucket.
    pub fn pool_total(&self) -> u64 {
        self.foundation + self.governance + self.juror + self.validator
    }

    /// Total of all five parts. Always equals the split price.
    pub fn total(&self) -> u64 {
        self.pool_total() + self.instructor
    }
}

/// Validate a set of cut rates.
///
/// # Errors
///
/// - [`CutError::InvalidRateSum`] if the rates sum to `>= 100000` (the
///   instructor residual must stay non-negative)
pub fn validate(rates: &CutRates) -> Result<()> {
    let total = rates.total();
    if total >= RATE_DENOMINATOR {
        return Err(CutError::InvalidRateSum {
            total,
            denominator: RATE_DENOMINATOR,
        });
    }
    Ok(())
}

/// Split a sale price according to the given rates.
///
/// Each platform cut is `floor(price * rate / 100000)`; the instructor
/// residual is the remainder. Pure, no side effects.
///
/// # Errors
///
/// - [`CutError::InvalidRateSum`] if the rates are invalid
pub fn split(price: u64, rates: &CutRates) -> Result<CutSplit> {
    validate(rates)?;

    let foundation = part_of(price, rates.foundation);
    let governance = part_of(price, rates.governance);
    let juror = part_of(price, rates.juror);
    let validator = part_of(price, rates.validator);

    // Each part is at most price * rate / denominator and the rates sum to
    // under the denominator, so the subtraction cannot underflow.
    let instructor = price - foundation - governance - juror - validator;

    Ok(CutSplit {
        foundation,
        governance,
        juror,
        validator,
        instructor,
    })
}

/// `floor(price * rate / RATE_DENOMINATOR)` with a u128 intermediate.
fn part_of(price: u64, rate: u64) -> u64 {
    let wide = u128::from(price) * u128::from(rate) / u128::from(RATE_DENOMINATOR);
    // rate < RATE_DENOMINATOR, so the part is strictly less than price.
    wide as u64
}
