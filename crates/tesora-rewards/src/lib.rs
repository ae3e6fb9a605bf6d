//! # tesora-rewards
//!
//! Score-weighted reward distribution for validators and jurors.
//!
//! Each supervision round pools the matured validator and juror cuts; when
//! a round is distributed, a per-score-point payout rate is fixed and the
//! round closes. Individual participants claim lazily — their payout is
//! `score * per_point` computed at claim time, so distribution never
//! iterates over the participant set.
//!
//! ## Modules
//!
//! - [`scores`] — The read-only score interface to the supervision module
//! - [`distributor`] — Round payout rates and lazy claims

pub mod distributor;
pub mod scores;

pub use distributor::{RewardLedger, RoundPayout};
pub use scores::SupervisionScores;

/// Error types for reward distribution.
#[derive(Debug, thiserror::Error)]
pub enum RewardError {
    /// The round has already been distributed; closing is irreversible.
    #[error("round {round} already distributed")]
    AlreadyDistributed {
        /// The offending round.
        round: u64,
    },

    /// No scores have been recorded for the round; the pools carry over.
    #[error("round {round} has no recorded scores yet")]
    NoScoreYet {
        /// The offending round.
        round: u64,
    },

    /// Arithmetic overflow in a payout calculation.
    #[error("arithmetic overflow in reward calculation")]
    Overflow,
}

/// Convenience result type for reward operations.
pub type Result<T> = std::result::Result<T, RewardError>;
