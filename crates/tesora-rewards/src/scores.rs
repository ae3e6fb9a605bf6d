//! Read-only score interface to the external supervision module.
//!
//! Validator and juror work is scored per round by the dispute/supervision
//! collaborator. This crate only ever reads those scores; writing them and
//! advancing the round counter is the collaborator's business.

use tesora_types::{AccountId, Round};

/// Per-round validator/juror scores, answered by the supervision module.
pub trait SupervisionScores {
    /// The round currently open for distribution.
    fn current_round(&self) -> Round;

    /// A validator's score for the given round (0 if unscored).
    fn validator_score(&self, addr: &AccountId, round: Round) -> u64;

    /// A juror's score for the given round (0 if unscored).
    fn juror_score(&self, addr: &AccountId, round: Round) -> u64;

    /// Sum of all validator scores for the round.
    fn total_validator_score(&self, round: Round) -> u64;

    /// Sum of all juror scores for the round.
    fn total_juror_score(&self, round: Round) -> u64;
}
