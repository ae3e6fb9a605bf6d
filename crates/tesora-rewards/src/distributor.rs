//! Round payout rates and lazy per-participant claims.
//!
//! ## Formula
//!
//! ```text
//! per_point(round) = floor(pool / total_score(round))
//! payout(addr)     = score(addr, round) * per_point(round)
//! ```
//!
//! `sum(payouts) <= pool` always holds; the floor remainder stays in the
//! pool and carries into the next round.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tesora_types::{AccountId, Round};

use crate::scores::SupervisionScores;
use crate::{Result, RewardError};

/// The payout rates fixed when a round is distributed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundPayout {
    /// Micro-units paid per validator score point.
    pub validator_per_point: u64,
    /// Micro-units paid per juror score point.
    pub juror_per_point: u64,
}

/// Distribution state: closed rounds and per-participant claim markers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RewardLedger {
    /// Payout rates per distributed round, ordered for lazy claim scans.
    payouts: BTreeMap<Round, RoundPayout>,
    /// Highest round each validator has claimed through. Rounds are
    /// numbered from 1; an absent entry means nothing claimed yet.
    claimed_validator: HashMap<AccountId, Round>,
    /// Highest round each juror has claimed through.
    claimed_juror: HashMap<AccountId, Round>,
}

impl RewardLedger {
    /// Create an empty reward ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a round has been distributed (and therefore closed).
    pub fn is_distributed(&self, round: Round) -> bool {
        self.payouts.contains_key(&round)
    }

    /// The payout rates fixed for a distributed round.
    pub fn payout(&self, round: Round) -> Option<RoundPayout> {
        self.payouts.get(&round).copied()
    }

    /// Distribute the pooled cuts for a round.
    ///
    /// Fixes `floor(pool / total_score)` payout rates for validators and
    /// jurors and closes the round. Returns `(consumed_validator,
    /// consumed_juror)` — the amounts actually committed to payouts; the
    /// caller keeps the remainder pooled for the next round. A side with a
    /// zero score total gets a zero rate and consumes nothing.
    ///
    /// # Errors
    ///
    /// - [`RewardError::AlreadyDistributed`] if the round is closed
    /// - [`RewardError::NoScoreYet`] if both score totals are zero
    pub fn distribute(
        &mut self,
        round: Round,
        validator_pool: u64,
        juror_pool: u64,
        scores: &impl SupervisionScores,
    ) -> Result<(u64, u64)> {
        if self.is_distributed(round) {
            return Err(RewardError::AlreadyDistributed { round });
        }

        let total_validator = scores.total_validator_score(round);
        let total_juror = scores.total_juror_score(round);
        if total_validator == 0 && total_juror == 0 {
            return Err(RewardError::NoScoreYet { round });
        }

        let validator_per_point = if total_validator > 0 {
            validator_pool / total_validator
        } else {
            0
        };
        let juror_per_point = if total_juror > 0 {
            juror_pool / total_juror
        } else {
            0
        };

        let consumed_validator = validator_per_point
            .checked_mul(total_validator)
            .ok_or(RewardError::Overflow)?;
        let consumed_juror = juror_per_point
            .checked_mul(total_juror)
            .ok_or(RewardError::Overflow)?;

        self.payouts.insert(
            round,
            RoundPayout {
                validator_per_point,
                juror_per_point,
            },
        );

        tracing::info!(
            round,
            validator_per_point,
            juror_per_point,
            consumed_validator,
            consumed_juror,
            "rewards distributed"
        );
        Ok((consumed_validator, consumed_juror))
    }

    /// A validator's unclaimed payout across all distributed rounds.
    ///
    /// # Errors
    ///
    /// - [`RewardError::Overflow`] on payout overflow
    pub fn claimable_validator(
        &self,
        addr: &AccountId,
        scores: &impl SupervisionScores,
    ) -> Result<u64> {
        let from = self.claimed_validator.get(addr).copied().unwrap_or(0);
        let mut total = 0u64;
        for (&round, payout) in self.payouts.range(from + 1..) {
            let pay = scores
                .validator_score(addr, round)
                .checked_mul(payout.validator_per_point)
                .ok_or(RewardError::Overflow)?;
            total = total.checked_add(pay).ok_or(RewardError::Overflow)?;
        }
        Ok(total)
    }

    /// A juror's unclaimed payout across all distributed rounds.
    ///
    /// # Errors
    ///
    /// - [`RewardError::Overflow`] on payout overflow
    pub fn claimable_juror(&self, addr: &AccountId, scores: &impl SupervisionScores) -> Result<u64> {
        let from = self.claimed_juror.get(addr).copied().unwrap_or(0);
        let mut total = 0u64;
        for (&round, payout) in self.payouts.range(from + 1..) {
            let pay = scores
                .juror_score(addr, round)
                .checked_mul(payout.juror_per_point)
                .ok_or(RewardError::Overflow)?;
            total = total.checked_add(pay).ok_or(RewardError::Overflow)?;
        }
        Ok(total)
    }

    /// Claim a validator's unclaimed payout and advance their marker.
    ///
    /// # Errors
    ///
    /// - [`RewardError::Overflow`] on payout overflow
    pub fn claim_validator(
        &mut self,
        addr: &AccountId,
        scores: &impl SupervisionScores,
    ) -> Result<u64> {
        let amount = self.claimable_validator(addr, scores)?;
        if let Some((&latest, _)) = self.payouts.iter().next_back() {
            self.claimed_validator.insert(*addr, latest);
        }
        if amount > 0 {
            tracing::debug!(amount, "validator reward claimed");
        }
        Ok(amount)
    }

    /// Claim a juror's unclaimed payout and advance their marker.
    ///
    /// # Errors
    ///
    /// - [`RewardError::Overflow`] on payout overflow
    pub fn claim_juror(&mut self, addr: &AccountId, scores: &impl SupervisionScores) -> Result<u64> {
        let amount = self.claimable_juror(addr, scores)?;
        if let Some((&latest, _)) = self.payouts.iter().next_back() {
            self.claimed_juror.insert(*addr, latest);
        }
        if amount > 0 {
            tracing::debug!(amount, "juror reward claimed");
        }
        Ok(amount)
    }
}
