//! The circular locked-balance store.
//!
//! Two parallel circular arrays of `length_days` slots hold not-yet-
//! withdrawable balances: one per instructor for their residuals, one
//! shared for the pooled platform cuts. A slot is addressed by
//! `day % length_days` and stamped with the day that last wrote it; its
//! contents mean "amount still outstanding for whichever sale last touched
//! this slot". [`LockedLedger::deposit`] returns the slot index it used and
//! callers keep it per sale, so a refund reverses exactly the slot its
//! deposit landed in even after the window has rotated past it or been
//! resized (a shrink folds dropped slots, and the caller re-points stored
//! indices the same way).
//!
//! ## Maturity
//!
//! A slot is mature once a full window has passed since it was last
//! written (`today >= written_day + length_days`) and today's rotating
//! pointer is not on it. After any window-length change, a precaution
//! period of one *old*-length window blocks all withdrawals regardless of
//! individual slot age, because carried-over slots keep their old stamps.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tesora_cuts::CutSplit;
use tesora_types::{AccountId, DayIndex, MAX_REFUND_WINDOW_DAYS, MIN_REFUND_WINDOW_DAYS};

use crate::{LedgerError, Result};

/// One instructor slot: a locked amount and the day that last wrote it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LockedSlot {
    amount: u64,
    written_day: DayIndex,
}

/// One pool slot. The four role components are carried separately so the
/// maturity sweep can credit each role pool exactly; the bucket total is
/// their sum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PoolSlot {
    foundation: u64,
    governance: u64,
    juror: u64,
    validator: u64,
    written_day: DayIndex,
}

impl PoolSlot {
    fn total(&self) -> u64 {
        self.foundation + self.governance + self.juror + self.validator
    }
}

/// Matured per-role pool totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTotals {
    pub foundation: u64,
    pub governance: u64,
    pub juror: u64,
    pub validator: u64,
}

impl PoolTotals {
    /// Sum of the four role totals.
    pub fn total(&self) -> u64 {
        self.foundation + self.governance + self.juror + self.validator
    }
}

/// The circular day-bucketed locked-balance ledger.
///
/// Owns all rotating state; every mutation goes through an exclusive
/// method. The caller supplies `day`/`today` indices read once per
/// operation from its clock source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LockedLedger {
    length_days: u64,
    instructor_locked: HashMap<AccountId, Vec<LockedSlot>>,
    pool_locked: Vec<PoolSlot>,
    instructor_unlocked: HashMap<AccountId, u64>,
    pool_unlocked: PoolTotals,
    instructor_refunded: HashMap<AccountId, u64>,
    pool_refunded: u64,
    last_changed_day: DayIndex,
    precaution_deadline_day: DayIndex,
}

impl LockedLedger {
    /// Create a ledger with the given refund-window length.
    ///
    /// No precaution period is active at creation; the first deposit
    /// cannot mature before one full window has passed anyway.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::WindowTooShort`] / [`LedgerError::WindowTooLong`]
    ///   if `length_days` is outside the permitted bounds
    pub fn new(length_days: u64, today: DayIndex) -> Result<Self> {
        check_window_bounds(length_days)?;
        Ok(Self {
            length_days,
            instructor_locked: HashMap::new(),
            pool_locked: vec![PoolSlot::default(); length_days as usize],
            instructor_unlocked: HashMap::new(),
            pool_unlocked: PoolTotals::default(),
            instructor_refunded: HashMap::new(),
            pool_refunded: 0,
            last_changed_day: today,
            precaution_deadline_day: today,
        })
    }

    /// Current refund-window length in days.
    pub fn length_days(&self) -> u64 {
        self.length_days
    }

    /// First day on which withdrawals are permitted again.
    pub fn precaution_deadline_day(&self) -> DayIndex {
        self.precaution_deadline_day
    }

    fn bucket(&self, day: DayIndex) -> usize {
        (day % self.length_days) as usize
    }

    /// Record a sale's deferred amounts. O(1).
    ///
    /// The instructor residual and the four pool components from `split`
    /// land in bucket `day % length_days`, and the touched slots are
    /// re-stamped with `day`. Returns the bucket index used; the caller
    /// stores it per sale and passes it back to [`Self::reverse`] on a
    /// refund.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on balance overflow
    pub fn deposit(
        &mut self,
        instructor: AccountId,
        split: &CutSplit,
        day: DayIndex,
    ) -> Result<usize> {
        let bucket = self.bucket(day);
        let slots = self
            .instructor_locked
            .entry(instructor)
            .or_insert_with(|| vec![LockedSlot::default(); self.length_days as usize]);
        let slot = &mut slots[bucket];
        slot.amount = slot
            .amount
            .checked_add(split.instructor)
            .ok_or(LedgerError::Overflow)?;
        slot.written_day = day;

        let pool = &mut self.pool_locked[bucket];
        pool.foundation = pool
            .foundation
            .checked_add(split.foundation)
            .ok_or(LedgerError::Overflow)?;
        pool.governance = pool
            .governance
            .checked_add(split.governance)
            .ok_or(LedgerError::Overflow)?;
        pool.juror = pool
            .juror
            .checked_add(split.juror)
            .ok_or(LedgerError::Overflow)?;
        pool.validator = pool
            .validator
            .checked_add(split.validator)
            .ok_or(LedgerError::Overflow)?;
        pool.written_day = day;

        tracing::trace!(
            bucket,
            day,
            residual = split.instructor,
            pool = split.pool_total(),
            "ledger: deposit"
        );
        Ok(bucket)
    }

    /// Reverse a refunded sale's deferred amounts.
    ///
    /// `bucket` is the index the sale's deposit returned, re-pointed by
    /// the caller if a window shrink has since folded that slot. Passing
    /// the stored index (rather than recomputing from the sale day) keeps
    /// the reversal on the right slot across window resizes. Slots are
    /// not re-stamped by a reversal.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Underflow`] if the bucket holds less than the
    ///   reversal needs — a double refund or bookkeeping bug
    pub fn reverse(&mut self, instructor: AccountId, split: &CutSplit, bucket: usize) -> Result<()> {
        let slots = self
            .instructor_locked
            .get_mut(&instructor)
            .ok_or(LedgerError::Underflow {
                available: 0,
                needed: split.instructor,
            })?;
        let slot = slots.get_mut(bucket).ok_or(LedgerError::Underflow {
            available: 0,
            needed: split.instructor,
        })?;
        slot.amount = sub_or_underflow(slot.amount, split.instructor)?;

        let pool = self
            .pool_locked
            .get_mut(bucket)
            .ok_or(LedgerError::Underflow {
                available: 0,
                needed: split.pool_total(),
            })?;
        pool.foundation = sub_or_underflow(pool.foundation, split.foundation)?;
        pool.governance = sub_or_underflow(pool.governance, split.governance)?;
        pool.juror = sub_or_underflow(pool.juror, split.juror)?;
        pool.validator = sub_or_underflow(pool.validator, split.validator)?;

        *self.instructor_refunded.entry(instructor).or_insert(0) += split.instructor;
        self.pool_refunded += split.pool_total();

        tracing::debug!(
            bucket,
            residual = split.instructor,
            pool = split.pool_total(),
            "ledger: reversal"
        );
        Ok(())
    }

    fn check_precaution(&self, today: DayIndex) -> Result<()> {
        if today < self.precaution_deadline_day {
            return Err(LedgerError::PrecautionPeriodActive {
                deadline_day: self.precaution_deadline_day,
                today,
            });
        }
        Ok(())
    }

    fn slot_mature(&self, written_day: DayIndex, bucket: usize, today: DayIndex) -> bool {
        today >= written_day + self.length_days && self.bucket(today) != bucket
    }

    /// Sweep the instructor's mature buckets into their unlocked balance
    /// and return the total now withdrawable.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::PrecautionPeriodActive`] before the deadline
    pub fn collect_instructor(&mut self, instructor: AccountId, today: DayIndex) -> Result<u64> {
        self.check_precaution(today)?;

        let length_days = self.length_days;
        let mut matured = 0u64;
        if let Some(slots) = self.instructor_locked.get_mut(&instructor) {
            for (bucket, slot) in slots.iter_mut().enumerate() {
                if slot.amount > 0
                    && today >= slot.written_day + length_days
                    && (today % length_days) as usize != bucket
                {
                    matured += slot.amount;
                    *slot = LockedSlot::default();
                }
            }
        }

        let unlocked = self.instructor_unlocked.entry(instructor).or_insert(0);
        *unlocked = unlocked.checked_add(matured).ok_or(LedgerError::Overflow)?;
        if matured > 0 {
            tracing::debug!(matured, total = *unlocked, "ledger: instructor sweep");
        }
        Ok(*unlocked)
    }

    /// Sweep mature pool buckets into the unlocked role totals and return
    /// a copy of those totals.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::PrecautionPeriodActive`] before the deadline
    pub fn collect_pool(&mut self, today: DayIndex) -> Result<PoolTotals> {
        self.check_precaution(today)?;

        let mut matured = 0u64;
        for bucket in 0..self.pool_locked.len() {
            let slot = self.pool_locked[bucket];
            if slot.total() > 0 && self.slot_mature(slot.written_day, bucket, today) {
                self.pool_unlocked.foundation = self
                    .pool_unlocked
                    .foundation
                    .checked_add(slot.foundation)
                    .ok_or(LedgerError::Overflow)?;
                self.pool_unlocked.governance = self
                    .pool_unlocked
                    .governance
                    .checked_add(slot.governance)
                    .ok_or(LedgerError::Overflow)?;
                self.pool_unlocked.juror = self
                    .pool_unlocked
                    .juror
                    .checked_add(slot.juror)
                    .ok_or(LedgerError::Overflow)?;
                self.pool_unlocked.validator = self
                    .pool_unlocked
                    .validator
                    .checked_add(slot.validator)
                    .ok_or(LedgerError::Overflow)?;
                matured += slot.total();
                self.pool_locked[bucket] = PoolSlot::default();
            }
        }
        if matured > 0 {
            tracing::debug!(matured, "ledger: pool sweep");
        }
        Ok(self.pool_unlocked)
    }

    /// Consume the instructor's unlocked balance for payout.
    pub fn take_unlocked_instructor(&mut self, instructor: AccountId) -> u64 {
        self.instructor_unlocked.remove(&instructor).unwrap_or(0)
    }

    /// Consume the unlocked foundation total for payout.
    pub fn take_foundation(&mut self) -> u64 {
        std::mem::take(&mut self.pool_unlocked.foundation)
    }

    /// Consume the unlocked governance total for payout.
    pub fn take_governance(&mut self) -> u64 {
        std::mem::take(&mut self.pool_unlocked.governance)
    }

    /// Consume the unlocked juror total (feeds the reward distributor).
    pub fn take_juror_pool(&mut self) -> u64 {
        std::mem::take(&mut self.pool_unlocked.juror)
    }

    /// Consume the unlocked validator total (feeds the reward distributor).
    pub fn take_validator_pool(&mut self) -> u64 {
        std::mem::take(&mut self.pool_unlocked.validator)
    }

    /// Change the refund-window length, resizing both circular arrays.
    ///
    /// Existing bucket contents are carried over positionally: bucket
    /// identity is kept, calendar alignment is not, and carried slots are
    /// NOT re-stamped — the precaution period of one old-length window is
    /// the guard that lets every old-scheme bucket mature or be carried
    /// safely. A shrink whose dropped tail holds value folds that tail
    /// into the last surviving bucket (stamped with today) so no locked
    /// value is ever lost.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::WindowTooShort`] / [`LedgerError::WindowTooLong`]
    ///   outside the permitted bounds
    /// - [`LedgerError::WindowUnchanged`] if `new_length` equals the
    ///   current length
    pub fn change_window(&mut self, new_length: u64, today: DayIndex) -> Result<()> {
        check_window_bounds(new_length)?;
        if new_length == self.length_days {
            return Err(LedgerError::WindowUnchanged {
                length_days: self.length_days,
            });
        }

        let old_length = self.length_days;
        let new_len = new_length as usize;

        if new_len > self.pool_locked.len() {
            self.pool_locked.resize(new_len, PoolSlot::default());
            for slots in self.instructor_locked.values_mut() {
                slots.resize(new_len, LockedSlot::default());
            }
        } else {
            let tail: Vec<PoolSlot> = self.pool_locked.split_off(new_len);
            let last = new_len - 1;
            for dropped in tail {
                if dropped.total() > 0 {
                    self.pool_locked[last].foundation += dropped.foundation;
                    self.pool_locked[last].governance += dropped.governance;
                    self.pool_locked[last].juror += dropped.juror;
                    self.pool_locked[last].validator += dropped.validator;
                    self.pool_locked[last].written_day = today;
                }
            }
            for slots in self.instructor_locked.values_mut() {
                let tail: Vec<LockedSlot> = slots.split_off(new_len);
                for dropped in tail {
                    if dropped.amount > 0 {
                        slots[last].amount += dropped.amount;
                        slots[last].written_day = today;
                    }
                }
            }
        }

        self.length_days = new_length;
        self.last_changed_day = today;
        self.precaution_deadline_day = today + old_length;

        tracing::info!(
            old_length,
            new_length,
            precaution_deadline_day = self.precaution_deadline_day,
            "refund window changed"
        );
        Ok(())
    }

    /// Sum of the instructor's locked buckets.
    pub fn locked_instructor_total(&self, instructor: &AccountId) -> u64 {
        self.instructor_locked
            .get(instructor)
            .map(|slots| slots.iter().map(|s| s.amount).sum())
            .unwrap_or(0)
    }

    /// The instructor's locked amount in one bucket.
    pub fn instructor_bucket(&self, instructor: &AccountId, bucket: usize) -> u64 {
        self.instructor_locked
            .get(instructor)
            .and_then(|slots| slots.get(bucket))
            .map(|s| s.amount)
            .unwrap_or(0)
    }

    /// The instructor's unlocked (matured, not yet paid) balance.
    pub fn unlocked_instructor(&self, instructor: &AccountId) -> u64 {
        self.instructor_unlocked
            .get(instructor)
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all locked pool buckets.
    pub fn pool_locked_total(&self) -> u64 {
        self.pool_locked.iter().map(|s| s.total()).sum()
    }

    /// Audit counter: total residuals reversed for this instructor.
    pub fn refunded_instructor_total(&self, instructor: &AccountId) -> u64 {
        self.instructor_refunded
            .get(instructor)
            .copied()
            .unwrap_or(0)
    }

    /// Audit counter: total pool cuts reversed.
    pub fn pool_refunded_total(&self) -> u64 {
        self.pool_refunded
    }
}

fn check_window_bounds(length_days: u64) -> Result<()> {
    if length_days < MIN_REFUND_WINDOW_DAYS {
        return Err(LedgerError::WindowTooShort {
            requested: length_days,
            min: MIN_REFUND_WINDOW_DAYS,
        });
    }
    if length_days > MAX_REFUND_WINDOW_DAYS {
        return Err(LedgerError::WindowTooLong {
            requested: length_days,
            max: MAX_REFUND_WINDOW_DAYS,
        });
    }
    Ok(())
}

fn sub_or_underflow(available: u64, needed: u64) -> Result<u64> {
    available
        .checked_sub(needed)
        .ok_or(LedgerError::Underflow { available, needed })
}
