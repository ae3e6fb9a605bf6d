//! The treasury service and its entry points.
//!
//! [`TreasuryService`] wires the voucher authorizer, the cut policy, the
//! locked ledger, and the reward distributor behind the external
//! collaborator seams. Each entry point reads the clock once (the caller
//! passes `now` in unix seconds), validates everything up front, and only
//! then mutates state, so a failed call leaves no observable change.

use serde::{Deserialize, Serialize};
use tesora_crypto::ed25519::{derive_account_id, VerifyingKey};
use tesora_cuts::policy::{self, split, CutRates};
use tesora_cuts::{CutError, CutSplit};
use tesora_ledger::LockedLedger;
use tesora_rewards::RewardLedger;
use tesora_types::events::{SaleKind, TreasuryEvent, WithdrawalRole};
use tesora_types::{day_of, roles, AccountId, SaleId};
use tesora_voucher::{
    authorize, CoachingVoucher, PurchaseVoucher, RedeemVoucher, RefundVoucher, SignedVoucher,
    SignerRegistry,
};

use crate::collab::{ContentCatalog, RoleRegistry, TransferError, ValueTransfer};
use crate::sale::SaleStore;
use crate::{Result, TreasuryError};

/// How the refund window applies to an individual sale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundWindowRule {
    /// A sale is refundable while younger than the *current* window
    /// length. Resizing the window retroactively moves the cutoff for
    /// open sales.
    #[default]
    CurrentWindow,
    /// A sale is refundable while younger than the window length that was
    /// in force when it was recorded.
    SnapshotAtSale,
}

/// Static treasury configuration, fixed at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TreasuryConfig {
    /// The platform cut rates in parts per 100 000.
    pub rates: CutRates,
    /// Initial refund-window length in days.
    pub refund_window_days: u64,
    /// Which window length governs refund eligibility.
    pub refund_rule: RefundWindowRule,
    /// Account holding all escrowed sale proceeds.
    pub treasury_account: AccountId,
    /// Account foundation withdrawals pay into.
    pub foundation_account: AccountId,
    /// Account governance withdrawals pay into.
    pub governance_account: AccountId,
}

/// Bridges the role registry into the voucher authorizer, which only
/// sees verifying keys.
struct RegistrySigner<'a, R: RoleRegistry>(&'a R);

impl<R: RoleRegistry> SignerRegistry for RegistrySigner<'_, R> {
    fn is_voucher_signer(&self, signer: &VerifyingKey) -> bool {
        self.0
            .has_role(&derive_account_id(signer), roles::VOUCHER_SIGNER)
    }
}

/// A validated purchase, ready to post. Built during the read-only pass
/// over a batch so mutation only starts once every voucher has cleared.
struct PreparedSale {
    instructor: AccountId,
    receiver: AccountId,
    price: u64,
    cuts: CutSplit,
}

/// The treasury orchestration service.
///
/// Generic over the four external collaborators; tests supply in-memory
/// implementations.
pub struct TreasuryService<X, R, C, S>
where
    X: ValueTransfer,
    R: RoleRegistry,
    C: ContentCatalog,
    S: tesora_rewards::SupervisionScores,
{
    config: TreasuryConfig,
    transfers: X,
    registry: R,
    catalog: C,
    scores: S,
    locked: LockedLedger,
    rewards: RewardLedger,
    sales: SaleStore,
    /// Matured validator cuts awaiting a distribution round.
    validator_pool: u64,
    /// Matured juror cuts awaiting a distribution round.
    juror_pool: u64,
    events: Vec<TreasuryEvent>,
}

impl<X, R, C, S> TreasuryService<X, R, C, S>
where
    X: ValueTransfer,
    R: RoleRegistry,
    C: ContentCatalog,
    S: tesora_rewards::SupervisionScores,
{
    /// Construct a treasury over the given collaborators.
    ///
    /// # Errors
    ///
    /// - [`tesora_cuts::CutError::InvalidRateSum`] if the configured rates
    ///   leave the instructor no residual
    /// - [`tesora_ledger::LedgerError::WindowTooShort`] /
    ///   [`tesora_ledger::LedgerError::WindowTooLong`] for a bad initial
    ///   window length
    pub fn new(
        config: TreasuryConfig,
        transfers: X,
        registry: R,
        catalog: C,
        scores: S,
        now: u64,
    ) -> Result<Self> {
        policy::validate(&config.rates)?;
        let locked = LockedLedger::new(config.refund_window_days, day_of(now))?;
        Ok(Self {
            config,
            transfers,
            registry,
            catalog,
            scores,
            locked,
            rewards: RewardLedger::new(),
            sales: SaleStore::new(),
            validator_pool: 0,
            juror_pool: 0,
            events: Vec::new(),
        })
    }

    /// Redeem a batch of purchase vouchers in one atomic operation.
    ///
    /// Every voucher is authorized and price-checked, and the payer's
    /// balance is checked against the batch total, before the first
    /// transfer. Returns the recorded sale ids in voucher order.
    ///
    /// # Errors
    ///
    /// - [`TreasuryError::AccountBarred`] if the payer is banned or not
    ///   KYC'd
    /// - [`TreasuryError::NotAuthorized`] if a voucher names a different
    ///   redeemer
    /// - [`TreasuryError::Voucher`] on expiry or signature failure
    /// - [`TreasuryError::UnknownContent`] / [`TreasuryError::PriceMismatch`]
    ///   on catalog disagreement
    /// - [`TreasuryError::Transfer`] if the payer cannot cover the batch
    pub fn buy_content(
        &mut self,
        payer: AccountId,
        vouchers: &[SignedVoucher<PurchaseVoucher>],
        now: u64,
    ) -> Result<Vec<SaleId>> {
        self.check_participant(&payer)?;

        let mut prepared = Vec::with_capacity(vouchers.len());
        let mut batch_total = 0u128;
        for voucher in vouchers {
            authorize(voucher, &RegistrySigner(&self.registry), now)?;
            let body = &voucher.body;
            if body.redeemer != payer {
                return Err(TreasuryError::NotAuthorized);
            }

            let instructor = self
                .catalog
                .instructor_of(body.token_id)
                .ok_or(TreasuryError::UnknownContent {
                    token_id: body.token_id,
                })?;

            // A discount signed into the voucher overrides the catalog;
            // otherwise the catalog price must match exactly.
            if !body.discounted {
                let expected = self.catalog_price(body)?;
                if expected != body.price {
                    return Err(TreasuryError::PriceMismatch {
                        expected,
                        actual: body.price,
                    });
                }
            }

            prepared.push(PreparedSale {
                instructor,
                receiver: body.receiver(),
                price: body.price,
                cuts: split(body.price, &self.config.rates)?,
            });
            batch_total += u128::from(body.price);
        }

        let available = self.transfers.balance_of(&payer);
        if u128::from(available) < batch_total {
            return Err(TransferError::InsufficientBalance {
                available,
                needed: u64::try_from(batch_total).unwrap_or(u64::MAX),
            }
            .into());
        }

        let today = day_of(now);
        let window = self.locked.length_days();
        let mut sale_ids = Vec::with_capacity(prepared.len());
        for sale in prepared {
            self.transfers
                .transfer(payer, self.config.treasury_account, sale.price)?;
            let bucket = self.locked.deposit(sale.instructor, &sale.cuts, today)?;
            let sale_id = self.sales.record(
                SaleKind::Content,
                payer,
                sale.receiver,
                sale.instructor,
                sale.price,
                sale.cuts,
                today,
                bucket,
                window,
            );
            self.events.push(TreasuryEvent::SaleRecorded {
                sale_id,
                kind: SaleKind::Content,
                payer,
                receiver: sale.receiver,
                instructor: sale.instructor,
                total_price: sale.price,
            });
            tracing::info!(sale_id, price = sale.price, "content sale recorded");
            sale_ids.push(sale_id);
        }
        Ok(sale_ids)
    }

    /// Redeem a coaching voucher: the learner pays, the coach is credited
    /// as instructor.
    ///
    /// # Errors
    ///
    /// - [`TreasuryError::NotAuthorized`] if the payer is not the voucher's
    ///   learner
    /// - otherwise as [`Self::buy_content`]
    pub fn buy_coaching(
        &mut self,
        payer: AccountId,
        voucher: &SignedVoucher<CoachingVoucher>,
        now: u64,
    ) -> Result<SaleId> {
        self.check_participant(&payer)?;
        authorize(voucher, &RegistrySigner(&self.registry), now)?;
        let body = &voucher.body;
        if body.learner != payer {
            return Err(TreasuryError::NotAuthorized);
        }

        let cuts = split(body.price, &self.config.rates)?;
        self.transfers
            .transfer(payer, self.config.treasury_account, body.price)?;
        let today = day_of(now);
        let bucket = self.locked.deposit(body.coach, &cuts, today)?;
        let sale_id = self.sales.record(
            SaleKind::Coaching,
            payer,
            payer,
            body.coach,
            body.price,
            cuts,
            today,
            bucket,
            self.locked.length_days(),
        );
        self.events.push(TreasuryEvent::SaleRecorded {
            sale_id,
            kind: SaleKind::Coaching,
            payer,
            receiver: payer,
            instructor: body.coach,
            total_price: body.price,
        });
        tracing::info!(sale_id, price = body.price, "coaching sale recorded");
        Ok(sale_id)
    }

    /// Reverse a recorded sale and return the full price to the payer.
    ///
    /// # Errors
    ///
    /// - [`TreasuryError::UnknownSale`] / [`TreasuryError::AlreadyRefunded`]
    /// - [`TreasuryError::RefundWindowExpired`] if the sale is older than
    ///   the governing window
    /// - [`TreasuryError::NotAuthorized`] if the voucher's instructor does
    ///   not match the sale's
    pub fn refund(&mut self, voucher: &SignedVoucher<RefundVoucher>, now: u64) -> Result<()> {
        authorize(voucher, &RegistrySigner(&self.registry), now)?;
        let body = &voucher.body;
        let sale = self
            .sales
            .get(body.sale_id)
            .ok_or(TreasuryError::UnknownSale {
                sale_id: body.sale_id,
            })?
            .clone();
        if sale.refunded {
            return Err(TreasuryError::AlreadyRefunded {
                sale_id: sale.sale_id,
            });
        }
        if body.instructor != sale.instructor {
            return Err(TreasuryError::NotAuthorized);
        }

        let window_days = match self.config.refund_rule {
            RefundWindowRule::CurrentWindow => self.locked.length_days(),
            RefundWindowRule::SnapshotAtSale => sale.window_at_sale,
        };
        let age_days = day_of(now).saturating_sub(sale.created_day);
        if age_days > window_days {
            return Err(TreasuryError::RefundWindowExpired {
                sale_id: sale.sale_id,
                age_days,
                window_days,
            });
        }

        let treasury_balance = self.transfers.balance_of(&self.config.treasury_account);
        if treasury_balance < sale.total_price {
            return Err(TransferError::InsufficientBalance {
                available: treasury_balance,
                needed: sale.total_price,
            }
            .into());
        }

        // Reverse first; the transfer cannot fail after the balance check.
        // The sale's stored bucket stays valid across window resizes.
        self.locked
            .reverse(sale.instructor, &sale.cuts, sale.bucket)?;
        self.transfers.transfer(
            self.config.treasury_account,
            sale.payer,
            sale.total_price,
        )?;
        self.sales.mark_refunded(sale.sale_id);
        self.events.push(TreasuryEvent::SaleRefunded {
            sale_id: sale.sale_id,
            payer: sale.payer,
            instructor: sale.instructor,
            total_price: sale.total_price,
        });
        tracing::info!(sale_id = sale.sale_id, "sale refunded");
        Ok(())
    }

    /// Verify a content-mint voucher. Minting happens in the external
    /// catalog; this only answers whether the voucher is redeemable now.
    ///
    /// # Errors
    ///
    /// - [`TreasuryError::Voucher`] on expiry or signature failure
    pub fn verify_redeem(&self, voucher: &SignedVoucher<RedeemVoucher>, now: u64) -> Result<()> {
        authorize(voucher, &RegistrySigner(&self.registry), now)?;
        Ok(())
    }

    /// Pay out an instructor's matured residuals. Returns the amount paid,
    /// zero when nothing has matured.
    ///
    /// Barred accounts may still withdraw; bans gate new participation,
    /// not funds already earned.
    ///
    /// # Errors
    ///
    /// - [`tesora_ledger::LedgerError::PrecautionPeriodActive`] after a
    ///   recent window change
    pub fn withdraw_instructor(&mut self, instructor: AccountId, now: u64) -> Result<u64> {
        let available = self.locked.collect_instructor(instructor, day_of(now))?;
        if available == 0 {
            return Ok(0);
        }
        self.transfers
            .transfer(self.config.treasury_account, instructor, available)?;
        let amount = self.locked.take_unlocked_instructor(instructor);
        self.events.push(TreasuryEvent::Withdrawal {
            account: instructor,
            role: WithdrawalRole::Instructor,
            amount,
        });
        Ok(amount)
    }

    /// Pay the matured foundation cut into the configured foundation
    /// account. Returns the amount paid.
    pub fn withdraw_foundation(&mut self, now: u64) -> Result<u64> {
        let totals = self.locked.collect_pool(day_of(now))?;
        if totals.foundation == 0 {
            return Ok(0);
        }
        let account = self.config.foundation_account;
        self.transfers
            .transfer(self.config.treasury_account, account, totals.foundation)?;
        let amount = self.locked.take_foundation();
        self.events.push(TreasuryEvent::Withdrawal {
            account,
            role: WithdrawalRole::Foundation,
            amount,
        });
        Ok(amount)
    }

    /// Pay the matured governance cut into the configured governance
    /// account. Returns the amount paid.
    pub fn withdraw_governance(&mut self, now: u64) -> Result<u64> {
        let totals = self.locked.collect_pool(day_of(now))?;
        if totals.governance == 0 {
            return Ok(0);
        }
        let account = self.config.governance_account;
        self.transfers
            .transfer(self.config.treasury_account, account, totals.governance)?;
        let amount = self.locked.take_governance();
        self.events.push(TreasuryEvent::Withdrawal {
            account,
            role: WithdrawalRole::Governance,
            amount,
        });
        Ok(amount)
    }

    /// Pay out a validator's unclaimed rewards across all distributed
    /// rounds. Returns the amount paid, zero when nothing is claimable.
    pub fn withdraw_validator(&mut self, addr: AccountId, now: u64) -> Result<u64> {
        self.sweep_pools(now)?;
        let amount = self.rewards.claimable_validator(&addr, &self.scores)?;
        if amount == 0 {
            return Ok(0);
        }
        self.transfers
            .transfer(self.config.treasury_account, addr, amount)?;
        self.rewards.claim_validator(&addr, &self.scores)?;
        self.events.push(TreasuryEvent::Withdrawal {
            account: addr,
            role: WithdrawalRole::Validator,
            amount,
        });
        Ok(amount)
    }

    /// Pay out a juror's unclaimed rewards across all distributed rounds.
    /// Returns the amount paid, zero when nothing is claimable.
    pub fn withdraw_juror(&mut self, addr: AccountId, now: u64) -> Result<u64> {
        self.sweep_pools(now)?;
        let amount = self.rewards.claimable_juror(&addr, &self.scores)?;
        if amount == 0 {
            return Ok(0);
        }
        self.transfers
            .transfer(self.config.treasury_account, addr, amount)?;
        self.rewards.claim_juror(&addr, &self.scores)?;
        self.events.push(TreasuryEvent::Withdrawal {
            account: addr,
            role: WithdrawalRole::Juror,
            amount,
        });
        Ok(amount)
    }

    /// Close the current supervision round: fix per-point payout rates
    /// from the pooled validator and juror cuts. Returns the amounts
    /// committed to payouts; the floor remainder stays pooled.
    ///
    /// # Errors
    ///
    /// - [`TreasuryError::NotAuthorized`] unless the caller holds the
    ///   treasury-operator role
    /// - [`tesora_rewards::RewardError::AlreadyDistributed`] /
    ///   [`tesora_rewards::RewardError::NoScoreYet`]
    pub fn distribute_rewards(&mut self, operator: AccountId, now: u64) -> Result<(u64, u64)> {
        if !self.registry.has_role(&operator, roles::TREASURY_OPERATOR) {
            return Err(TreasuryError::NotAuthorized);
        }
        self.sweep_pools(now)?;

        let round = self.scores.current_round();
        let (consumed_validator, consumed_juror) =
            self.rewards
                .distribute(round, self.validator_pool, self.juror_pool, &self.scores)?;
        self.validator_pool -= consumed_validator;
        self.juror_pool -= consumed_juror;

        if let Some(payout) = self.rewards.payout(round) {
            self.events.push(TreasuryEvent::RewardsDistributed {
                round,
                validator_per_point: payout.validator_per_point,
                juror_per_point: payout.juror_per_point,
            });
        }
        Ok((consumed_validator, consumed_juror))
    }

    /// Change the refund-window length. Starts a precaution period of one
    /// old-length window during which all withdrawals are blocked.
    ///
    /// # Errors
    ///
    /// - [`TreasuryError::NotAuthorized`] unless the caller holds the
    ///   treasury-operator role
    /// - [`tesora_ledger::LedgerError::WindowUnchanged`] and the bounds
    ///   errors from the ledger
    pub fn change_refund_window(
        &mut self,
        operator: AccountId,
        new_length_days: u64,
        now: u64,
    ) -> Result<()> {
        if !self.registry.has_role(&operator, roles::TREASURY_OPERATOR) {
            return Err(TreasuryError::NotAuthorized);
        }
        let old_length_days = self.locked.length_days();
        self.locked.change_window(new_length_days, day_of(now))?;
        if new_length_days < old_length_days {
            // A shrink folds dropped ledger slots into the last surviving
            // one; sale records must follow so refunds reverse the right
            // slot.
            self.sales.fold_buckets_from(new_length_days as usize);
        }
        self.events.push(TreasuryEvent::RefundWindowChanged {
            old_length_days,
            new_length_days,
            precaution_deadline_day: self.locked.precaution_deadline_day(),
        });
        Ok(())
    }

    /// Drain the buffered events for the host's indexing pipeline.
    pub fn drain_events(&mut self) -> Vec<TreasuryEvent> {
        std::mem::take(&mut self.events)
    }

    /// The locked-balance ledger, for inspection.
    pub fn ledger(&self) -> &LockedLedger {
        &self.locked
    }

    /// A recorded sale, if it exists.
    pub fn sale(&self, sale_id: SaleId) -> Option<&crate::sale::Sale> {
        self.sales.get(sale_id)
    }

    /// The sale store, for inspection.
    pub fn sales(&self) -> &SaleStore {
        &self.sales
    }

    /// The reward ledger, for inspection.
    pub fn rewards(&self) -> &RewardLedger {
        &self.rewards
    }

    /// Matured validator cuts not yet committed to a round.
    pub fn validator_pool(&self) -> u64 {
        self.validator_pool
    }

    /// Matured juror cuts not yet committed to a round.
    pub fn juror_pool(&self) -> u64 {
        self.juror_pool
    }

    fn check_participant(&self, account: &AccountId) -> Result<()> {
        if self.registry.is_banned(account) || !self.registry.is_kyced(account) {
            return Err(TreasuryError::AccountBarred);
        }
        Ok(())
    }

    /// Sum the catalog prices a non-discounted voucher must match.
    fn catalog_price(&self, body: &PurchaseVoucher) -> Result<u64> {
        let parts = if body.full_purchase {
            self.catalog.part_ids(body.token_id)
        } else {
            body.purchased_parts.clone()
        };
        let mut expected = 0u64;
        for part in parts {
            let price = self
                .catalog
                .part_price(body.token_id, part)
                .ok_or(TreasuryError::UnknownContent {
                    token_id: body.token_id,
                })?;
            expected = expected.checked_add(price).ok_or(CutError::Overflow)?;
        }
        Ok(expected)
    }

    /// Move matured validator/juror cuts out of the ledger into the
    /// distribution pools.
    fn sweep_pools(&mut self, now: u64) -> Result<()> {
        self.locked.collect_pool(day_of(now))?;
        self.validator_pool = self
            .validator_pool
            .checked_add(self.locked.take_validator_pool())
            .ok_or(CutError::Overflow)?;
        self.juror_pool = self
            .juror_pool
            .checked_add(self.locked.take_juror_pool())
            .ok_or(CutError::Overflow)?;
        Ok(())
    }
}
