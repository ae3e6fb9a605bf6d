//! Integration test crate for the Tesora treasury.
//!
//! The scenarios under `tests/` exercise end-to-end marketplace flows
//! across the workspace crates. This library holds the shared in-memory
//! collaborators and a [`Marketplace`] fixture that wires a
//! [`TreasuryService`] over them.
//!
//! The collaborators hand out cloneable handles (`Rc<RefCell<_>>`) so a
//! scenario keeps mutating balances, roles, catalog entries, and scores
//! after the service has taken ownership of its copies.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p tesora-integration-tests
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tesora_crypto::ed25519::{derive_account_id, KeyPair};
use tesora_cuts::DEFAULT_RATES;
use tesora_treasury::{
    ContentCatalog, RefundWindowRule, RoleRegistry, TransferError, TreasuryConfig,
    TreasuryService, ValueTransfer,
};
use tesora_types::{roles, AccountId, Round, TokenId, SECS_PER_DAY};
use tesora_voucher::{
    CoachingVoucher, PurchaseVoucher, RefundVoucher, SignedVoucher, VoucherBody,
};

/// Escrow account holding all sale proceeds.
pub const TREASURY: AccountId = [0xF0u8; 32];
/// Account foundation withdrawals pay into.
pub const FOUNDATION: AccountId = [0xF1u8; 32];
/// Account governance withdrawals pay into.
pub const GOVERNANCE: AccountId = [0xF2u8; 32];
/// Account holding the treasury-operator role.
pub const OPERATOR: AccountId = [0xF3u8; 32];

/// Unix seconds a bit past midnight of the given day index.
pub fn now_on(day: u64) -> u64 {
    day * SECS_PER_DAY + 3600
}

/// A distinct test account id.
pub fn account(tag: u8) -> AccountId {
    [tag; 32]
}

/// Shared-handle account balances.
#[derive(Clone, Default)]
pub struct MemoryBank {
    balances: Rc<RefCell<HashMap<AccountId, u64>>>,
}

impl MemoryBank {
    pub fn credit(&self, account: AccountId, amount: u64) {
        *self.balances.borrow_mut().entry(account).or_insert(0) += amount;
    }

    pub fn balance(&self, account: &AccountId) -> u64 {
        self.balances.borrow().get(account).copied().unwrap_or(0)
    }

    /// Sum over every account; conservation checks compare this before
    /// and after a scenario.
    pub fn total_supply(&self) -> u128 {
        self.balances.borrow().values().map(|b| u128::from(*b)).sum()
    }
}

impl ValueTransfer for MemoryBank {
    fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<(), TransferError> {
        let mut balances = self.balances.borrow_mut();
        let available = balances.get(&from).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                available,
                needed: amount,
            });
        }
        *balances.entry(from).or_insert(0) -= amount;
        *balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    fn balance_of(&self, account: &AccountId) -> u64 {
        self.balance(account)
    }
}

#[derive(Default)]
struct RegistryState {
    roles: HashSet<(AccountId, String)>,
    banned: HashSet<AccountId>,
    unkyced: HashSet<AccountId>,
}

/// Shared-handle role/ban/KYC registry. Every account is KYC'd unless
/// explicitly revoked.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    state: Rc<RefCell<RegistryState>>,
}

impl MemoryRegistry {
    pub fn grant(&self, account: AccountId, role: &str) {
        self.state
            .borrow_mut()
            .roles
            .insert((account, role.to_string()));
    }

    pub fn ban(&self, account: AccountId) {
        self.state.borrow_mut().banned.insert(account);
    }

    pub fn revoke_kyc(&self, account: AccountId) {
        self.state.borrow_mut().unkyced.insert(account);
    }
}

impl RoleRegistry for MemoryRegistry {
    fn has_role(&self, account: &AccountId, role: &str) -> bool {
        self.state
            .borrow()
            .roles
            .contains(&(*account, role.to_string()))
    }

    fn is_banned(&self, account: &AccountId) -> bool {
        self.state.borrow().banned.contains(account)
    }

    fn is_kyced(&self, account: &AccountId) -> bool {
        !self.state.borrow().unkyced.contains(account)
    }
}

/// Shared-handle content catalog: instructor plus per-part prices.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    tokens: Rc<RefCell<HashMap<TokenId, (AccountId, Vec<u64>)>>>,
}

impl MemoryCatalog {
    pub fn publish(&self, token_id: TokenId, instructor: AccountId, part_prices: Vec<u64>) {
        self.tokens
            .borrow_mut()
            .insert(token_id, (instructor, part_prices));
    }

    pub fn full_price(&self, token_id: TokenId) -> u64 {
        self.tokens
            .borrow()
            .get(&token_id)
            .map(|(_, prices)| prices.iter().sum())
            .unwrap_or(0)
    }
}

impl ContentCatalog for MemoryCatalog {
    fn instructor_of(&self, token_id: TokenId) -> Option<AccountId> {
        self.tokens.borrow().get(&token_id).map(|(i, _)| *i)
    }

    fn part_ids(&self, token_id: TokenId) -> Vec<u64> {
        self.tokens
            .borrow()
            .get(&token_id)
            .map(|(_, prices)| (0..prices.len() as u64).collect())
            .unwrap_or_default()
    }

    fn part_price(&self, token_id: TokenId, part: u64) -> Option<u64> {
        self.tokens
            .borrow()
            .get(&token_id)
            .and_then(|(_, prices)| prices.get(part as usize).copied())
    }
}

#[derive(Default)]
struct ScoreState {
    round: Round,
    validators: HashMap<(AccountId, Round), u64>,
    jurors: HashMap<(AccountId, Round), u64>,
}

/// Shared-handle supervision scores; scenarios advance the round and set
/// scores as the story unfolds.
#[derive(Clone, Default)]
pub struct MemoryScores {
    state: Rc<RefCell<ScoreState>>,
}

impl MemoryScores {
    pub fn set_round(&self, round: Round) {
        self.state.borrow_mut().round = round;
    }

    pub fn set_validator_score(&self, addr: AccountId, round: Round, score: u64) {
        self.state.borrow_mut().validators.insert((addr, round), score);
    }

    pub fn set_juror_score(&self, addr: AccountId, round: Round, score: u64) {
        self.state.borrow_mut().jurors.insert((addr, round), score);
    }
}

impl tesora_rewards::SupervisionScores for MemoryScores {
    fn current_round(&self) -> Round {
        self.state.borrow().round
    }

    fn validator_score(&self, addr: &AccountId, round: Round) -> u64 {
        self.state
            .borrow()
            .validators
            .get(&(*addr, round))
            .copied()
            .unwrap_or(0)
    }

    fn juror_score(&self, addr: &AccountId, round: Round) -> u64 {
        self.state
            .borrow()
            .jurors
            .get(&(*addr, round))
            .copied()
            .unwrap_or(0)
    }

    fn total_validator_score(&self, round: Round) -> u64 {
        self.state
            .borrow()
            .validators
            .iter()
            .filter(|((_, r), _)| *r == round)
            .map(|(_, s)| s)
            .sum()
    }

    fn total_juror_score(&self, round: Round) -> u64 {
        self.state
            .borrow()
            .jurors
            .iter()
            .filter(|((_, r), _)| *r == round)
            .map(|(_, s)| s)
            .sum()
    }
}

/// A full marketplace under test: the treasury service plus live handles
/// to every collaborator and the authorized voucher-signing key.
pub struct Marketplace {
    pub service: TreasuryService<MemoryBank, MemoryRegistry, MemoryCatalog, MemoryScores>,
    pub bank: MemoryBank,
    pub registry: MemoryRegistry,
    pub catalog: MemoryCatalog,
    pub scores: MemoryScores,
    pub signer: KeyPair,
}

impl Marketplace {
    /// Set up a marketplace with the default cut rates and the
    /// current-window refund rule, opened on `start_day`.
    pub fn open(window_days: u64, start_day: u64) -> Self {
        Self::open_with_rule(window_days, start_day, RefundWindowRule::CurrentWindow)
    }

    pub fn open_with_rule(window_days: u64, start_day: u64, rule: RefundWindowRule) -> Self {
        let bank = MemoryBank::default();
        let registry = MemoryRegistry::default();
        let catalog = MemoryCatalog::default();
        let scores = MemoryScores::default();
        scores.set_round(1);

        let signer = KeyPair::generate();
        registry.grant(
            derive_account_id(&signer.verifying_key),
            roles::VOUCHER_SIGNER,
        );
        registry.grant(OPERATOR, roles::TREASURY_OPERATOR);

        let config = TreasuryConfig {
            rates: DEFAULT_RATES,
            refund_window_days: window_days,
            refund_rule: rule,
            treasury_account: TREASURY,
            foundation_account: FOUNDATION,
            governance_account: GOVERNANCE,
        };
        let service = TreasuryService::new(
            config,
            bank.clone(),
            registry.clone(),
            catalog.clone(),
            scores.clone(),
            now_on(start_day),
        )
        .expect("treasury setup");

        Self {
            service,
            bank,
            registry,
            catalog,
            scores,
            signer,
        }
    }

    /// Sign any voucher body with the authorized key.
    pub fn sign<T: VoucherBody>(&self, body: T) -> SignedVoucher<T> {
        SignedVoucher::sign(body, &self.signer.signing_key)
    }

    /// A signed full-content purchase voucher at the catalog price.
    pub fn purchase_voucher(
        &self,
        token_id: TokenId,
        buyer: AccountId,
        day: u64,
    ) -> SignedVoucher<PurchaseVoucher> {
        self.sign(PurchaseVoucher {
            token_id,
            full_purchase: true,
            discounted: false,
            purchased_parts: vec![],
            price: self.catalog.full_price(token_id),
            valid_until: now_on(day) + SECS_PER_DAY,
            redeemer: buyer,
            gift_receiver: [0u8; 32],
            user_id: format!("user-{}", buyer[0]),
        })
    }

    /// A signed coaching voucher.
    pub fn coaching_voucher(
        &self,
        coach: AccountId,
        learner: AccountId,
        price: u64,
        day: u64,
    ) -> SignedVoucher<CoachingVoucher> {
        self.sign(CoachingVoucher {
            coach,
            learner,
            price,
            session_date: now_on(day + 7),
            user_id: format!("user-{}", learner[0]),
            valid_until: now_on(day) + SECS_PER_DAY,
        })
    }

    /// A signed refund voucher for a recorded sale.
    pub fn refund_voucher(
        &self,
        sale_id: tesora_types::SaleId,
        day: u64,
    ) -> SignedVoucher<RefundVoucher> {
        let sale = self.service.sale(sale_id).expect("sale exists");
        self.sign(RefundVoucher {
            sale_id,
            instructor: sale.instructor,
            refunded_parts: vec![],
            owned_content_index: 0,
            valid_until: now_on(day) + SECS_PER_DAY,
        })
    }
}
