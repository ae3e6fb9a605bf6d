//! Traits for the external collaborators.
//!
//! The treasury never stores catalog data, role assignments, or account
//! balances itself; those live with external modules and are reached
//! through these seams. Tests supply in-memory implementations.

use tesora_types::{AccountId, TokenId};

/// The external value-transfer primitive.
///
/// Atomically moves value between account identifiers; a transfer either
/// fully applies or fails with [`TransferError`], never partially.
pub trait ValueTransfer {
    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: AccountId, to: AccountId, amount: u64)
        -> Result<(), TransferError>;

    /// Current balance of an account.
    fn balance_of(&self, account: &AccountId) -> u64;
}

/// Failure modes of the value-transfer primitive.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The source account does not hold `amount`.
    #[error("insufficient balance: have {available}, need {needed}")]
    InsufficientBalance { available: u64, needed: u64 },
}

/// The external role/ban/KYC registry.
pub trait RoleRegistry {
    /// Whether the account holds a named capability role.
    fn has_role(&self, account: &AccountId, role: &str) -> bool;

    /// Whether the account is banned from new participation.
    fn is_banned(&self, account: &AccountId) -> bool;

    /// Whether the account has completed KYC.
    fn is_kyced(&self, account: &AccountId) -> bool;
}

/// The external content catalog.
pub trait ContentCatalog {
    /// The instructor credited for sales of this token.
    fn instructor_of(&self, token_id: TokenId) -> Option<AccountId>;

    /// All part indices of this token.
    fn part_ids(&self, token_id: TokenId) -> Vec<u64>;

    /// Price of one part, if the part exists.
    fn part_price(&self, token_id: TokenId, part: u64) -> Option<u64>;
}
