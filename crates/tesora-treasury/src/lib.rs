//! # tesora-treasury
//!
//! The treasury orchestration layer.
//!
//! Accepts verified vouchers, computes cuts, posts entries into the locked
//! ledger, reverses refunded sales, and exposes the withdrawal entry points
//! that consult maturity and reward claims. Every entry point is
//! all-or-nothing: validation happens before any state mutates, so a
//! failed call leaves no observable change.
//!
//! ## Modules
//!
//! - [`collab`] — Traits for the external collaborators (value transfer,
//!   role registry, content catalog)
//! - [`sale`] — The append-only sale record store
//! - [`service`] — [`service::TreasuryService`] and its entry points

pub mod collab;
pub mod sale;
pub mod service;

pub use collab::{ContentCatalog, RoleRegistry, TransferError, ValueTransfer};
pub use sale::{Sale, SaleStore};
pub use service::{RefundWindowRule, TreasuryConfig, TreasuryService};

use tesora_types::SaleId;

/// Error types for treasury operations.
#[derive(Debug, thiserror::Error)]
pub enum TreasuryError {
    /// Voucher verification failed.
    #[error(transparent)]
    Voucher(#[from] tesora_voucher::VoucherError),

    /// Cut computation failed.
    #[error(transparent)]
    Cut(#[from] tesora_cuts::CutError),

    /// Locked-ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] tesora_ledger::LedgerError),

    /// Reward distribution failed.
    #[error(transparent)]
    Reward(#[from] tesora_rewards::RewardError),

    /// The external value transfer failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// No sale exists with this id.
    #[error("unknown sale {sale_id}")]
    UnknownSale { sale_id: SaleId },

    /// The sale was already refunded; a refund voucher replays once.
    #[error("sale {sale_id} already refunded")]
    AlreadyRefunded { sale_id: SaleId },

    /// The sale is older than the refund window allows.
    #[error("refund window expired for sale {sale_id}: age {age_days} days, window {window_days} days")]
    RefundWindowExpired {
        sale_id: SaleId,
        age_days: u64,
        window_days: u64,
    },

    /// The catalog has no record of this content.
    #[error("unknown content token {token_id}")]
    UnknownContent { token_id: u64 },

    /// The voucher price does not match the catalog price.
    #[error("price mismatch: catalog says {expected}, voucher says {actual}")]
    PriceMismatch { expected: u64, actual: u64 },

    /// The payer is banned or not KYC'd. Barred accounts may still
    /// withdraw balances they earned earlier.
    #[error("account barred from new participation")]
    AccountBarred,

    /// The caller lacks the capability this entry point requires, or the
    /// voucher does not name them.
    #[error("caller not authorized for this operation")]
    NotAuthorized,
}

/// Convenience result type for treasury operations.
pub type Result<T> = std::result::Result<T, TreasuryError>;
