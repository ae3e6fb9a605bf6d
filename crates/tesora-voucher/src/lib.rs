//! # tesora-voucher
//!
//! Off-chain-signed authorization vouchers.
//!
//! Every mutating treasury operation is gated by a voucher: a typed body
//! signed off-chain by an account holding the voucher-signer role, verified
//! here before any state changes. Vouchers are not stored; replay is
//! prevented by the authorized effect being idempotent (a refund voucher for
//! an already-refunded sale is rejected by the treasury, not by a nonce
//! store).
//!
//! ## Modules
//!
//! - [`body`] — The four voucher bodies and their digest encoding
//! - [`authorizer`] — Signature, expiry, and signer-role verification

pub mod authorizer;
pub mod body;

pub use authorizer::{authorize, SignedVoucher, SignerRegistry};
pub use body::{CoachingVoucher, PurchaseVoucher, RedeemVoucher, RefundVoucher, VoucherBody};

/// Error types for voucher verification.
#[derive(Debug, thiserror::Error)]
pub enum VoucherError {
    /// The voucher's validity window has passed. The caller should request
    /// a fresh voucher.
    #[error("voucher expired: valid until {valid_until}, now {now}")]
    Expired {
        /// Last second at which the voucher was valid.
        valid_until: u64,
        /// The clock reading for this call.
        now: u64,
    },

    /// The signature does not verify, or the signer does not hold the
    /// voucher-signer role.
    #[error("voucher signature invalid")]
    SignatureInvalid,
}

/// Convenience result type for voucher operations.
pub type Result<T> = std::result::Result<T, VoucherError>;
