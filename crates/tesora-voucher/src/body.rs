//! Voucher bodies and their digest encoding.
//!
//! Each voucher shape hashes its fields with length-prefixed encoding under
//! its own registered BLAKE3 context, so a signature over one shape can
//! never be replayed as another, and no field boundary can be shifted to
//! forge a colliding digest.

use serde::{Deserialize, Serialize};
use tesora_crypto::blake3;
use tesora_types::{AccountId, SaleId, TokenId};

/// Common contract for all voucher bodies.
pub trait VoucherBody {
    /// Deterministic digest of every field, domain-separated per shape.
    fn digest(&self) -> [u8; 32];

    /// Last unix second at which this voucher may be redeemed.
    fn valid_until(&self) -> u64;
}

/// Authorizes a content purchase (full or per-part, optionally discounted
/// and optionally gifted).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseVoucher {
    /// Content token being purchased.
    pub token_id: TokenId,
    /// True for a full-content purchase, false for a per-part purchase.
    pub full_purchase: bool,
    /// True when the signer granted a discount; the signed price then
    /// overrides the catalog price.
    pub discounted: bool,
    /// Part indices covered when `full_purchase` is false.
    pub purchased_parts: Vec<u64>,
    /// Price the buyer pays. For discounted purchases this is the signed
    /// discount price and is authoritative.
    pub price: u64,
    /// Expiry (unix seconds).
    pub valid_until: u64,
    /// Account paying for and redeeming the voucher.
    pub redeemer: AccountId,
    /// Gift target; all zeroes when the redeemer keeps the content.
    pub gift_receiver: AccountId,
    /// Off-chain user identifier bound into the signature.
    pub user_id: String,
}

impl PurchaseVoucher {
    /// The account that ends up owning the content.
    pub fn receiver(&self) -> AccountId {
        if self.gift_receiver == [0u8; 32] {
            self.redeemer
        } else {
            self.gift_receiver
        }
    }
}

/// Authorizes booking a coaching session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachingVoucher {
    /// The coach (instructor) being booked.
    pub coach: AccountId,
    /// The learner paying for the session.
    pub learner: AccountId,
    /// Session price.
    pub price: u64,
    /// Scheduled session date (unix seconds).
    pub session_date: u64,
    /// Off-chain user identifier bound into the signature.
    pub user_id: String,
    /// Expiry (unix seconds).
    pub valid_until: u64,
}

/// Authorizes reversing a recorded sale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundVoucher {
    /// The sale to reverse.
    pub sale_id: SaleId,
    /// The instructor whose locked proceeds are reversed.
    pub instructor: AccountId,
    /// Part indices being returned (empty for coaching sales).
    pub refunded_parts: Vec<u64>,
    /// Index of the sale in the buyer's owned-content records.
    pub owned_content_index: u64,
    /// Expiry (unix seconds).
    pub valid_until: u64,
}

/// Authorizes minting new content metadata. Minting itself happens in the
/// external catalog; the treasury only ever verifies this shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemVoucher {
    /// Token to mint.
    pub token_id: TokenId,
    /// Price of each content part.
    pub part_prices: Vec<u64>,
    /// BLAKE3 hash of the content metadata URI.
    pub uri_hash: [u8; 32],
    /// Account performing the mint.
    pub redeemer: AccountId,
    /// Expiry (unix seconds).
    pub valid_until: u64,
}

/// Concatenate a u64 list as little-endian bytes for digest input.
fn encode_u64s(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

impl VoucherBody for PurchaseVoucher {
    fn digest(&self) -> [u8; 32] {
        let parts = encode_u64s(&self.purchased_parts);
        let encoded = blake3::encode_multi_field(&[
            &self.token_id.to_le_bytes(),
            &[u8::from(self.full_purchase)],
            &[u8::from(self.discounted)],
            &parts,
            &self.price.to_le_bytes(),
            &self.valid_until.to_le_bytes(),
            &self.redeemer,
            &self.gift_receiver,
            self.user_id.as_bytes(),
        ]);
        blake3::derive_key(blake3::contexts::PURCHASE_VOUCHER, &encoded)
    }

    fn valid_until(&self) -> u64 {
        self.valid_until
    }
}

impl VoucherBody for CoachingVoucher {
    fn digest(&self) -> [u8; 32] {
        let encoded = blake3::encode_multi_field(&[
            &self.coach,
            &self.learner,
            &self.price.to_le_bytes(),
            &self.session_date.to_le_bytes(),
            self.user_id.as_bytes(),
            &self.valid_until.to_le_bytes(),
        ]);
        blake3::derive_key(blake3::contexts::COACHING_VOUCHER, &encoded)
    }

    fn valid_until(&self) -> u64 {
        self.valid_until
    }
}

impl VoucherBody for RefundVoucher {
    fn digest(&self) -> [u8; 32] {
        let parts = encode_u64s(&self.refunded_parts);
        let encoded = blake3::encode_multi_field(&[
            &self.sale_id.to_le_bytes(),
            &self.instructor,
            &parts,
            &self.owned_content_index.to_le_bytes(),
            &self.valid_until.to_le_bytes(),
        ]);
        blake3::derive_key(blake3::contexts::REFUND_VOUCHER, &encoded)
    }

    fn valid_until(&self) -> u64 {
        self.valid_until
    }
}

impl VoucherBody for RedeemVoucher {
    fn digest(&self) -> [u8; 32] {
        let prices = encode_u64s(&self.part_prices);
        let encoded = blake3::encode_multi_field(&[
            &self.token_id.to_le_bytes(),
            &prices,
            &self.uri_hash,
            &self.redeemer,
            &self.valid_until.to_le_bytes(),
        ]);
        blake3::derive_key(blake3::contexts::REDEEM_VOUCHER, &encoded)
    }

    fn valid_until(&self) -> u64 {
        self.valid_until
    }
}
