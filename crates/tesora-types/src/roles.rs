//! Capability role names consumed from the external role registry.
//!
//! The registry itself lives outside this workspace; these constants pin the
//! role strings Tesora asks about so callers and tests agree on spelling.

/// Accounts holding this role may sign vouchers off-chain.
pub const VOUCHER_SIGNER: &str = "voucher-signer";

/// Accounts holding this role may change the refund window and trigger
/// reward distribution.
pub const TREASURY_OPERATOR: &str = "treasury-operator";
