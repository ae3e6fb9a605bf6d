//! Signature, expiry, and signer-role verification.
//!
//! A [`SignedVoucher`] carries its body, the signer's verifying key, and an
//! Ed25519 signature over the body digest. Verification checks expiry, the
//! signature, and finally that the signer holds the voucher-signer role in
//! the external role registry. Verification is read-only; the treasury
//! aborts the whole operation if it fails, so no partial state change is
//! ever observable.

use serde::{Deserialize, Serialize};
use tesora_crypto::ed25519::{Signature, SigningKey, VerifyingKey};

use crate::body::VoucherBody;
use crate::{Result, VoucherError};

/// Answers whether a key holds the voucher-signer capability.
///
/// Implemented by the external role registry collaborator.
pub trait SignerRegistry {
    fn is_voucher_signer(&self, signer: &VerifyingKey) -> bool;
}

/// A voucher body plus the signature envelope.
///
/// Ed25519 has no public-key recovery, so the envelope names the signer;
/// [`authorize`] checks the signature against that key and then asks the
/// registry whether the key holds the role.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedVoucher<T: VoucherBody> {
    /// The signed body.
    pub body: T,
    /// The key that produced the signature.
    pub signer: VerifyingKey,
    /// Ed25519 signature over `body.digest()`.
    pub signature: Signature,
}

impl<T: VoucherBody> SignedVoucher<T> {
    /// Sign a voucher body. Used by the off-chain issuing side and by
    /// tests; redemption only ever verifies.
    pub fn sign(body: T, key: &SigningKey) -> Self {
        let digest = body.digest();
        Self {
            body,
            signer: key.verifying_key(),
            signature: key.sign(&digest),
        }
    }
}

/// Verify a signed voucher: expiry, signature, signer role.
///
/// # Errors
///
/// - [`VoucherError::Expired`] if `now` is past `valid_until`
/// - [`VoucherError::SignatureInvalid`] if the signature fails or the
///   signer lacks the voucher-signer role
pub fn authorize<T: VoucherBody>(
    voucher: &SignedVoucher<T>,
    registry: &impl SignerRegistry,
    now: u64,
) -> Result<()> {
    let valid_until = voucher.body.valid_until();
    if now > valid_until {
        return Err(VoucherError::Expired { valid_until, now });
    }

    let digest = voucher.body.digest();
    if voucher.signer.verify(&digest, &voucher.signature).is_err() {
        tracing::debug!("voucher rejected: bad signature");
        return Err(VoucherError::SignatureInvalid);
    }

    if !registry.is_voucher_signer(&voucher.signer) {
        tracing::debug!("voucher rejected: signer lacks role");
        return Err(VoucherError::SignatureInvalid);
    }

    Ok(())
}
