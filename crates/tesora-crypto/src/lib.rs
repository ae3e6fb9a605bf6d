//! # tesora-crypto
//!
//! Cryptographic primitives for the Tesora treasury. The suite is fixed —
//! no algorithm negotiation is permitted.
//!
//! ## Modules
//!
//! - [`blake3`] — Domain-separated BLAKE3 hashing (voucher digest domains)
//! - [`ed25519`] — Ed25519 signing and verification (RFC 8032)

pub mod blake3;
pub mod ed25519;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
