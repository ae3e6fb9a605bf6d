//! Domain-separated BLAKE3 hashing for Tesora.
//!
//! Every voucher type signs a digest derived under its own registered
//! context string, so a signature over one voucher shape can never be
//! replayed as another. Using an unregistered context string is a protocol
//! violation.
//!
//! ## Modes
//!
//! - [`hash`] — Pure hashing: general-purpose content addressing
//! - [`derive_key`] — Domain-separated digests: the voucher digests

/// All registered BLAKE3 context strings for the Tesora protocol.
pub mod contexts {
    pub const PURCHASE_VOUCHER: &str = "Tesora v1 purchase-voucher";
    pub const COACHING_VOUCHER: &str = "Tesora v1 coaching-voucher";
    pub const REFUND_VOUCHER: &str = "Tesora v1 refund-voucher";
    pub const REDEEM_VOUCHER: &str = "Tesora v1 redeem-voucher";

    /// All registered context strings.
    pub const ALL_CONTEXTS: &[&str] = &[
        PURCHASE_VOUCHER,
        COACHING_VOUCHER,
        REFUND_VOUCHER,
        REDEEM_VOUCHER,
    ];
}

/// Compute BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a 32-byte digest using BLAKE3's built-in key derivation mode.
///
/// The context string must be one of the registered context strings in
/// [`contexts`]. The key material can be any byte slice.
///
/// # Arguments
///
/// * `context` - A registered context string (must start with "Tesora v1 ")
/// * `key_material` - The input key material
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    let digest = hasher.finalize();
    out.copy_from_slice(digest.as_bytes());
    out
}

/// Encode multiple dynamic fields using length-prefixed encoding.
///
/// Digests over multiple dynamic fields use
/// `LE32(len(field1)) || field1 || LE32(len(field2)) || field2 || ...`
/// so that field boundaries cannot be shifted to forge a colliding input.
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}
