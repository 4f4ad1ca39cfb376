//! Cryptographic provider contracts and their standard implementation.
//!
//! The VM never performs curve or digest math itself; the operators reach
//! these traits through the instruction set, which receives its provider at
//! construction time. Providers are invoked read-only and must be safe to
//! share across concurrent evaluations.

use bitcoin_hashes::{ripemd160, sha1, sha256, Hash};
use secp256k1::{ecdsa, Message, PublicKey, Secp256k1, VerifyOnly};

/// SHA-256.
pub trait Sha256 {
    fn hash(&self, message: &[u8]) -> [u8; 32];
}

/// SHA-1, required by `OP_SHA1`.
pub trait Sha1 {
    fn hash(&self, message: &[u8]) -> [u8; 20];
}

/// RIPEMD-160.
pub trait Ripemd160 {
    fn hash(&self, message: &[u8]) -> [u8; 20];
}

/// ECDSA verification over secp256k1.
pub trait SignatureVerifier {
    /// Verifies a strict-DER, low-S signature over a 32-byte digest.
    ///
    /// Returns false (never panics or errors) for valid-but-non-matching
    /// signatures; malformed inputs are expected to have been rejected by
    /// the encoding checks before reaching this call.
    fn verify_der_low_s(&self, signature: &[u8], public_key: &[u8], digest: &[u8; 32]) -> bool;
}

/// The full provider bundle an instruction set is constructed over.
pub trait CryptoProvider: Sha256 + Sha1 + Ripemd160 + SignatureVerifier {}

impl<T: Sha256 + Sha1 + Ripemd160 + SignatureVerifier> CryptoProvider for T {}

/// Default providers: `bitcoin_hashes` digests and a `secp256k1`
/// verification context.
pub struct StandardCrypto {
    secp: Secp256k1<VerifyOnly>,
}

impl StandardCrypto {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }
}

impl Default for StandardCrypto {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha256 for StandardCrypto {
    fn hash(&self, message: &[u8]) -> [u8; 32] {
        sha256::Hash::hash(message).to_byte_array()
    }
}

impl Sha1 for StandardCrypto {
    fn hash(&self, message: &[u8]) -> [u8; 20] {
        sha1::Hash::hash(message).to_byte_array()
    }
}

impl Ripemd160 for StandardCrypto {
    fn hash(&self, message: &[u8]) -> [u8; 20] {
        ripemd160::Hash::hash(message).to_byte_array()
    }
}

impl SignatureVerifier for StandardCrypto {
    fn verify_der_low_s(&self, signature: &[u8], public_key: &[u8], digest: &[u8; 32]) -> bool {
        let Ok(signature) = ecdsa::Signature::from_der(signature) else {
            return false;
        };
        let mut normalized = signature;
        normalized.normalize_s();
        if normalized != signature {
            return false;
        }
        let Ok(public_key) = PublicKey::from_slice(public_key) else {
            return false;
        };
        let message = Message::from_digest(*digest);
        self.secp
            .verify_ecdsa(&message, &signature, &public_key)
            .is_ok()
    }
}
